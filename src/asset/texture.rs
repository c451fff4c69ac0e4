use anyhow::Result;
use std::io::{Read, Write};

use super::codec::{
    decode_envelope, encode_envelope, read_block, read_u16, read_u32, read_u8, write_block,
    write_u16, write_u32, write_u8, FLAG_NONE, FLAG_ZLIB,
};
use super::model::{TexelFormat, Texture, TextureFlags, TextureLayer};

/// Opaque binary blob asset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Binary {
    pub data: Vec<u8>,
}

impl Binary {
    pub const VERSION_CURRENT: u16 = 1;

    pub fn encode_to<W: Write>(&self, out: &mut W) -> Result<()> {
        encode_envelope(out, Self::VERSION_CURRENT, FLAG_ZLIB, |w| write_block(w, &self.data))
    }

    pub fn decode_from<R: Read>(input: &mut R) -> Result<Self> {
        decode_envelope(input, |version, r| match version {
            Self::VERSION_CURRENT => Ok(Binary { data: read_block(r)? }),
            other => panic!("binary asset: unsupported version {other}"),
        })
    }
}

/// Standalone single-layer texture asset.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoDTexture {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub flags: TextureFlags,
    pub data: Vec<u8>,
}

impl TwoDTexture {
    pub const VERSION_CURRENT: u16 = 1;

    pub fn encode_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.encode_version_to(out, true)
    }

    pub fn encode_version_to<W: Write>(&self, out: &mut W, compressed: bool) -> Result<()> {
        let flags = if compressed { FLAG_ZLIB } else { FLAG_NONE };
        encode_envelope(out, Self::VERSION_CURRENT, flags, |w| {
            let texture = Texture {
                width: self.width,
                height: self.height,
                format: self.format,
                flags: self.flags,
                layers: vec![TextureLayer { data: self.data.clone() }],
            };
            super::model::encode_texture(w, &texture)
        })
    }

    pub fn decode_from<R: Read>(input: &mut R) -> Result<Self> {
        decode_envelope(input, |version, r| match version {
            Self::VERSION_CURRENT => {
                let texture = super::model::decode_texture(r)?;
                let mut layers = texture.layers;
                let data = layers.pop().map(|layer| layer.data).unwrap_or_default();
                Ok(TwoDTexture {
                    width: texture.width,
                    height: texture.height,
                    format: texture.format,
                    flags: texture.flags,
                    data,
                })
            }
            other => panic!("2d texture asset: unsupported version {other}"),
        })
    }
}

/// Standalone six-sided texture asset. Side order matches
/// `raster::CubeSide::ALL`.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeTexture {
    pub size: u32,
    pub format: TexelFormat,
    pub flags: TextureFlags,
    pub sides: [Vec<u8>; 6],
}

impl CubeTexture {
    pub const VERSION_CURRENT: u16 = 1;

    pub fn encode_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.encode_version_to(out, true)
    }

    pub fn encode_version_to<W: Write>(&self, out: &mut W, compressed: bool) -> Result<()> {
        let flags = if compressed { FLAG_ZLIB } else { FLAG_NONE };
        encode_envelope(out, Self::VERSION_CURRENT, flags, |w| {
            write_u32(w, self.size)?;
            write_u8(w, self.format.to_u8())?;
            write_u16(w, self.flags.bits())?;
            for side in &self.sides {
                write_block(w, side)?;
            }
            Ok(())
        })
    }

    pub fn decode_from<R: Read>(input: &mut R) -> Result<Self> {
        decode_envelope(input, |version, r| match version {
            Self::VERSION_CURRENT => {
                let size = read_u32(r)?;
                let format = TexelFormat::from_u8(read_u8(r)?)?;
                let flags = TextureFlags::from_bits_truncate(read_u16(r)?);
                let mut sides: [Vec<u8>; 6] = Default::default();
                for side in &mut sides {
                    *side = read_block(r)?;
                }
                Ok(CubeTexture { size, format, flags, sides })
            }
            other => panic!("cube texture asset: unsupported version {other}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_round_trips_compressed() {
        let asset = Binary { data: vec![5u8; 1024] };
        let mut bytes = Vec::new();
        asset.encode_to(&mut bytes).expect("encode");
        let decoded = Binary::decode_from(&mut bytes.as_slice()).expect("decode");
        assert_eq!(decoded, asset);
    }

    #[test]
    fn cube_texture_round_trips() {
        let asset = CubeTexture {
            size: 2,
            format: TexelFormat::Rgba32F,
            flags: TextureFlags::MIPMAPPING,
            sides: [
                vec![1, 2],
                vec![3, 4],
                vec![5, 6],
                vec![7, 8],
                vec![9, 10],
                vec![11, 12],
            ],
        };
        let mut bytes = Vec::new();
        asset.encode_to(&mut bytes).expect("encode");
        let decoded = CubeTexture::decode_from(&mut bytes.as_slice()).expect("decode");
        assert_eq!(decoded, asset);
    }
}
