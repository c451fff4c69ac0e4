use anyhow::Result;
use std::io::{Read, Write};

use super::codec::{
    decode_envelope, encode_envelope, read_f64_3, read_f64_4, read_str, read_u32, write_f64_array,
    write_str, write_u32, FLAG_NONE, FLAG_ZLIB,
};

/// A placed reference to a built model resource.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneModel {
    /// Registry resource ID of the model, in canonical UUID text form.
    pub resource_id: String,
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
}

/// Scene asset: an arrangement of model resources. The referenced resource
/// IDs are the scene's registry dependencies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub ambient_color: [f64; 3],
    pub models: Vec<SceneModel>,
}

impl Scene {
    pub const VERSION_CURRENT: u16 = 1;

    pub fn encode_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.encode_version_to(out, true)
    }

    pub fn encode_version_to<W: Write>(&self, out: &mut W, compressed: bool) -> Result<()> {
        let flags = if compressed { FLAG_ZLIB } else { FLAG_NONE };
        encode_envelope(out, Self::VERSION_CURRENT, flags, |w| {
            write_f64_array(w, &self.ambient_color)?;
            write_u32(w, self.models.len() as u32)?;
            for model in &self.models {
                write_str(w, &model.resource_id)?;
                write_f64_array(w, &model.translation)?;
                write_f64_array(w, &model.rotation)?;
                write_f64_array(w, &model.scale)?;
            }
            Ok(())
        })
    }

    pub fn decode_from<R: Read>(input: &mut R) -> Result<Self> {
        decode_envelope(input, |version, r| match version {
            Self::VERSION_CURRENT => {
                let ambient_color = read_f64_3(r)?;
                let mut models = Vec::new();
                for _ in 0..read_u32(r)? {
                    models.push(SceneModel {
                        resource_id: read_str(r)?,
                        translation: read_f64_3(r)?,
                        rotation: read_f64_4(r)?,
                        scale: read_f64_3(r)?,
                    });
                }
                Ok(Scene { ambient_color, models })
            }
            other => panic!("scene asset: unsupported version {other}"),
        })
    }
}
