use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Header flag bit 0: the payload after the header is a zlib stream.
pub const FLAG_NONE: u16 = 0;
pub const FLAG_ZLIB: u16 = 1 << 0;

/// Designated "absent" index, distinct from 0.
pub const UNSPECIFIED_INDEX: i32 = -1;

pub(crate) fn write_header(out: &mut dyn Write, version: u16, flags: u16) -> Result<()> {
    out.write_all(&version.to_le_bytes())?;
    out.write_all(&flags.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_header(input: &mut dyn Read) -> Result<(u16, u16)> {
    let version = read_u16(input).context("reading asset version")?;
    let flags = read_u16(input).context("reading asset flags")?;
    Ok((version, flags))
}

/// Writes the header and runs the body against a plain or zlib-compressing
/// writer, depending on the flags.
pub(crate) fn encode_envelope<W: Write>(
    out: &mut W,
    version: u16,
    flags: u16,
    body: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    write_header(out, version, flags)?;
    if flags & FLAG_ZLIB != 0 {
        let mut encoder = ZlibEncoder::new(&mut *out, Compression::default());
        body(&mut encoder)?;
        encoder.finish().context("finishing zlib stream")?;
    } else {
        body(out)?;
    }
    Ok(())
}

/// Reads the header and hands the version plus a transparently decompressed
/// reader to the body.
pub(crate) fn decode_envelope<R: Read, T>(
    input: &mut R,
    body: impl FnOnce(u16, &mut dyn Read) -> Result<T>,
) -> Result<T> {
    let (version, flags) = read_header(input)?;
    if flags & FLAG_ZLIB != 0 {
        let mut decoder = ZlibDecoder::new(input);
        body(version, &mut decoder)
    } else {
        body(version, input)
    }
}

pub(crate) fn write_u8(out: &mut dyn Write, value: u8) -> Result<()> {
    out.write_all(&[value])?;
    Ok(())
}

pub(crate) fn read_u8(input: &mut dyn Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn write_u16(out: &mut dyn Write, value: u16) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u16(input: &mut dyn Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn write_u32(out: &mut dyn Write, value: u32) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u32(input: &mut dyn Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn write_u64(out: &mut dyn Write, value: u64) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u64(input: &mut dyn Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn write_i32(out: &mut dyn Write, value: i32) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_i32(input: &mut dyn Read) -> Result<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn write_f64(out: &mut dyn Write, value: f64) -> Result<()> {
    out.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_f64(input: &mut dyn Read) -> Result<f64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

pub(crate) fn write_bool(out: &mut dyn Write, value: bool) -> Result<()> {
    write_u8(out, value as u8)
}

pub(crate) fn read_bool(input: &mut dyn Read) -> Result<bool> {
    Ok(read_u8(input)? != 0)
}

/// Variable-length byte payload: u64 length prefix followed by the raw bytes.
pub(crate) fn write_block(out: &mut dyn Write, data: &[u8]) -> Result<()> {
    write_u64(out, data.len() as u64)?;
    out.write_all(data)?;
    Ok(())
}

pub(crate) fn read_block(input: &mut dyn Read) -> Result<Vec<u8>> {
    let length = read_u64(input)? as usize;
    let mut data = vec![0u8; length];
    input.read_exact(&mut data)?;
    Ok(data)
}

pub(crate) fn write_str(out: &mut dyn Write, value: &str) -> Result<()> {
    write_block(out, value.as_bytes())
}

pub(crate) fn read_str(input: &mut dyn Read) -> Result<String> {
    let data = read_block(input)?;
    String::from_utf8(data).context("decoding string block")
}

pub(crate) fn write_f64_array(out: &mut dyn Write, values: &[f64]) -> Result<()> {
    for value in values {
        write_f64(out, *value)?;
    }
    Ok(())
}

pub(crate) fn read_f64_3(input: &mut dyn Read) -> Result<[f64; 3]> {
    Ok([read_f64(input)?, read_f64(input)?, read_f64(input)?])
}

pub(crate) fn read_f64_4(input: &mut dyn Read) -> Result<[f64; 4]> {
    Ok([read_f64(input)?, read_f64(input)?, read_f64(input)?, read_f64(input)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_four_little_endian_bytes() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, 2, FLAG_ZLIB).expect("write header");
        assert_eq!(bytes, vec![2, 0, 1, 0]);
        let (version, flags) = read_header(&mut bytes.as_slice()).expect("read header");
        assert_eq!(version, 2);
        assert_eq!(flags, FLAG_ZLIB);
    }

    #[test]
    fn block_round_trips() {
        let mut bytes = Vec::new();
        write_block(&mut bytes, b"payload").expect("write block");
        assert_eq!(&bytes[..8], &7u64.to_le_bytes());
        let decoded = read_block(&mut bytes.as_slice()).expect("read block");
        assert_eq!(decoded, b"payload");
    }

    #[test]
    fn envelope_compresses_when_flagged() {
        let body = vec![42u8; 4096];
        let mut plain = Vec::new();
        encode_envelope(&mut plain, 1, FLAG_NONE, |w| {
            write_block(w, &body)?;
            Ok(())
        })
        .expect("plain envelope");
        let mut compressed = Vec::new();
        encode_envelope(&mut compressed, 1, FLAG_ZLIB, |w| {
            write_block(w, &body)?;
            Ok(())
        })
        .expect("compressed envelope");
        assert!(compressed.len() < plain.len());

        let decoded = decode_envelope(&mut compressed.as_slice(), |version, r| {
            assert_eq!(version, 1);
            read_block(r)
        })
        .expect("decode compressed");
        assert_eq!(decoded, body);
    }
}
