use anyhow::{Context, Result};
use bincode::Options;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Serialization strategy for the registry index blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formatter {
    /// Human-readable JSON, optionally indented.
    Json { pretty: bool },
    /// Packed fixed-width binary wrapped in a zlib stream.
    Binary,
}

impl Formatter {
    pub fn encode<T: Serialize>(&self, out: &mut dyn Write, value: &T) -> Result<()> {
        match self {
            Formatter::Json { pretty: true } => {
                serde_json::to_writer_pretty(out, value).context("encoding JSON blob")
            }
            Formatter::Json { pretty: false } => {
                serde_json::to_writer(out, value).context("encoding JSON blob")
            }
            Formatter::Binary => {
                let mut encoder = ZlibEncoder::new(out, Compression::default());
                bincode_options()
                    .serialize_into(&mut encoder, value)
                    .context("encoding binary blob")?;
                encoder.finish().context("finishing binary blob")?;
                Ok(())
            }
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, input: &mut dyn Read) -> Result<T> {
        match self {
            Formatter::Json { .. } => {
                serde_json::from_reader(input).context("decoding JSON blob")
            }
            Formatter::Binary => {
                let decoder = ZlibDecoder::new(input);
                bincode_options().deserialize_from(decoder).context("decoding binary blob")
            }
        }
    }
}

fn bincode_options() -> impl bincode::Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        payload: Vec<u8>,
    }

    #[test]
    fn json_round_trips() {
        let record = Record { name: "brick".to_string(), payload: vec![1, 2, 3] };
        for formatter in [Formatter::Json { pretty: true }, Formatter::Json { pretty: false }] {
            let mut bytes = Vec::new();
            formatter.encode(&mut bytes, &record).expect("encode");
            let decoded: Record = formatter.decode(&mut bytes.as_slice()).expect("decode");
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn binary_round_trips_and_compresses() {
        let record = Record { name: "brick".to_string(), payload: vec![7; 4096] };
        let mut bytes = Vec::new();
        Formatter::Binary.encode(&mut bytes, &record).expect("encode");
        assert!(bytes.len() < 4096, "repetitive payload must compress");
        let decoded: Record = Formatter::Binary.decode(&mut bytes.as_slice()).expect("decode");
        assert_eq!(decoded, record);
    }
}
