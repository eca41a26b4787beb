use std::fmt;

use crate::engine::errors::{Result, WireError};

/// Layout tag carried by a row batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum CompressionType {
    None = 2,
    Snappy = 3,
    Lz4 = 4,
}

impl CompressionType {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Snappy => "snappy",
            CompressionType::Lz4 => "lz4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(CompressionType::None),
            "snappy" => Some(CompressionType::Snappy),
            "lz4" => Some(CompressionType::Lz4),
            _ => None,
        }
    }

    /// The block codec for compressed layouts, `None` for the plain layout.
    pub fn codec(self) -> Option<&'static dyn BlockCodec> {
        match self {
            CompressionType::None => None,
            CompressionType::Snappy => Some(&SnappyCodec),
            CompressionType::Lz4 => Some(&Lz4Codec),
        }
    }
}

impl TryFrom<i16> for CompressionType {
    type Error = WireError;

    fn try_from(v: i16) -> Result<Self> {
        match v {
            2 => Ok(CompressionType::None),
            3 => Ok(CompressionType::Snappy),
            4 => Ok(CompressionType::Lz4),
            other => Err(WireError::malformed(
                "RowBatch",
                format!("unknown compression type {}", other),
            )),
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw block codec, no framing.
pub trait BlockCodec: Sync {
    fn name(&self) -> &'static str;
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;
    /// Decompress into `output`, returning the number of bytes produced.
    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;
}

pub struct SnappyCodec;

impl BlockCodec for SnappyCodec {
    fn name(&self) -> &'static str {
        "snappy"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(input)
            .map_err(|e| WireError::DecompressionFailure {
                codec: "snappy",
                detail: format!("compress: {e}"),
            })
    }

    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        snap::raw::Decoder::new()
            .decompress(input, output)
            .map_err(|e| WireError::DecompressionFailure {
                codec: "snappy",
                detail: e.to_string(),
            })
    }
}

pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress(input))
    }

    fn decompress_into(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        lz4_flex::block::decompress_into(input, output).map_err(|e| {
            WireError::DecompressionFailure {
                codec: "lz4",
                detail: e.to_string(),
            }
        })
    }
}

/// Decompress `src` with the codec named by `kind` into `dst`, which must
/// come out exactly full. The other codec is never tried.
pub fn decompress_into(kind: CompressionType, src: &[u8], dst: &mut [u8]) -> Result<()> {
    let codec = kind.codec().ok_or_else(|| {
        WireError::malformed("RowBatch", "uncompressed batch has no block to decompress")
    })?;
    let produced = codec.decompress_into(src, dst)?;
    if produced != dst.len() {
        return Err(WireError::DecompressionFailure {
            codec: codec.name(),
            detail: format!(
                "produced {} bytes, header declared {}",
                produced,
                dst.len()
            ),
        });
    }
    Ok(())
}

pub fn compress(kind: CompressionType, src: &[u8]) -> Result<Vec<u8>> {
    match kind.codec() {
        Some(codec) => codec.compress(src),
        None => Ok(src.to_vec()),
    }
}
