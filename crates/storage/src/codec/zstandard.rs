//! Zstandard codecs.
//!
//! Two fixed levels are exposed under stable identifiers so that a reader can
//! always reconstruct the codec from the id recorded in a data header:
//!
//! - `"zstd-fast"`: level 1, favours indexing and retrieval speed
//! - `"zstd-high"`: level 19, favours compression ratio

use super::traits::{CodecError, StorageCodec};

/// Compression level used by `"zstd-fast"`.
pub const FAST_LEVEL: i32 = 1;

/// Compression level used by `"zstd-high"`.
pub const HIGH_LEVEL: i32 = 19;

/// Zstandard block codec.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
    id: &'static str,
}

impl ZstdCodec {
    /// Fast codec (`"zstd-fast"`).
    pub fn fast() -> Self {
        ZstdCodec {
            level: FAST_LEVEL,
            id: "zstd-fast",
        }
    }

    /// High-compression codec (`"zstd-high"`).
    pub fn high() -> Self {
        ZstdCodec {
            level: HIGH_LEVEL,
            id: "zstd-high",
        }
    }

    /// Compression level passed to zstd.
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl StorageCodec for ZstdCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::compress(data, self.level).map_err(|e| CodecError::encode(e.to_string(), self.id))
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        let decoded = if decoded_len == 0 {
            // bulk decompression refuses a zero-capacity destination
            zstd::stream::decode_all(data)
        } else {
            zstd::bulk::decompress(data, decoded_len)
        }
        .map_err(|e| CodecError::decode(e.to_string(), self.id, data.len()))?;

        if decoded.len() != decoded_len {
            return Err(CodecError::decode(
                format!("decoded {} bytes, expected {}", decoded.len(), decoded_len),
                self.id,
                data.len(),
            ));
        }
        Ok(decoded)
    }

    fn codec_id(&self) -> &str {
        self.id
    }
}
