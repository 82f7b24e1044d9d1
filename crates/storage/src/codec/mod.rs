//! Storage codec abstraction.
//!
//! The codec seam is where chunk compression plugs in. All chunk payloads
//! written by the compressing store go through a codec for encode/decode
//! operations, and the codec identifier travels with the data.
//!
//! # Usage
//!
//! ```
//! use strata_storage::codec::get_codec;
//!
//! let codec = get_codec("zstd-fast").unwrap();
//! let data = b"hello world hello world hello world";
//!
//! let encoded = codec.encode(data).unwrap();
//! let decoded = codec.decode(&encoded, data.len()).unwrap();
//!
//! assert_eq!(data.as_slice(), decoded.as_slice());
//! ```

mod identity;
mod traits;
mod zstandard;

pub use identity::IdentityCodec;
pub use traits::{CodecError, StorageCodec};
pub use zstandard::ZstdCodec;

/// Get a codec by its identifier.
///
/// Returns the codec if recognized, or an error for unknown codec IDs.
///
/// # Known Codecs
///
/// - `"identity"`: No-op codec (pass-through)
/// - `"zstd-fast"`: Zstandard, level 1
/// - `"zstd-high"`: Zstandard, level 19
pub fn get_codec(codec_id: &str) -> Result<Box<dyn StorageCodec>, CodecError> {
    match codec_id {
        "identity" => Ok(Box::new(IdentityCodec)),
        "zstd-fast" => Ok(Box::new(ZstdCodec::fast())),
        "zstd-high" => Ok(Box::new(ZstdCodec::high())),
        _ => Err(CodecError::UnknownCodec(codec_id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_known_codecs() {
        for id in ["identity", "zstd-fast", "zstd-high"] {
            let codec = get_codec(id).unwrap();
            assert_eq!(codec.codec_id(), id);
        }
    }

    #[test]
    fn test_get_unknown_codec() {
        let result = get_codec("lz4");
        assert!(matches!(result, Err(CodecError::UnknownCodec(_))));
    }
}
