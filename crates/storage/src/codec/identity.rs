//! Identity codec (no transformation).
//!
//! Stores chunks uncompressed. Useful for debugging on-disk layouts and for
//! payloads that are already compressed.

use super::traits::{CodecError, StorageCodec};

/// Identity codec - no transformation.
///
/// Bytes pass through unchanged.
///
/// # Example
///
/// ```
/// use strata_storage::codec::{StorageCodec, IdentityCodec};
///
/// let codec = IdentityCodec;
/// let data = b"hello world";
///
/// let encoded = codec.encode(data).unwrap();
/// assert_eq!(data.as_slice(), encoded.as_slice());
///
/// let decoded = codec.decode(&encoded, data.len()).unwrap();
/// assert_eq!(data.as_slice(), decoded.as_slice());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>, CodecError> {
        if data.len() != decoded_len {
            return Err(CodecError::decode(
                format!("expected {} bytes", decoded_len),
                self.codec_id(),
                data.len(),
            ));
        }
        Ok(data.to_vec())
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let codec = IdentityCodec;
        let data = vec![0xFF, 0x00, 0xAB, 0xCD];

        let encoded = codec.encode(&data).unwrap();
        assert_eq!(data, encoded);
        let decoded = codec.decode(&encoded, data.len()).unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn test_identity_empty() {
        let codec = IdentityCodec;
        let encoded = codec.encode(&[]).unwrap();
        let decoded = codec.decode(&encoded, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_identity_length_mismatch() {
        let codec = IdentityCodec;
        let result = codec.decode(&[1, 2, 3], 4);
        assert!(matches!(result, Err(CodecError::DecodeError { data_len: 3, .. })));
    }

    #[test]
    fn test_identity_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IdentityCodec>();
    }
}
