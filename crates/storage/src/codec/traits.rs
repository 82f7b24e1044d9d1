//! Storage codec trait definitions.

/// Storage codec trait.
///
/// Every chunk written by the compressing store goes through a codec.
/// The codec is chosen per store instance and its identifier is recorded in
/// the data header so readers select a matching decoder.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` to allow concurrent encoding/decoding
/// from multiple threads.
///
/// # Determinism
///
/// `decode(encode(x), x.len()) == x` for every input. Encoding the same bytes
/// twice produces the same output.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    ///
    /// The returned bytes are what gets written to disk.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes from storage.
    ///
    /// `decoded_len` is the length recorded at write time. A payload that
    /// decodes to any other length is reported as an error.
    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier.
    ///
    /// This is stored in the data header to ensure the correct codec
    /// is used when reopening a store.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("Encode error (codec={codec_id}): {detail}")]
    EncodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the encode
        codec_id: String,
    },

    /// Decoding failed (invalid payload, wrong codec, length mismatch).
    ///
    /// Carries the codec identity and data length so callers can
    /// distinguish a wrong-codec error from data corruption.
    #[error("Decode error (codec={codec_id}, data_len={data_len}): {detail}")]
    DecodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the decode
        codec_id: String,
        /// Length of the data that failed to decode
        data_len: usize,
    },

    /// Unknown codec identifier.
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),
}

impl CodecError {
    /// Create a decode error with full diagnostic context.
    pub fn decode(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::DecodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }

    /// Create an encode error.
    pub fn encode(detail: impl Into<String>, codec_id: impl Into<String>) -> Self {
        CodecError::EncodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
        }
    }
}

impl From<CodecError> for strata_core::Error {
    fn from(e: CodecError) -> Self {
        strata_core::Error::Codec(e.to_string())
    }
}
