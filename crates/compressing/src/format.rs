//! Store format parameters
//!
//! A [`CompressingStoreFormat`] fixes how documents are grouped into chunks
//! and how chunks are indexed. It is validated once at construction and never
//! clamped: a bad parameter is an error.

use std::fmt;

use strata_storage::{get_codec, StorageCodec};

/// Chunk size of the fast stored-fields preset (80 KiB).
pub const BEST_SPEED_CHUNK_SIZE: u32 = 80 * 1024;
/// Docs per chunk of the fast stored-fields preset.
pub const BEST_SPEED_MAX_DOCS_PER_CHUNK: u32 = 1024;
/// Chunk size of the high-compression stored-fields preset (480 KiB).
pub const BEST_COMPRESSION_CHUNK_SIZE: u32 = 480 * 1024;
/// Docs per chunk of the high-compression stored-fields preset.
pub const BEST_COMPRESSION_MAX_DOCS_PER_CHUNK: u32 = 4096;
/// Chunk size of the term-vectors preset.
pub const TERM_VECTORS_CHUNK_SIZE: u32 = 4 * 1024;
/// Docs per chunk of the term-vectors preset.
pub const TERM_VECTORS_MAX_DOCS_PER_CHUNK: u32 = 128;
/// Chunks per index block of every preset.
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

/// Trade-off between compression ratio and speed.
///
/// Persisted as a codec id, so a reader always picks the decompressor the
/// writer used regardless of its own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMode {
    /// Fast compression and decompression.
    BestSpeed,
    /// Higher ratio at a higher CPU cost.
    BestCompression,
    /// No compression.
    Uncompressed,
}

impl CompressionMode {
    /// Every mode.
    pub const ALL: [CompressionMode; 3] = [
        CompressionMode::BestSpeed,
        CompressionMode::BestCompression,
        CompressionMode::Uncompressed,
    ];

    /// Id of the codec implementing this mode.
    pub fn codec_id(self) -> &'static str {
        match self {
            CompressionMode::BestSpeed => "zstd-fast",
            CompressionMode::BestCompression => "zstd-high",
            CompressionMode::Uncompressed => "identity",
        }
    }

    /// Mode whose codec has the given id.
    pub fn from_codec_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.codec_id() == id)
    }

    /// Codec implementing this mode.
    pub fn codec(self) -> strata_core::Result<Box<dyn StorageCodec>> {
        Ok(get_codec(self.codec_id())?)
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMode::BestSpeed => write!(f, "BEST_SPEED"),
            CompressionMode::BestCompression => write!(f, "BEST_COMPRESSION"),
            CompressionMode::Uncompressed => write!(f, "UNCOMPRESSED"),
        }
    }
}

/// Invalid store format parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// `format_name` is empty.
    #[error("format name must not be empty")]
    EmptyName,
    /// `chunk_size < 1`.
    #[error("chunkSize must be >= 1")]
    ChunkSize,
    /// `max_docs_per_chunk < 1`.
    #[error("maxDocsPerChunk must be >= 1")]
    MaxDocsPerChunk,
    /// `block_size < 1`.
    #[error("blockSize must be >= 1")]
    BlockSize,
}

impl From<FormatError> for strata_core::Error {
    fn from(e: FormatError) -> Self {
        strata_core::Error::InvalidConfig(e.to_string())
    }
}

/// Parameters of a chunked compressing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressingStoreFormat {
    /// Name recorded in the data header.
    pub format_name: String,
    /// Compression used for every chunk.
    pub mode: CompressionMode,
    /// Buffered bytes that trigger a chunk flush.
    pub chunk_size: u32,
    /// Buffered docs that trigger a chunk flush.
    pub max_docs_per_chunk: u32,
    /// Chunk index entries per persisted index block.
    pub block_size: u32,
}

impl CompressingStoreFormat {
    /// Create a validated format.
    pub fn new(
        format_name: impl Into<String>,
        mode: CompressionMode,
        chunk_size: u32,
        max_docs_per_chunk: u32,
        block_size: u32,
    ) -> Result<Self, FormatError> {
        let format = CompressingStoreFormat {
            format_name: format_name.into(),
            mode,
            chunk_size,
            max_docs_per_chunk,
            block_size,
        };
        format.validate()?;
        Ok(format)
    }

    /// Stored-fields preset for the given mode.
    pub fn stored_fields(mode: CompressionMode) -> Self {
        let (format_name, chunk_size, max_docs_per_chunk) = match mode {
            CompressionMode::BestCompression => (
                "StoredFieldsHigh",
                BEST_COMPRESSION_CHUNK_SIZE,
                BEST_COMPRESSION_MAX_DOCS_PER_CHUNK,
            ),
            _ => (
                "StoredFieldsFast",
                BEST_SPEED_CHUNK_SIZE,
                BEST_SPEED_MAX_DOCS_PER_CHUNK,
            ),
        };
        CompressingStoreFormat {
            format_name: format_name.to_string(),
            mode,
            chunk_size,
            max_docs_per_chunk,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Term-vectors preset: small chunks, fast compression.
    pub fn term_vectors() -> Self {
        CompressingStoreFormat {
            format_name: "TermVectors".to_string(),
            mode: CompressionMode::BestSpeed,
            chunk_size: TERM_VECTORS_CHUNK_SIZE,
            max_docs_per_chunk: TERM_VECTORS_MAX_DOCS_PER_CHUNK,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Set the chunk size (builder pattern).
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the docs-per-chunk limit (builder pattern).
    pub fn with_max_docs_per_chunk(mut self, max_docs_per_chunk: u32) -> Self {
        self.max_docs_per_chunk = max_docs_per_chunk;
        self
    }

    /// Set the index block size (builder pattern).
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the compression mode (builder pattern).
    pub fn with_mode(mut self, mode: CompressionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.format_name.is_empty() {
            return Err(FormatError::EmptyName);
        }
        if self.chunk_size < 1 {
            return Err(FormatError::ChunkSize);
        }
        if self.max_docs_per_chunk < 1 {
            return Err(FormatError::MaxDocsPerChunk);
        }
        if self.block_size < 1 {
            return Err(FormatError::BlockSize);
        }
        Ok(())
    }
}

impl Default for CompressingStoreFormat {
    fn default() -> Self {
        Self::stored_fields(CompressionMode::BestSpeed)
    }
}

impl fmt::Display for CompressingStoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(compressionMode={}, chunkSize={}, maxDocsPerChunk={}, blockSize={})",
            self.format_name, self.mode, self.chunk_size, self.max_docs_per_chunk, self.block_size
        )
    }
}
