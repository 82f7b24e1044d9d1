//! Chunked compressing document store for strata segments
//!
//! Records are appended in doc-id order and grouped into chunks that are
//! compressed as a unit. A chunk is closed when its buffered bytes reach
//! `chunk_size` or its buffered docs reach `max_docs_per_chunk`. A second
//! file indexes the chunks in fixed-size blocks so a reader can find the
//! chunk of any doc with two binary searches.
//!
//! - `format`: compression modes, format parameters and presets
//! - `header`: data file header
//! - `index`: chunk index blocks and trailer
//! - `record`: named-field record format and field masks
//! - `writer` / `reader`: the store itself

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod header;
pub mod index;
pub mod reader;
pub mod record;
pub mod writer;

pub use format::{CompressingStoreFormat, CompressionMode, FormatError};
pub use header::DataHeader;
pub use index::{BlockIndex, ChunkIndexEntry, IndexTrailer};
pub use reader::CompressingStoreReader;
pub use record::{FieldMask, StoredDocument, StoredField};
pub use writer::{CompressingStoreWriter, FinishedStore, StoreStats};
