//! StrataStore - segment-level storage structures for search indexes
//!
//! Two read paths over immutable segment files:
//!
//! - a chunked compressing document store: records are grouped into chunks,
//!   each chunk is compressed as a unit and located through a block index
//! - off-heap byte vector values: fixed-dimension vectors addressed by
//!   ordinal, with dense, sparse or empty doc-id mappings
//!
//! # Quick Start
//!
//! ```ignore
//! use stratastore::{CompressingStoreFormat, CompressingStoreReader, CompressingStoreWriter};
//! use stratastore::{CompressionMode, IndexInput, VecOutput};
//!
//! let format = CompressingStoreFormat::stored_fields(CompressionMode::BestSpeed);
//! let mut writer = CompressingStoreWriter::new(format, VecOutput::new(), VecOutput::new())?;
//! writer.add_document(0, b"hello")?;
//! let finished = writer.finish()?;
//!
//! let reader = CompressingStoreReader::open(
//!     IndexInput::from_vec("data", finished.data.into_inner()),
//!     IndexInput::from_vec("index", finished.index.into_inner()),
//! )?;
//! assert_eq!(reader.document(0)?, b"hello");
//! ```
//!
//! # Crates
//!
//! - `strata-core`: errors, doc ids, iterator and filter traits
//! - `strata-storage`: byte inputs, outputs and codecs
//! - `strata-packed`: monotonic integer sequences
//! - `strata-docset`: indexed doc-id sets
//! - `strata-vectors`: off-heap vector values
//! - `strata-compressing`: the chunked document store

pub use strata_compressing::{
    CompressingStoreFormat, CompressingStoreReader, CompressingStoreWriter, CompressionMode,
    FieldMask, FinishedStore, StoreStats, StoredDocument, StoredField,
};
pub use strata_core::{
    Bits, DocId, DocIdSetIterator, Error, FixedBitSet, Result, NO_MORE_DOCS, UNPOSITIONED,
};
pub use strata_docset::{write_doc_set, DisiConfig, IndexedDisi};
pub use strata_storage::{
    get_codec, FileOutput, IndexInput, IndexOutput, RandomAccessInput, StorageCodec, VecOutput,
};
pub use strata_vectors::{
    write_byte_vector_field, AcceptOrds, FieldEntry, OffHeapByteVectorValues,
    OrdToDocConfiguration, VectorEncoding,
};
