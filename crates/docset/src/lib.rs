//! Indexed doc-id sets for strata segments
//!
//! A doc set records which documents of a segment hold a value and the
//! ordinal of each such document. The doc space is cut into blocks of
//! 65536 docs; each non-empty block is stored in one of three encodings:
//!
//! - SPARSE: up to 4095 docs, one u16 per doc
//! - DENSE: a 65536-bit bitmap, optionally preceded by a rank table
//! - ALL: every doc present, nothing stored beyond the header
//!
//! A terminator block (id `0x7FFF`, single doc `0xFFFF`) decodes to
//! [`NO_MORE_DOCS`](strata_core::NO_MORE_DOCS); when the set already holds
//! docs in block `0x7FFF` the terminator repeats that block id. A jump table of
//! `(ordinal, offset)` pairs, one per block, follows the blocks when the set
//! spans more than one block.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod reader;
pub mod writer;

pub use config::{DisiConfig, DisiConfigError, DEFAULT_DENSE_RANK_POWER};
pub use reader::IndexedDisi;
pub use writer::{write_doc_set, DocSetSummary};

/// Docs per block.
pub const BLOCK_SIZE: u32 = 65536;

/// Words in a dense bitmap.
pub const DENSE_BLOCK_WORDS: usize = 1024;

/// Largest cardinality stored as a sparse block.
pub const MAX_ARRAY_LENGTH: u32 = 4095;
