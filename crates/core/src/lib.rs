//! Core types for the strata segment store
//!
//! This crate defines the types shared by the storage, packed-integer,
//! doc-set, vector and compressing-store crates:
//! - Error: the workspace-wide error enum and `Result` alias
//! - DocId: document numbering, iterator sentinels, `DocIdSetIterator`
//! - Bits: live-docs / accept filters and a fixed bitset

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bits;
pub mod docid;
pub mod error;

pub use bits::{Bits, FixedBitSet};
pub use docid::{DocId, DocIdSetIterator, MAX_DOCS, NO_MORE_DOCS, UNPOSITIONED};
pub use error::{Error, Result};
