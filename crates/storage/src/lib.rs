//! Storage layer for strata segments
//!
//! This crate provides the byte-level collaborators every segment structure
//! is built on:
//! - IndexInput / RandomAccessInput: cursors over owned or memory-mapped data
//! - IndexOutput: append-only sinks (in-memory and buffered file)
//! - StorageCodec: the compression seam, resolved by codec id

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod io;

pub use codec::{get_codec, CodecError, IdentityCodec, StorageCodec, ZstdCodec};
pub use io::{FileOutput, IndexInput, IndexOutput, RandomAccessInput, VecOutput};
