//! Segment byte I/O.
//!
//! - `input`: shared, immutable byte sources (`IndexInput`, `RandomAccessInput`)
//! - `output`: append-only sinks (`IndexOutput`, `VecOutput`, `FileOutput`)

mod input;
mod output;

pub use input::{IndexInput, RandomAccessInput};
pub use output::{encode_varint, FileOutput, IndexOutput, VecOutput};
