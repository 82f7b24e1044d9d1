//! Off-heap byte vector values for strata segments
//!
//! - `field`: per-field metadata and the writer that lays a field out
//! - `ord_to_doc`: dense/sparse/empty mapping between ordinals and doc ids
//! - `values`: random and sequential access to the stored vectors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod ord_to_doc;
pub mod values;

pub use field::{write_byte_vector_field, FieldEntry, VectorEncoding};
pub use ord_to_doc::{OrdToDocConfiguration, SparseConfiguration, DIRECT_MONOTONIC_BLOCK_SHIFT};
pub use values::{
    AcceptOrds, DenseVectorValues, EmptyVectorValues, OffHeapByteVectorValues, SparseVectorValues,
};
