//! Packed integer encodings for strata segments
//!
//! - `direct`: fixed-width bit packing with single-read random access
//! - `monotonic`: block-wise linear approximation of non-decreasing
//!   sequences, used to translate vector ordinals into document ids

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod direct;
pub mod monotonic;

pub use direct::{bits_required, DirectReader, DirectWriter, SUPPORTED_BITS_PER_VALUE};
pub use monotonic::{DirectMonotonicMeta, DirectMonotonicReader, DirectMonotonicWriter};
