//! Document id conventions and the forward-only iterator contract.

use crate::error::Result;

/// Document number inside a segment.
///
/// Signed so that an unpositioned iterator can report `-1`.
pub type DocId = i32;

/// Position of an iterator that has not returned any document yet.
pub const UNPOSITIONED: DocId = -1;

/// Sentinel returned once an iterator is exhausted.
pub const NO_MORE_DOCS: DocId = i32::MAX;

/// Largest number of documents a segment can hold.
pub const MAX_DOCS: u32 = (i32::MAX - 1) as u32;

/// Forward-only iteration over an increasing set of document ids.
///
/// State machine: `UNPOSITIONED -> iterating -> NO_MORE_DOCS`. Exhaustion is
/// permanent; further calls keep returning [`NO_MORE_DOCS`].
pub trait DocIdSetIterator {
    /// Current document, [`UNPOSITIONED`] or [`NO_MORE_DOCS`].
    fn doc_id(&self) -> DocId;

    /// Advance to the next document holding a value.
    fn next_doc(&mut self) -> Result<DocId>;

    /// Advance to the first document `>= target`.
    ///
    /// `target` must be greater than [`doc_id`](Self::doc_id). The contract is
    /// checked with `debug_assert!` only; release builds trust the caller.
    fn advance(&mut self, target: DocId) -> Result<DocId>;

    /// Upper bound on the number of documents this iterator visits.
    fn cost(&self) -> u64;
}
