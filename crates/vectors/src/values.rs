//! Byte vectors read straight from the segment data.
//!
//! Values are addressed by ordinal at `ord * dimension`. Each cursor owns a
//! one-vector buffer and remembers the last ordinal it read, so repeated
//! lookups of the same ordinal skip the read. The slice handed out borrows
//! the cursor and is valid until its next fetch.

use strata_core::{Bits, DocId, DocIdSetIterator, Error, Result, NO_MORE_DOCS, UNPOSITIONED};
use strata_docset::IndexedDisi;
use strata_packed::DirectMonotonicReader;
use strata_storage::io::IndexInput;
use tracing::debug;

use crate::field::VectorEncoding;
use crate::ord_to_doc::{OrdToDocConfiguration, SparseConfiguration};

/// Raw vector bytes plus the per-cursor read cache.
#[derive(Debug)]
struct VectorSlice {
    dimension: u32,
    size: u32,
    slice: IndexInput,
    last_ord: Option<u32>,
    buffer: Vec<u8>,
}

impl VectorSlice {
    fn new(dimension: u32, size: u32, slice: IndexInput) -> Self {
        VectorSlice {
            dimension,
            size,
            slice,
            last_ord: None,
            buffer: vec![0; dimension as usize],
        }
    }

    fn vector_value(&mut self, ord: u32) -> Result<&[u8]> {
        if ord >= self.size {
            return Err(Error::OrdOutOfRange {
                ord: u64::from(ord),
                size: u64::from(self.size),
            });
        }
        if self.last_ord != Some(ord) {
            self.last_ord = None;
            self.slice
                .seek(u64::from(ord) * u64::from(self.dimension))?;
            self.slice.read_bytes(&mut self.buffer)?;
            self.last_ord = Some(ord);
        }
        Ok(&self.buffer)
    }

    /// Same bytes, fresh cursor and cache.
    fn copy(&self) -> Self {
        VectorSlice::new(self.dimension, self.size, self.slice.clone())
    }
}

/// Values of a field present on every document.
#[derive(Debug)]
pub struct DenseVectorValues {
    values: VectorSlice,
    doc: DocId,
}

/// Values of a field present on some documents.
#[derive(Debug)]
pub struct SparseVectorValues {
    values: VectorSlice,
    disi: IndexedDisi,
    ord_to_doc: DirectMonotonicReader,
    configuration: SparseConfiguration,
    data: IndexInput,
}

impl SparseVectorValues {
    fn open(configuration: &SparseConfiguration, data: &IndexInput, values: VectorSlice) -> Result<Self> {
        let addresses =
            data.random_access_slice(configuration.addresses_offset, configuration.addresses_length)?;
        let ord_to_doc = DirectMonotonicReader::new(configuration.meta.clone(), addresses)?;
        let disi = IndexedDisi::new(
            data,
            configuration.docs_with_field_offset,
            configuration.docs_with_field_length,
            configuration.jump_table_entry_count,
            configuration.dense_rank_power,
            u64::from(configuration.size),
        )?;
        Ok(SparseVectorValues {
            values,
            disi,
            ord_to_doc,
            configuration: configuration.clone(),
            data: data.clone(),
        })
    }
}

/// Values of a field no document has.
#[derive(Debug)]
pub struct EmptyVectorValues {
    dimension: u32,
    doc: DocId,
}

/// Byte vector values of one field.
///
/// Iteration goes through [`DocIdSetIterator`]; random access by ordinal
/// through [`vector_value`](Self::vector_value).
#[derive(Debug)]
pub enum OffHeapByteVectorValues {
    /// Every document has a vector.
    Dense(DenseVectorValues),
    /// Some documents have a vector.
    Sparse(SparseVectorValues),
    /// No document has a vector, or the field is not byte-encoded.
    Empty(EmptyVectorValues),
}

impl OffHeapByteVectorValues {
    /// Open the values of one field.
    ///
    /// `data_offset`/`data_length` locate the raw vectors inside `data`; for
    /// sparse fields the doc set and addresses are read from `data` as well.
    pub fn load(
        configuration: &OrdToDocConfiguration,
        encoding: VectorEncoding,
        dimension: u32,
        data_offset: u64,
        data_length: u64,
        data: &IndexInput,
    ) -> Result<Self> {
        let sparse = match configuration {
            _ if encoding != VectorEncoding::Byte => return Ok(Self::empty(dimension)),
            OrdToDocConfiguration::Empty => return Ok(Self::empty(dimension)),
            OrdToDocConfiguration::Dense { .. } => None,
            OrdToDocConfiguration::Sparse(sparse) => Some(sparse),
        };
        let size = configuration.size();
        if u64::from(size) * u64::from(dimension) != data_length {
            return Err(Error::corruption(format!(
                "{} bytes of vector data for {} vectors of dimension {}",
                data_length, size, dimension
            )));
        }
        let slice = data.slice("vector-data", data_offset, data_length)?;
        let values = VectorSlice::new(dimension, size, slice);
        debug!(target: "strata::vectors", dimension, size, sparse = sparse.is_some(), "loaded vector values");
        match sparse {
            None => Ok(OffHeapByteVectorValues::Dense(DenseVectorValues {
                values,
                doc: UNPOSITIONED,
            })),
            Some(sparse) => Ok(OffHeapByteVectorValues::Sparse(SparseVectorValues::open(
                sparse, data, values,
            )?)),
        }
    }

    fn empty(dimension: u32) -> Self {
        OffHeapByteVectorValues::Empty(EmptyVectorValues {
            dimension,
            doc: UNPOSITIONED,
        })
    }

    /// Dimensions per vector.
    pub fn dimension(&self) -> u32 {
        match self {
            OffHeapByteVectorValues::Dense(dense) => dense.values.dimension,
            OffHeapByteVectorValues::Sparse(sparse) => sparse.values.dimension,
            OffHeapByteVectorValues::Empty(empty) => empty.dimension,
        }
    }

    /// Number of vectors.
    pub fn size(&self) -> u32 {
        match self {
            OffHeapByteVectorValues::Dense(dense) => dense.values.size,
            OffHeapByteVectorValues::Sparse(sparse) => sparse.values.size,
            OffHeapByteVectorValues::Empty(_) => 0,
        }
    }

    /// Vector of ordinal `ord`, valid until the next fetch on this cursor.
    pub fn vector_value(&mut self, ord: u32) -> Result<&[u8]> {
        match self {
            OffHeapByteVectorValues::Dense(dense) => dense.values.vector_value(ord),
            OffHeapByteVectorValues::Sparse(sparse) => sparse.values.vector_value(ord),
            OffHeapByteVectorValues::Empty(_) => Err(no_values()),
        }
    }

    /// Vector of the document the cursor is on.
    pub fn vector_value_current(&mut self) -> Result<&[u8]> {
        let ord = match self {
            OffHeapByteVectorValues::Dense(dense) => dense.doc,
            OffHeapByteVectorValues::Sparse(sparse) => sparse.disi.index(),
            OffHeapByteVectorValues::Empty(_) => return Err(no_values()),
        };
        if ord < 0 {
            return Err(Error::invalid_argument("cursor is not positioned on a document"));
        }
        self.vector_value(ord as u32)
    }

    /// Independent cursor over the same bytes, unpositioned and uncached.
    pub fn copy(&self) -> Result<Self> {
        match self {
            OffHeapByteVectorValues::Dense(dense) => {
                Ok(OffHeapByteVectorValues::Dense(DenseVectorValues {
                    values: dense.values.copy(),
                    doc: UNPOSITIONED,
                }))
            }
            OffHeapByteVectorValues::Sparse(sparse) => Ok(OffHeapByteVectorValues::Sparse(
                SparseVectorValues::open(&sparse.configuration, &sparse.data, sparse.values.copy())?,
            )),
            OffHeapByteVectorValues::Empty(_) => Err(no_values()),
        }
    }

    /// Document holding ordinal `ord`.
    pub fn ord_to_doc(&self, ord: u32) -> Result<DocId> {
        if let OffHeapByteVectorValues::Empty(_) = self {
            return Err(no_values());
        }
        let size = self.size();
        if ord >= size {
            return Err(Error::OrdOutOfRange {
                ord: u64::from(ord),
                size: u64::from(size),
            });
        }
        Ok(match self {
            OffHeapByteVectorValues::Sparse(sparse) => sparse.ord_to_doc.get(u64::from(ord)) as DocId,
            _ => ord as DocId,
        })
    }

    /// Re-express a filter over doc ids as a filter over ordinals.
    ///
    /// `None` means every document is accepted and stays `None`.
    pub fn accept_ords<'a>(&self, accept_docs: Option<&'a dyn Bits>) -> Option<AcceptOrds<'a>> {
        let accept_docs = accept_docs?;
        match self {
            OffHeapByteVectorValues::Dense(_) => Some(AcceptOrds::Docs(accept_docs)),
            OffHeapByteVectorValues::Sparse(sparse) => Some(AcceptOrds::Mapped {
                accept_docs,
                ord_to_doc: sparse.ord_to_doc.clone(),
                size: sparse.values.size,
            }),
            OffHeapByteVectorValues::Empty(_) => None,
        }
    }
}

impl DocIdSetIterator for OffHeapByteVectorValues {
    fn doc_id(&self) -> DocId {
        match self {
            OffHeapByteVectorValues::Dense(dense) => dense.doc,
            OffHeapByteVectorValues::Sparse(sparse) => sparse.disi.doc_id(),
            OffHeapByteVectorValues::Empty(empty) => empty.doc,
        }
    }

    fn next_doc(&mut self) -> Result<DocId> {
        match self {
            OffHeapByteVectorValues::Sparse(sparse) => sparse.disi.next_doc(),
            _ => {
                let doc = self.doc_id();
                if doc == NO_MORE_DOCS {
                    return Ok(NO_MORE_DOCS);
                }
                self.advance(doc + 1)
            }
        }
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        debug_assert!(
            target > self.doc_id() || self.doc_id() == NO_MORE_DOCS,
            "advance({}) must move past current doc {}",
            target,
            self.doc_id()
        );
        match self {
            OffHeapByteVectorValues::Dense(dense) => {
                dense.doc = if target >= dense.values.size as DocId || dense.doc == NO_MORE_DOCS {
                    NO_MORE_DOCS
                } else {
                    target
                };
                Ok(dense.doc)
            }
            OffHeapByteVectorValues::Sparse(sparse) => sparse.disi.advance(target),
            OffHeapByteVectorValues::Empty(empty) => {
                empty.doc = NO_MORE_DOCS;
                Ok(NO_MORE_DOCS)
            }
        }
    }

    fn cost(&self) -> u64 {
        u64::from(self.size())
    }
}

fn no_values() -> Error {
    Error::Unsupported("field has no vector values".to_string())
}

/// A doc-id filter seen through ordinals.
#[derive(Clone)]
pub enum AcceptOrds<'a> {
    /// Ordinals and doc ids coincide; the doc filter applies as is.
    Docs(&'a dyn Bits),
    /// `get(ord)` answers `accept_docs.get(ord_to_doc(ord))`.
    Mapped {
        /// Filter over doc ids.
        accept_docs: &'a dyn Bits,
        /// Ordinal to doc id mapping.
        ord_to_doc: DirectMonotonicReader,
        /// Number of ordinals.
        size: u32,
    },
}

impl Bits for AcceptOrds<'_> {
    fn get(&self, index: usize) -> bool {
        match self {
            AcceptOrds::Docs(docs) => docs.get(index),
            AcceptOrds::Mapped {
                accept_docs,
                ord_to_doc,
                ..
            } => accept_docs.get(ord_to_doc.get(index as u64) as usize),
        }
    }

    fn len(&self) -> usize {
        match self {
            AcceptOrds::Docs(docs) => docs.len(),
            AcceptOrds::Mapped { size, .. } => *size as usize,
        }
    }
}
