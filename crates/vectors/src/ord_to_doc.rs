//! Ordinal to document mapping of a vector field.
//!
//! A field with values on every document is *dense*: ordinal and doc id
//! coincide. Otherwise the docs holding a value are recorded as an indexed doc
//! set (for iteration) and a monotonic sequence (for `ord -> doc`).
//!
//! ## Stored meta
//!
//! ```text
//! tag                       u8    0 = empty, 1 = dense, 2 = sparse
//! size                      u32   (dense, sparse)
//! docs_with_field_offset    u64   (sparse only, from here on)
//! docs_with_field_length    u64
//! jump_table_entry_count    u32
//! dense_rank_power          u8    0 = no rank table
//! addresses_offset          u64
//! block_shift               u8
//! monotonic block meta      ...
//! addresses_length          u64
//! ```

use std::sync::Arc;

use strata_core::{DocId, Error, Result};
use strata_docset::{write_doc_set, DisiConfig, DEFAULT_DENSE_RANK_POWER};
use strata_packed::{DirectMonotonicMeta, DirectMonotonicWriter};
use strata_storage::io::{IndexInput, IndexOutput};

/// Block shift of the ord-to-doc monotonic sequence.
pub const DIRECT_MONOTONIC_BLOCK_SHIFT: u8 = 16;

const TAG_EMPTY: u8 = 0;
const TAG_DENSE: u8 = 1;
const TAG_SPARSE: u8 = 2;

/// How ordinals map to documents for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum OrdToDocConfiguration {
    /// No document has a value.
    Empty,
    /// Every document has a value; ordinal == doc id.
    Dense {
        /// Number of values.
        size: u32,
    },
    /// Only some documents have a value.
    Sparse(SparseConfiguration),
}

/// Location of the doc set and address sequence of a sparse field.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseConfiguration {
    /// Number of values.
    pub size: u32,
    /// Start of the doc set in the vector data.
    pub docs_with_field_offset: u64,
    /// Length of the doc set, jump table included.
    pub docs_with_field_length: u64,
    /// Jump table entries at the end of the doc set.
    pub jump_table_entry_count: u32,
    /// Rank power of dense doc-set blocks.
    pub dense_rank_power: Option<u8>,
    /// Start of the monotonic residuals in the vector data.
    pub addresses_offset: u64,
    /// Length of the monotonic residuals.
    pub addresses_length: u64,
    /// Monotonic block parameters.
    pub meta: Arc<DirectMonotonicMeta>,
}

impl OrdToDocConfiguration {
    /// Number of values in the field.
    pub fn size(&self) -> u32 {
        match self {
            OrdToDocConfiguration::Empty => 0,
            OrdToDocConfiguration::Dense { size } => *size,
            OrdToDocConfiguration::Sparse(sparse) => sparse.size,
        }
    }

    /// True when no document has a value.
    pub fn is_empty(&self) -> bool {
        matches!(self, OrdToDocConfiguration::Empty)
    }

    /// True when every document has a value.
    pub fn is_dense(&self) -> bool {
        matches!(self, OrdToDocConfiguration::Dense { .. })
    }

    /// Record which of `max_doc` documents hold a value.
    ///
    /// For sparse fields the doc set and the address sequence are appended to
    /// `data`; everything needed to find them again goes to `meta`.
    pub fn write_stored_meta(
        meta: &mut dyn IndexOutput,
        data: &mut dyn IndexOutput,
        docs: &[DocId],
        max_doc: u32,
    ) -> Result<()> {
        let count = docs.len();
        if count as u64 > u64::from(max_doc) {
            return Err(Error::invalid_argument(format!(
                "{} values for {} documents",
                count, max_doc
            )));
        }
        if let Some(pair) = docs.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::invalid_argument(format!(
                "doc ids must be strictly increasing: {} after {}",
                pair[1], pair[0]
            )));
        }
        if docs.first().is_some_and(|&first| first < 0) {
            return Err(Error::invalid_argument("negative doc id"));
        }
        if let Some(&last) = docs.last() {
            if last as u32 >= max_doc {
                return Err(Error::DocOutOfRange {
                    doc_id: last as u64,
                    max_doc: u64::from(max_doc),
                });
            }
        }

        if count == 0 {
            return meta.write_u8(TAG_EMPTY);
        }
        if count as u64 == u64::from(max_doc) {
            meta.write_u8(TAG_DENSE)?;
            return meta.write_u32(count as u32);
        }

        meta.write_u8(TAG_SPARSE)?;
        meta.write_u32(count as u32)?;

        let docs_offset = data.file_pointer();
        let disi_config = DisiConfig::default();
        let summary = write_doc_set(docs.iter().copied(), &mut *data, &disi_config)?;
        meta.write_u64(docs_offset)?;
        meta.write_u64(summary.length)?;
        meta.write_u32(summary.jump_table_entry_count)?;
        meta.write_u8(DEFAULT_DENSE_RANK_POWER)?;

        let addresses_offset = data.file_pointer();
        meta.write_u64(addresses_offset)?;
        meta.write_u8(DIRECT_MONOTONIC_BLOCK_SHIFT)?;
        let mut writer = DirectMonotonicWriter::new(
            &mut *meta,
            &mut *data,
            count as u64,
            DIRECT_MONOTONIC_BLOCK_SHIFT,
        )?;
        for &doc in docs {
            writer.add(i64::from(doc))?;
        }
        writer.finish()?;
        meta.write_u64(data.file_pointer() - addresses_offset)?;
        Ok(())
    }

    /// Parse what [`write_stored_meta`](Self::write_stored_meta) wrote.
    pub fn from_stored_meta(meta: &mut IndexInput) -> Result<Self> {
        match meta.read_u8()? {
            TAG_EMPTY => Ok(OrdToDocConfiguration::Empty),
            TAG_DENSE => Ok(OrdToDocConfiguration::Dense {
                size: meta.read_u32()?,
            }),
            TAG_SPARSE => {
                let size = meta.read_u32()?;
                let docs_with_field_offset = meta.read_u64()?;
                let docs_with_field_length = meta.read_u64()?;
                let jump_table_entry_count = meta.read_u32()?;
                let dense_rank_power = match meta.read_u8()? {
                    0 => None,
                    power => Some(power),
                };
                let disi_config = DisiConfig { dense_rank_power };
                disi_config
                    .validate()
                    .map_err(|e| Error::corruption(e.to_string()))?;
                let addresses_offset = meta.read_u64()?;
                let block_shift = meta.read_u8()?;
                let monotonic = DirectMonotonicMeta::load(meta, u64::from(size), block_shift)?;
                let addresses_length = meta.read_u64()?;
                Ok(OrdToDocConfiguration::Sparse(SparseConfiguration {
                    size,
                    docs_with_field_offset,
                    docs_with_field_length,
                    jump_table_entry_count,
                    dense_rank_power,
                    addresses_offset,
                    addresses_length,
                    meta: Arc::new(monotonic),
                }))
            }
            tag => Err(Error::corruption(format!(
                "unknown ord-to-doc configuration tag {}",
                tag
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_storage::io::VecOutput;

    fn roundtrip(docs: &[DocId], max_doc: u32) -> (OrdToDocConfiguration, Vec<u8>) {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        OrdToDocConfiguration::write_stored_meta(&mut meta, &mut data, docs, max_doc).unwrap();
        let mut meta_in = IndexInput::from_vec("meta", meta.into_inner());
        let config = OrdToDocConfiguration::from_stored_meta(&mut meta_in).unwrap();
        assert_eq!(meta_in.remaining(), 0);
        (config, data.into_inner())
    }

    #[test]
    fn test_empty_field() {
        let (config, data) = roundtrip(&[], 10);
        assert!(config.is_empty());
        assert_eq!(config.size(), 0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_dense_field() {
        let docs: Vec<DocId> = (0..10).collect();
        let (config, data) = roundtrip(&docs, 10);
        assert_eq!(config, OrdToDocConfiguration::Dense { size: 10 });
        assert!(config.is_dense());
        assert!(data.is_empty());
    }

    #[test]
    fn test_sparse_field_layout() {
        let (config, data) = roundtrip(&[2, 5, 9], 10);
        let sparse = match config {
            OrdToDocConfiguration::Sparse(sparse) => sparse,
            other => panic!("expected sparse, got {:?}", other),
        };
        assert_eq!(sparse.size, 3);
        assert_eq!(sparse.docs_with_field_offset, 0);
        assert_eq!(sparse.jump_table_entry_count, 0);
        assert_eq!(sparse.dense_rank_power, Some(DEFAULT_DENSE_RANK_POWER));
        assert_eq!(
            sparse.addresses_offset,
            sparse.docs_with_field_offset + sparse.docs_with_field_length
        );
        assert_eq!(
            sparse.addresses_offset + sparse.addresses_length,
            data.len() as u64
        );
        assert_eq!(sparse.meta.num_values(), 3);
        assert_eq!(sparse.meta.block_shift(), DIRECT_MONOTONIC_BLOCK_SHIFT);
    }

    #[test]
    fn test_rejects_docs_beyond_max_doc() {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        let err =
            OrdToDocConfiguration::write_stored_meta(&mut meta, &mut data, &[1, 12], 10).unwrap_err();
        assert!(matches!(err, Error::DocOutOfRange { doc_id: 12, .. }));
    }

    #[test]
    fn test_rejects_unsorted_docs() {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        assert!(
            OrdToDocConfiguration::write_stored_meta(&mut meta, &mut data, &[5, 2, 9], 10).is_err()
        );
    }

    #[test]
    fn test_unknown_tag_is_corruption() {
        let mut meta_in = IndexInput::from_vec("meta", vec![7]);
        assert!(OrdToDocConfiguration::from_stored_meta(&mut meta_in)
            .unwrap_err()
            .is_corruption());
    }
}
