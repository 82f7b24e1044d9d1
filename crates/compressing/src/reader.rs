//! Chunk reader.
//!
//! The whole chunk index is loaded at open. Fetching a document seeks a
//! private clone of the data input to its chunk, checks the chunk header
//! against the index entry, verifies the CRC and decompresses the chunk.

use std::fmt;
use std::path::Path;

use strata_core::{Error, Result};
use strata_storage::io::IndexInput;
use strata_storage::{get_codec, StorageCodec};
use tracing::{debug, warn};

use crate::header::DataHeader;
use crate::index::{BlockIndex, ChunkIndexEntry};
use crate::record::{FieldMask, StoredDocument};

/// Decompressed chunk and the per-doc lengths it was written with.
struct Chunk {
    lengths: Vec<u32>,
    bytes: Vec<u8>,
}

/// Read side of a chunked compressing store.
///
/// All reads take `&self`; the reader can be shared across threads.
pub struct CompressingStoreReader {
    data: IndexInput,
    header: DataHeader,
    codec: Box<dyn StorageCodec>,
    index: BlockIndex,
}

impl CompressingStoreReader {
    /// Open a store from its data and index inputs.
    pub fn open(data: IndexInput, index: IndexInput) -> Result<Self> {
        let mut cursor = data.clone();
        let header = DataHeader::read(&mut cursor)?;
        let codec = get_codec(&header.codec_id)?;
        let index = BlockIndex::read(&index, header.block_size, cursor.position())?;

        let data_length = index.trailer().data_length;
        if data.len() != data_length {
            return Err(Error::corruption(format!(
                "{}: data file has {} bytes, index expects {}",
                data.name(),
                data.len(),
                data_length
            )));
        }

        debug!(
            target: "strata::store",
            format_name = %header.format_name,
            codec = %header.codec_id,
            num_docs = index.trailer().doc_count,
            num_chunks = index.trailer().chunk_count,
            "opened chunk store"
        );
        Ok(CompressingStoreReader {
            data,
            header,
            codec,
            index,
        })
    }

    /// Memory-map and open the two store files.
    pub fn open_files(data_path: &Path, index_path: &Path) -> Result<Self> {
        Self::open(IndexInput::open(data_path)?, IndexInput::open(index_path)?)
    }

    /// Docs in the store.
    pub fn num_docs(&self) -> u32 {
        self.index.trailer().doc_count
    }

    /// Chunks in the store.
    pub fn num_chunks(&self) -> u32 {
        self.index.trailer().chunk_count
    }

    /// Chunks that were flushed by `finish` before reaching a threshold.
    pub fn num_dirty_chunks(&self) -> u32 {
        self.index.trailer().dirty_chunks
    }

    /// Docs in dirty chunks.
    pub fn num_dirty_docs(&self) -> u32 {
        self.index.trailer().dirty_docs
    }

    /// Format name recorded by the writer.
    pub fn format_name(&self) -> &str {
        &self.header.format_name
    }

    /// Codec id recorded by the writer.
    pub fn codec_id(&self) -> &str {
        &self.header.codec_id
    }

    /// Full data header.
    pub fn header(&self) -> &DataHeader {
        &self.header
    }

    /// Chunk index entries in doc order.
    pub fn chunk_entries(&self) -> impl Iterator<Item = &ChunkIndexEntry> + '_ {
        self.index.entries()
    }

    /// Raw record of `doc_id`.
    pub fn document(&self, doc_id: u32) -> Result<Vec<u8>> {
        let entry = self.entry(doc_id)?;
        let chunk = self.load_chunk(entry)?;

        let in_chunk = (doc_id - entry.start_doc) as usize;
        let start: usize = chunk.lengths[..in_chunk].iter().map(|&l| l as usize).sum();
        let end = start + chunk.lengths[in_chunk] as usize;
        Ok(chunk.bytes[start..end].to_vec())
    }

    /// Decode the record of `doc_id` as a [`StoredDocument`].
    pub fn stored_document(&self, doc_id: u32) -> Result<StoredDocument> {
        StoredDocument::decode(&self.document(doc_id)?)
    }

    /// Decode only the fields of `doc_id` named by `mask`.
    pub fn document_fields(&self, doc_id: u32, mask: &FieldMask) -> Result<StoredDocument> {
        StoredDocument::decode_masked(&self.document(doc_id)?, mask)
    }

    /// Read, verify and decompress every chunk.
    pub fn check_integrity(&self) -> Result<()> {
        let mut chunks = 0u32;
        for entry in self.index.entries() {
            self.load_chunk(entry)?;
            chunks += 1;
        }
        debug!(target: "strata::store", chunks, "chunk store integrity verified");
        Ok(())
    }

    fn entry(&self, doc_id: u32) -> Result<&ChunkIndexEntry> {
        let max_doc = self.num_docs();
        if doc_id >= max_doc {
            return Err(Error::DocOutOfRange {
                doc_id: u64::from(doc_id),
                max_doc: u64::from(max_doc),
            });
        }
        self.index
            .lookup(doc_id)
            .ok_or_else(|| Error::corruption(format!("no chunk holds doc {}", doc_id)))
    }

    fn load_chunk(&self, entry: &ChunkIndexEntry) -> Result<Chunk> {
        self.read_chunk(entry).map_err(|e| {
            if e.is_corruption() {
                warn!(
                    target: "strata::store",
                    chunk_offset = entry.chunk_offset,
                    start_doc = entry.start_doc,
                    error = %e,
                    "corrupt chunk"
                );
            }
            e
        })
    }

    fn read_chunk(&self, entry: &ChunkIndexEntry) -> Result<Chunk> {
        let mut input = self.data.clone();
        input.seek(entry.chunk_offset)?;

        let start_doc = input.read_vint()?;
        let doc_count = input.read_vint()?;
        if start_doc != entry.start_doc || doc_count != entry.doc_count {
            return Err(Error::corruption(format!(
                "chunk at {} holds docs [{}, +{}), index says [{}, +{})",
                entry.chunk_offset, start_doc, doc_count, entry.start_doc, entry.doc_count
            )));
        }

        let mut lengths = Vec::with_capacity((doc_count as usize).min(input.remaining() as usize));
        let mut total: u64 = 0;
        for _ in 0..doc_count {
            let len = input.read_vint()?;
            total += u64::from(len);
            lengths.push(len);
        }
        let total = usize::try_from(total)
            .map_err(|_| Error::corruption(format!("chunk of {} bytes", total)))?;

        let compressed_len = input.read_vint()? as usize;
        let header_end = input.position();
        let expected_crc = input.read_u32()?;
        let compressed = input.read_slice(compressed_len)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.data.as_bytes()[entry.chunk_offset as usize..header_end as usize]);
        hasher.update(compressed);
        let actual_crc = hasher.finalize();
        if actual_crc != expected_crc {
            return Err(Error::corruption(format!(
                "chunk at {}: checksum mismatch (stored {:#010x}, computed {:#010x})",
                entry.chunk_offset, expected_crc, actual_crc
            )));
        }

        let bytes = self.codec.decode(compressed, total).map_err(|e| {
            Error::corruption(format!("chunk at {}: {}", entry.chunk_offset, e))
        })?;
        if bytes.len() != total {
            return Err(Error::corruption(format!(
                "chunk at {}: decompressed {} bytes, lengths sum to {}",
                entry.chunk_offset,
                bytes.len(),
                total
            )));
        }
        Ok(Chunk { lengths, bytes })
    }
}

impl fmt::Debug for CompressingStoreReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressingStoreReader")
            .field("data", &self.data.name())
            .field("header", &self.header)
            .field("num_docs", &self.num_docs())
            .field("num_chunks", &self.num_chunks())
            .finish()
    }
}
