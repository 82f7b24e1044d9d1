//! Chunk writer.
//!
//! Records are buffered until the buffered bytes reach `chunk_size` or the
//! buffered docs reach `max_docs_per_chunk`, whichever comes first. The buffer
//! is then compressed as one unit and appended to the data file:
//!
//! ```text
//! start_doc vint | doc_count vint | length vint * doc_count
//! | compressed_len vint | crc32 u32 | compressed bytes
//! ```
//!
//! The crc32 covers every header field before it and the compressed bytes.
//!
//! A record of `chunk_size` bytes or more is never mixed with other docs:
//! anything buffered before it is flushed first, and it then fills a chunk
//! on its own.

use std::path::Path;

use strata_core::{Error, Result, MAX_DOCS};
use strata_storage::io::{encode_varint, FileOutput, IndexOutput};
use strata_storage::StorageCodec;
use tracing::{debug, trace};

use crate::format::CompressingStoreFormat;
use crate::header::DataHeader;
use crate::index::{BlockIndexWriter, ChunkIndexEntry, IndexTrailer};
use crate::record::StoredDocument;

/// Totals of a finished store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Docs written.
    pub num_docs: u32,
    /// Chunks written.
    pub num_chunks: u32,
    /// Index blocks written.
    pub num_blocks: u32,
    /// Chunks flushed by `finish` rather than by a threshold.
    pub dirty_chunks: u32,
    /// Docs in dirty chunks.
    pub dirty_docs: u32,
    /// Bytes in the data file.
    pub data_length: u64,
}

/// Outputs handed back by [`CompressingStoreWriter::finish`].
#[derive(Debug)]
pub struct FinishedStore<D, X> {
    /// Data sink.
    pub data: D,
    /// Index sink.
    pub index: X,
    /// Totals.
    pub stats: StoreStats,
}

/// Appends documents to a data sink and their chunk index to an index sink.
pub struct CompressingStoreWriter<D: IndexOutput, X: IndexOutput> {
    data: D,
    index: X,
    format: CompressingStoreFormat,
    codec: Box<dyn StorageCodec>,
    block_index: BlockIndexWriter,

    buffer: Vec<u8>,
    lengths: Vec<u32>,
    doc_base: u32,
    num_docs: u32,

    dirty_chunks: u32,
    dirty_docs: u32,
}

impl CompressingStoreWriter<FileOutput, FileOutput> {
    /// Create the two store files. Neither may exist yet.
    pub fn create(format: CompressingStoreFormat, data_path: &Path, index_path: &Path) -> Result<Self> {
        let data = FileOutput::create(data_path)?;
        let index = FileOutput::create(index_path)?;
        Self::new(format, data, index)
    }
}

impl<D: IndexOutput, X: IndexOutput> CompressingStoreWriter<D, X> {
    /// Validate `format`, write both file headers and start an empty store.
    pub fn new(format: CompressingStoreFormat, mut data: D, mut index: X) -> Result<Self> {
        format.validate()?;
        let codec = format.mode.codec()?;
        DataHeader::from_format(&format).write(&mut data)?;
        let block_index = BlockIndexWriter::new(format.block_size, &mut index)?;
        debug!(target: "strata::store", format = %format, "opened chunk writer");
        Ok(CompressingStoreWriter {
            data,
            index,
            codec,
            block_index,
            buffer: Vec::with_capacity(format.chunk_size.min(1 << 20) as usize),
            lengths: Vec::new(),
            doc_base: 0,
            num_docs: 0,
            dirty_chunks: 0,
            dirty_docs: 0,
            format,
        })
    }

    /// Format this writer was created with.
    pub fn format(&self) -> &CompressingStoreFormat {
        &self.format
    }

    /// Docs added so far.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Append the record of `doc_id`, which must equal [`num_docs`](Self::num_docs).
    pub fn add_document(&mut self, doc_id: u32, record: &[u8]) -> Result<()> {
        if doc_id != self.num_docs {
            return Err(Error::invalid_argument(format!(
                "documents must be added in order: expected doc {}, got {}",
                self.num_docs, doc_id
            )));
        }
        if self.num_docs >= MAX_DOCS {
            return Err(Error::invalid_argument(format!(
                "store is full ({} docs)",
                MAX_DOCS
            )));
        }
        let len = u32::try_from(record.len())
            .map_err(|_| Error::invalid_argument("record larger than 4 GiB"))?;

        let oversized = len >= self.format.chunk_size;
        if oversized && !self.lengths.is_empty() {
            self.flush()?;
        }
        self.buffer.extend_from_slice(record);
        self.lengths.push(len);
        self.num_docs += 1;

        if self.trigger_flush() {
            self.flush()?;
        }
        Ok(())
    }

    /// Encode and append a [`StoredDocument`].
    pub fn add_stored_document(&mut self, doc_id: u32, document: &StoredDocument) -> Result<()> {
        self.add_document(doc_id, &document.encode())
    }

    fn trigger_flush(&self) -> bool {
        self.buffer.len() as u64 >= u64::from(self.format.chunk_size)
            || self.lengths.len() as u64 >= u64::from(self.format.max_docs_per_chunk)
    }

    fn flush(&mut self) -> Result<()> {
        let doc_count = self.lengths.len() as u32;
        debug_assert!(doc_count > 0);
        let compressed = self.codec.encode(&self.buffer)?;
        let compressed_len = u32::try_from(compressed.len())
            .map_err(|_| Error::Codec("compressed chunk larger than 4 GiB".to_string()))?;
        let chunk_offset = self.data.file_pointer();

        let mut header = Vec::with_capacity(10 + 5 * self.lengths.len());
        encode_varint(u64::from(self.doc_base), &mut header);
        encode_varint(u64::from(doc_count), &mut header);
        for &len in &self.lengths {
            encode_varint(u64::from(len), &mut header);
        }
        encode_varint(u64::from(compressed_len), &mut header);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(&compressed);

        self.data.write_bytes(&header)?;
        self.data.write_u32(hasher.finalize())?;
        self.data.write_bytes(&compressed)?;

        self.block_index.add(
            ChunkIndexEntry {
                start_doc: self.doc_base,
                chunk_offset,
                doc_count,
            },
            &mut self.index,
        )?;
        trace!(
            target: "strata::store",
            start_doc = self.doc_base,
            doc_count,
            raw_len = self.buffer.len(),
            compressed_len,
            chunk_offset,
            "flushed chunk"
        );

        self.doc_base += doc_count;
        self.buffer.clear();
        self.lengths.clear();
        Ok(())
    }

    /// Flush the pending docs, write the index tail and hand back the sinks.
    ///
    /// The sinks are flushed but not synced; call [`FileOutput::finish`] on
    /// file-backed sinks to make the store durable.
    pub fn finish(mut self) -> Result<FinishedStore<D, X>> {
        if !self.lengths.is_empty() {
            self.dirty_chunks += 1;
            self.dirty_docs += self.lengths.len() as u32;
            self.flush()?;
        }
        debug_assert_eq!(self.doc_base, self.num_docs);
        let data_length = self.data.file_pointer();
        let trailer = self.block_index.finish(
            &mut self.index,
            IndexTrailer {
                doc_count: self.num_docs,
                dirty_chunks: self.dirty_chunks,
                dirty_docs: self.dirty_docs,
                data_length,
                ..IndexTrailer::default()
            },
        )?;
        self.data.flush()?;
        self.index.flush()?;

        let stats = StoreStats {
            num_docs: trailer.doc_count,
            num_chunks: trailer.chunk_count,
            num_blocks: trailer.block_count,
            dirty_chunks: trailer.dirty_chunks,
            dirty_docs: trailer.dirty_docs,
            data_length,
        };
        debug!(
            target: "strata::store",
            num_docs = stats.num_docs,
            num_chunks = stats.num_chunks,
            dirty_chunks = stats.dirty_chunks,
            data_length,
            "finished chunk store"
        );
        Ok(FinishedStore {
            data: self.data,
            index: self.index,
            stats,
        })
    }
}
