//! Chunk index: where each chunk starts, in doc and byte space.
//!
//! ```text
//! magic "SCIX" | version u32
//! block*:  entry_count u32 | entry * entry_count
//! entry:   start_doc u32 | chunk_offset u64 | doc_count u32      (16 bytes)
//! trailer: block_count u32 | chunk_count u32 | doc_count u32
//!          | dirty_chunks u32 | dirty_docs u32 | data_length u64
//!          | index_crc32 u32 | reserved u32 | magic "SCTR"        (40 bytes)
//! ```
//!
//! Blocks hold at most `block_size` entries and are written once, in order.
//! `index_crc32` covers every byte before the trailer.

use byteorder::{ByteOrder, LittleEndian};
use strata_core::{Error, Result};
use strata_storage::io::{IndexInput, IndexOutput};

use crate::header::{check_magic, FORMAT_VERSION, INDEX_MAGIC};

/// Bytes per persisted entry.
pub const ENTRY_BYTES: usize = 16;
/// Bytes of the index trailer.
pub const TRAILER_BYTES: usize = 40;
/// Magic closing the index file.
pub const TRAILER_MAGIC: &[u8; 4] = b"SCTR";

/// Location of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkIndexEntry {
    /// First doc in the chunk.
    pub start_doc: u32,
    /// Byte offset of the chunk in the data file.
    pub chunk_offset: u64,
    /// Docs in the chunk.
    pub doc_count: u32,
}

impl ChunkIndexEntry {
    /// One past the last doc in the chunk.
    pub fn end_doc(&self) -> u32 {
        self.start_doc + self.doc_count
    }

    fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.start_doc);
        LittleEndian::write_u64(&mut buf[4..12], self.chunk_offset);
        LittleEndian::write_u32(&mut buf[12..16], self.doc_count);
    }

    fn decode(buf: &[u8]) -> Self {
        ChunkIndexEntry {
            start_doc: LittleEndian::read_u32(&buf[0..4]),
            chunk_offset: LittleEndian::read_u64(&buf[4..12]),
            doc_count: LittleEndian::read_u32(&buf[12..16]),
        }
    }
}

/// Totals recorded at the end of the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexTrailer {
    /// Persisted index blocks.
    pub block_count: u32,
    /// Chunks in the data file.
    pub chunk_count: u32,
    /// Docs in the store.
    pub doc_count: u32,
    /// Chunks flushed before reaching a threshold.
    pub dirty_chunks: u32,
    /// Docs in dirty chunks.
    pub dirty_docs: u32,
    /// Length of the data file.
    pub data_length: u64,
    /// CRC32 of the index bytes preceding the trailer.
    pub index_crc32: u32,
}

impl IndexTrailer {
    fn encode(&self) -> [u8; TRAILER_BYTES] {
        let mut buf = [0u8; TRAILER_BYTES];
        LittleEndian::write_u32(&mut buf[0..4], self.block_count);
        LittleEndian::write_u32(&mut buf[4..8], self.chunk_count);
        LittleEndian::write_u32(&mut buf[8..12], self.doc_count);
        LittleEndian::write_u32(&mut buf[12..16], self.dirty_chunks);
        LittleEndian::write_u32(&mut buf[16..20], self.dirty_docs);
        LittleEndian::write_u64(&mut buf[20..28], self.data_length);
        LittleEndian::write_u32(&mut buf[28..32], self.index_crc32);
        // 32..36 reserved
        buf[36..40].copy_from_slice(TRAILER_MAGIC);
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != TRAILER_BYTES || &buf[36..40] != TRAILER_MAGIC {
            return Err(Error::corruption("missing index trailer"));
        }
        Ok(IndexTrailer {
            block_count: LittleEndian::read_u32(&buf[0..4]),
            chunk_count: LittleEndian::read_u32(&buf[4..8]),
            doc_count: LittleEndian::read_u32(&buf[8..12]),
            dirty_chunks: LittleEndian::read_u32(&buf[12..16]),
            dirty_docs: LittleEndian::read_u32(&buf[16..20]),
            data_length: LittleEndian::read_u64(&buf[20..28]),
            index_crc32: LittleEndian::read_u32(&buf[28..32]),
        })
    }
}

/// Accumulates entries and persists them block by block.
pub(crate) struct BlockIndexWriter {
    block_size: usize,
    pending: Vec<ChunkIndexEntry>,
    hasher: crc32fast::Hasher,
    block_count: u32,
    chunk_count: u32,
}

impl BlockIndexWriter {
    pub(crate) fn new(block_size: u32, out: &mut dyn IndexOutput) -> Result<Self> {
        let mut writer = BlockIndexWriter {
            block_size: block_size as usize,
            pending: Vec::with_capacity(block_size.min(1024) as usize),
            hasher: crc32fast::Hasher::new(),
            block_count: 0,
            chunk_count: 0,
        };
        let mut header = [0u8; 8];
        header[0..4].copy_from_slice(INDEX_MAGIC);
        LittleEndian::write_u32(&mut header[4..8], FORMAT_VERSION);
        writer.write(out, &header)?;
        Ok(writer)
    }

    pub(crate) fn add(&mut self, entry: ChunkIndexEntry, out: &mut dyn IndexOutput) -> Result<()> {
        self.pending.push(entry);
        self.chunk_count += 1;
        if self.pending.len() == self.block_size {
            self.flush_block(out)?;
        }
        Ok(())
    }

    fn flush_block(&mut self, out: &mut dyn IndexOutput) -> Result<()> {
        let mut block = vec![0u8; 4 + self.pending.len() * ENTRY_BYTES];
        LittleEndian::write_u32(&mut block[0..4], self.pending.len() as u32);
        for (i, entry) in self.pending.iter().enumerate() {
            entry.encode(&mut block[4 + i * ENTRY_BYTES..4 + (i + 1) * ENTRY_BYTES]);
        }
        self.write(out, &block)?;
        self.pending.clear();
        self.block_count += 1;
        Ok(())
    }

    /// Write the last partial block and the trailer.
    pub(crate) fn finish(
        mut self,
        out: &mut dyn IndexOutput,
        mut trailer: IndexTrailer,
    ) -> Result<IndexTrailer> {
        if !self.pending.is_empty() {
            self.flush_block(out)?;
        }
        trailer.block_count = self.block_count;
        trailer.chunk_count = self.chunk_count;
        trailer.index_crc32 = self.hasher.finalize();
        out.write_bytes(&trailer.encode())?;
        Ok(trailer)
    }

    fn write(&mut self, out: &mut dyn IndexOutput, bytes: &[u8]) -> Result<()> {
        self.hasher.update(bytes);
        out.write_bytes(bytes)
    }
}

/// In-memory chunk index, searchable by doc id.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    block_starts: Vec<u32>,
    blocks: Vec<Vec<ChunkIndexEntry>>,
    trailer: IndexTrailer,
}

impl BlockIndex {
    /// Load and validate a whole index file.
    ///
    /// `block_size` bounds entries per block; `min_chunk_offset` is the first
    /// byte after the data header.
    pub fn read(index: &IndexInput, block_size: u32, min_chunk_offset: u64) -> Result<Self> {
        let len = index.len() as usize;
        if len < 8 + TRAILER_BYTES {
            return Err(Error::corruption(format!(
                "{}: index of {} bytes is truncated",
                index.name(),
                len
            )));
        }
        let bytes = index.as_bytes();
        let body_len = len - TRAILER_BYTES;
        let trailer = IndexTrailer::decode(&bytes[body_len..])?;
        let actual_crc = crc32fast::hash(&bytes[..body_len]);
        if actual_crc != trailer.index_crc32 {
            return Err(Error::corruption(format!(
                "{}: index checksum mismatch (stored {:#010x}, computed {:#010x})",
                index.name(),
                trailer.index_crc32,
                actual_crc
            )));
        }

        let mut input = index.slice("index-body", 0, body_len as u64)?;
        check_magic(&mut input, INDEX_MAGIC)?;

        let mut block_starts = Vec::with_capacity(trailer.block_count as usize);
        let mut blocks = Vec::with_capacity(trailer.block_count as usize);
        let mut previous: Option<ChunkIndexEntry> = None;
        let mut entry_buf = [0u8; ENTRY_BYTES];
        for _ in 0..trailer.block_count {
            let entry_count = input.read_u32()?;
            if entry_count == 0 || entry_count > block_size {
                return Err(Error::corruption(format!(
                    "index block holds {} entries, block size is {}",
                    entry_count, block_size
                )));
            }
            let mut entries = Vec::with_capacity(entry_count as usize);
            for _ in 0..entry_count {
                input.read_bytes(&mut entry_buf)?;
                let entry = ChunkIndexEntry::decode(&entry_buf);
                check_successor(previous.as_ref(), &entry, min_chunk_offset, trailer.data_length)?;
                previous = Some(entry);
                entries.push(entry);
            }
            block_starts.push(entries[0].start_doc);
            blocks.push(entries);
        }
        if input.remaining() != 0 {
            return Err(Error::corruption(format!(
                "{} trailing bytes after index blocks",
                input.remaining()
            )));
        }

        let chunk_count: usize = blocks.iter().map(Vec::len).sum();
        let end_doc = previous.map_or(0, |e| e.end_doc());
        if chunk_count != trailer.chunk_count as usize || end_doc != trailer.doc_count {
            return Err(Error::corruption(format!(
                "index covers {} chunks and {} docs, trailer says {} and {}",
                chunk_count, end_doc, trailer.chunk_count, trailer.doc_count
            )));
        }
        if trailer.dirty_chunks > trailer.chunk_count || trailer.dirty_docs > trailer.doc_count {
            return Err(Error::corruption("dirty counts exceed totals"));
        }

        Ok(BlockIndex {
            block_starts,
            blocks,
            trailer,
        })
    }

    /// Trailer totals.
    pub fn trailer(&self) -> &IndexTrailer {
        &self.trailer
    }

    /// Persisted blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Every entry in doc order.
    pub fn entries(&self) -> impl Iterator<Item = &ChunkIndexEntry> + '_ {
        self.blocks.iter().flatten()
    }

    /// Entry of the chunk holding `doc`, if any.
    pub fn lookup(&self, doc: u32) -> Option<&ChunkIndexEntry> {
        let block = self.block_starts.partition_point(|&start| start <= doc).checked_sub(1)?;
        let entries = &self.blocks[block];
        let entry = &entries[entries.partition_point(|e| e.start_doc <= doc) - 1];
        (doc < entry.end_doc()).then_some(entry)
    }
}

fn check_successor(
    previous: Option<&ChunkIndexEntry>,
    entry: &ChunkIndexEntry,
    min_chunk_offset: u64,
    data_length: u64,
) -> Result<()> {
    let (expected_doc, min_offset) = match previous {
        Some(prev) => (prev.end_doc(), prev.chunk_offset + 1),
        None => (0, min_chunk_offset),
    };
    if entry.doc_count == 0
        || entry.start_doc != expected_doc
        || entry.chunk_offset < min_offset
        || entry.chunk_offset >= data_length
        || entry.start_doc.checked_add(entry.doc_count).is_none()
    {
        return Err(Error::corruption(format!(
            "chunk index entry {:?} does not follow {:?}",
            entry, previous
        )));
    }
    Ok(())
}
