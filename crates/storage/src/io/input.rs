//! Random-access byte sources over immutable segment data.
//!
//! A segment file is opened once, either into an owned buffer or a read-only
//! memory map, and shared behind an `Arc`. Every [`IndexInput`] is a cursor
//! over a window of that data; cloning one yields an independent cursor over
//! the same bytes without copying them.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use strata_core::{Error, Result};
use tracing::debug;

/// Underlying storage for an opened segment file.
enum SegmentData {
    /// In-memory owned data
    Owned(Vec<u8>),
    /// Memory-mapped file data
    Mmap(memmap2::Mmap),
}

impl SegmentData {
    fn as_bytes(&self) -> &[u8] {
        match self {
            SegmentData::Owned(v) => v,
            SegmentData::Mmap(m) => m,
        }
    }
}

/// Sequential cursor with seek over a window of segment data.
#[derive(Clone)]
pub struct IndexInput {
    data: Arc<SegmentData>,
    name: Arc<str>,
    start: usize,
    len: usize,
    pos: usize,
}

impl IndexInput {
    /// Wrap an owned buffer.
    pub fn from_vec(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        IndexInput {
            data: Arc::new(SegmentData::Owned(bytes)),
            name: Arc::from(name.into()),
            start: 0,
            len,
            pos: 0,
        }
    }

    /// Memory-map a file read-only.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let data = if file_len == 0 {
            // zero-length maps are rejected on some platforms
            SegmentData::Owned(Vec::new())
        } else {
            // SAFETY: segment files are immutable once written and we map read-only.
            SegmentData::Mmap(unsafe { memmap2::Mmap::map(&file)? })
        };
        let len = data.as_bytes().len();
        debug!(target: "strata::io", path = %path.display(), len, "Opened segment input");
        Ok(IndexInput {
            data: Arc::new(data),
            name: Arc::from(path.display().to_string()),
            start: 0,
            len,
            pos: 0,
        })
    }

    /// Name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of this window in bytes.
    pub fn len(&self) -> u64 {
        self.len as u64
    }

    /// True when the window holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current position relative to the window start.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Bytes left between the position and the window end.
    pub fn remaining(&self) -> u64 {
        (self.len - self.pos) as u64
    }

    /// Move the cursor. Seeking to `len()` is allowed; past it is not.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len as u64 {
            return Err(self.eof(pos, 0));
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.seek(self.pos as u64 + n)
    }

    /// Whole window as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data.as_bytes()[self.start..self.start + self.len]
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_slice(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.len - self.pos {
            return Err(self.eof(self.pos as u64, n));
        }
        let begin = self.start + self.pos;
        self.pos += n;
        Ok(&self.data.as_bytes()[begin..begin + n])
    }

    /// Fill `buf` from the cursor.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = buf.len();
        buf.copy_from_slice(self.read_slice(n)?);
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_slice(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_slice(2)?))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_slice(4)?))
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_slice(4)?))
    }

    /// Read a little-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_slice(8)?))
    }

    /// Read a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_slice(8)?))
    }

    /// Read a LEB128 varint of at most 32 bits.
    pub fn read_vint(&mut self) -> Result<u32> {
        let value = self.read_vlong()?;
        u32::try_from(value)
            .map_err(|_| Error::corruption(format!("{}: vint overflow ({})", self.name, value)))
    }

    /// Read a LEB128 varint of at most 64 bits.
    pub fn read_vlong(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::corruption(format!("{}: vlong overflow", self.name)));
            }
        }
    }

    /// Independent cursor over `[offset, offset + length)` of this window.
    pub fn slice(&self, name: &str, offset: u64, length: u64) -> Result<IndexInput> {
        self.check_range(offset, length)?;
        Ok(IndexInput {
            data: Arc::clone(&self.data),
            name: Arc::from(format!("{} [slice={}]", self.name, name)),
            start: self.start + offset as usize,
            len: length as usize,
            pos: 0,
        })
    }

    /// Positional reader over `[offset, offset + length)` of this window.
    pub fn random_access_slice(&self, offset: u64, length: u64) -> Result<RandomAccessInput> {
        self.check_range(offset, length)?;
        Ok(RandomAccessInput {
            data: Arc::clone(&self.data),
            start: self.start + offset as usize,
            len: length as usize,
        })
    }

    fn check_range(&self, offset: u64, length: u64) -> Result<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.len as u64 => Ok(()),
            _ => Err(Error::corruption(format!(
                "{}: slice [{}, +{}) exceeds length {}",
                self.name, offset, length, self.len
            ))),
        }
    }

    fn eof(&self, pos: u64, wanted: usize) -> Error {
        Error::corruption(format!(
            "{}: read past end (pos={}, wanted={}, len={})",
            self.name, pos, wanted, self.len
        ))
    }
}

impl fmt::Debug for IndexInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexInput")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}

/// Positional reads over a window of segment data.
///
/// Reads are infallible: callers validate the window length against the
/// data they expect when the reader is constructed, and an out-of-window
/// read is a programming error that panics.
#[derive(Clone)]
pub struct RandomAccessInput {
    data: Arc<SegmentData>,
    start: usize,
    len: usize,
}

impl RandomAccessInput {
    /// Length of the window in bytes.
    pub fn len(&self) -> u64 {
        self.len as u64
    }

    /// True when the window holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn bytes(&self, pos: u64, n: usize) -> &[u8] {
        let pos = pos as usize;
        assert!(pos + n <= self.len, "read [{}, +{}) outside {}", pos, n, self.len);
        &self.data.as_bytes()[self.start + pos..self.start + pos + n]
    }

    /// Byte at `pos`.
    #[inline]
    pub fn read_u8(&self, pos: u64) -> u8 {
        self.bytes(pos, 1)[0]
    }

    /// Little-endian `u16` at `pos`.
    #[inline]
    pub fn read_u16(&self, pos: u64) -> u16 {
        LittleEndian::read_u16(self.bytes(pos, 2))
    }

    /// Little-endian `u32` at `pos`.
    #[inline]
    pub fn read_u32(&self, pos: u64) -> u32 {
        LittleEndian::read_u32(self.bytes(pos, 4))
    }

    /// Little-endian `i32` at `pos`.
    #[inline]
    pub fn read_i32(&self, pos: u64) -> i32 {
        LittleEndian::read_i32(self.bytes(pos, 4))
    }

    /// Little-endian `u64` at `pos`.
    #[inline]
    pub fn read_u64(&self, pos: u64) -> u64 {
        LittleEndian::read_u64(self.bytes(pos, 8))
    }
}

impl fmt::Debug for RandomAccessInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomAccessInput")
            .field("start", &self.start)
            .field("len", &self.len)
            .finish()
    }
}
