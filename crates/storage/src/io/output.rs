//! Append-only byte sinks.
//!
//! Writers in this workspace only ever append. The position of the next byte
//! (`file_pointer`) is what gets recorded in indexes and metadata.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use strata_core::Result;
use tracing::debug;

/// Sequential, append-only byte sink.
pub trait IndexOutput {
    /// Append `bytes`.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes written so far.
    fn file_pointer(&self) -> u64;

    /// Push buffered bytes to the underlying storage.
    fn flush(&mut self) -> Result<()>;

    /// Append one byte.
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Append a little-endian `u16`.
    fn write_u16(&mut self, value: u16) -> Result<()> {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Append a little-endian `u32`.
    fn write_u32(&mut self, value: u32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Append a little-endian `i32`.
    fn write_i32(&mut self, value: i32) -> Result<()> {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Append a little-endian `u64`.
    fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Append a little-endian `i64`.
    fn write_i64(&mut self, value: i64) -> Result<()> {
        let mut buf = [0u8; 8];
        LittleEndian::write_i64(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Append a LEB128 varint.
    fn write_vint(&mut self, value: u32) -> Result<()> {
        self.write_vlong(value as u64)
    }

    /// Append a 64-bit LEB128 varint.
    fn write_vlong(&mut self, value: u64) -> Result<()> {
        let mut buf = Vec::with_capacity(10);
        encode_varint(value, &mut buf);
        self.write_bytes(&buf)
    }
}

impl<O: IndexOutput + ?Sized> IndexOutput for &mut O {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn file_pointer(&self) -> u64 {
        (**self).file_pointer()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Encode a value as a variable-length integer (LEB128).
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Growable in-memory sink.
#[derive(Debug, Default, Clone)]
pub struct VecOutput {
    buf: Vec<u8>,
}

impl VecOutput {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the sink, returning its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl IndexOutput for VecOutput {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn file_pointer(&self) -> u64 {
        self.buf.len() as u64
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Buffered file sink.
///
/// The file is created fresh; existing content is refused so that a finished
/// segment file is never rewritten in place.
pub struct FileOutput {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl FileOutput {
    /// Create a new file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        debug!(target: "strata::io", path = %path.display(), "Created segment output");
        Ok(FileOutput {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and fsync, consuming the sink.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!(target: "strata::io", path = %self.path.display(), bytes = self.written, "Finished segment output");
        Ok(())
    }
}

impl IndexOutput for FileOutput {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn file_pointer(&self) -> u64 {
        self.written
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
