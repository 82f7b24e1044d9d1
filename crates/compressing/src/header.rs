//! Data file header.
//!
//! ```text
//! magic        "SCDT"
//! version      u32 LE
//! header_len   u32 LE
//! header       MessagePack DataHeader
//! ```

use serde::{Deserialize, Serialize};
use strata_core::{Error, Result};
use strata_storage::io::{IndexInput, IndexOutput};

use crate::format::CompressingStoreFormat;

/// Magic bytes opening the data file.
pub const DATA_MAGIC: &[u8; 4] = b"SCDT";
/// Magic bytes opening the index file.
pub const INDEX_MAGIC: &[u8; 4] = b"SCIX";
/// Current on-disk version of both files.
pub const FORMAT_VERSION: u32 = 1;

/// Parameters a reader needs to decode the chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataHeader {
    /// Name of the writing format.
    pub format_name: String,
    /// Codec every chunk was compressed with.
    pub codec_id: String,
    /// Chunk flush threshold in bytes.
    pub chunk_size: u32,
    /// Chunk flush threshold in docs.
    pub max_docs_per_chunk: u32,
    /// Index entries per index block.
    pub block_size: u32,
}

impl DataHeader {
    /// Header describing `format`.
    pub fn from_format(format: &CompressingStoreFormat) -> Self {
        DataHeader {
            format_name: format.format_name.clone(),
            codec_id: format.mode.codec_id().to_string(),
            chunk_size: format.chunk_size,
            max_docs_per_chunk: format.max_docs_per_chunk,
            block_size: format.block_size,
        }
    }

    /// Serialize with magic, version and length prefix.
    pub fn write(&self, out: &mut dyn IndexOutput) -> Result<()> {
        let payload =
            rmp_serde::to_vec(self).map_err(|e| Error::Serialization(format!("data header: {}", e)))?;
        out.write_bytes(DATA_MAGIC)?;
        out.write_u32(FORMAT_VERSION)?;
        out.write_u32(payload.len() as u32)?;
        out.write_bytes(&payload)
    }

    /// Parse and sanity-check a header.
    pub fn read(input: &mut IndexInput) -> Result<Self> {
        check_magic(input, DATA_MAGIC)?;
        let header_len = input.read_u32()? as usize;
        let payload = input.read_slice(header_len)?;
        let header: DataHeader = rmp_serde::from_slice(payload)
            .map_err(|e| Error::Serialization(format!("data header: {}", e)))?;
        if header.chunk_size == 0 || header.max_docs_per_chunk == 0 || header.block_size == 0 {
            return Err(Error::corruption(format!(
                "invalid data header parameters: {:?}",
                header
            )));
        }
        Ok(header)
    }
}

/// Read and verify `magic` followed by the format version.
pub(crate) fn check_magic(input: &mut IndexInput, magic: &[u8; 4]) -> Result<()> {
    let mut found = [0u8; 4];
    input.read_bytes(&mut found)?;
    if &found != magic {
        return Err(Error::corruption(format!(
            "{}: bad magic {:?}, expected {:?}",
            input.name(),
            found,
            magic
        )));
    }
    let version = input.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(Error::corruption(format!(
            "{}: unsupported version {}",
            input.name(),
            version
        )));
    }
    Ok(())
}
