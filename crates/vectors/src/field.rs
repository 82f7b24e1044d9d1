//! Per-field vector metadata and the field writer.

use std::fmt;

use strata_core::{DocId, Error, Result};
use strata_storage::io::{IndexInput, IndexOutput};
use tracing::debug;

use crate::ord_to_doc::OrdToDocConfiguration;
use crate::values::OffHeapByteVectorValues;

/// Element type of stored vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorEncoding {
    /// One signed byte per dimension.
    Byte,
    /// One little-endian f32 per dimension.
    Float32,
}

impl VectorEncoding {
    /// Bytes used by one dimension.
    pub fn byte_size(self) -> u32 {
        match self {
            VectorEncoding::Byte => 1,
            VectorEncoding::Float32 => 4,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            VectorEncoding::Byte => 0,
            VectorEncoding::Float32 => 1,
        }
    }

    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(VectorEncoding::Byte),
            1 => Ok(VectorEncoding::Float32),
            other => Err(Error::corruption(format!("unknown vector encoding {}", other))),
        }
    }
}

impl fmt::Display for VectorEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorEncoding::Byte => write!(f, "BYTE"),
            VectorEncoding::Float32 => write!(f, "FLOAT32"),
        }
    }
}

/// Everything a reader needs to open one vector field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    /// Element type.
    pub encoding: VectorEncoding,
    /// Dimensions per vector.
    pub dimension: u32,
    /// Start of the raw vectors in the data file.
    pub vector_data_offset: u64,
    /// Length of the raw vectors.
    pub vector_data_length: u64,
    /// Ordinal to document mapping.
    pub configuration: OrdToDocConfiguration,
}

impl FieldEntry {
    /// Number of vectors.
    pub fn size(&self) -> u32 {
        self.configuration.size()
    }

    /// Read an entry written by [`write_byte_vector_field`].
    pub fn read(meta: &mut IndexInput) -> Result<Self> {
        let encoding = VectorEncoding::from_u8(meta.read_u8()?)?;
        let dimension = meta.read_u32()?;
        let vector_data_offset = meta.read_u64()?;
        let vector_data_length = meta.read_u64()?;
        let configuration = OrdToDocConfiguration::from_stored_meta(meta)?;
        let expected =
            u64::from(configuration.size()) * u64::from(dimension) * u64::from(encoding.byte_size());
        if expected != vector_data_length {
            return Err(Error::corruption(format!(
                "vector data length {} does not match {} vectors of dimension {}",
                vector_data_length,
                configuration.size(),
                dimension
            )));
        }
        Ok(FieldEntry {
            encoding,
            dimension,
            vector_data_offset,
            vector_data_length,
            configuration,
        })
    }

    /// Open the values of this field over `data`.
    pub fn open_values(&self, data: &IndexInput) -> Result<OffHeapByteVectorValues> {
        OffHeapByteVectorValues::load(
            &self.configuration,
            self.encoding,
            self.dimension,
            self.vector_data_offset,
            self.vector_data_length,
            data,
        )
    }
}

/// Persist one byte-vector field.
///
/// `vectors` yields `(doc, vector)` in strictly increasing doc order, every
/// vector holding exactly `dimension` bytes. Raw vectors are appended to
/// `data` in ordinal order, followed by the doc set and address sequence for
/// sparse fields. The [`FieldEntry`] goes to `meta`.
pub fn write_byte_vector_field<'v, I>(
    dimension: u32,
    max_doc: u32,
    vectors: I,
    meta: &mut dyn IndexOutput,
    data: &mut dyn IndexOutput,
) -> Result<()>
where
    I: IntoIterator<Item = (DocId, &'v [u8])>,
{
    if dimension == 0 {
        return Err(Error::invalid_config("vector dimension must be > 0"));
    }
    let vector_data_offset = data.file_pointer();
    let mut docs = Vec::new();
    for (doc, vector) in vectors {
        if vector.len() != dimension as usize {
            return Err(Error::invalid_argument(format!(
                "doc {} has a vector of {} bytes, expected {}",
                doc,
                vector.len(),
                dimension
            )));
        }
        data.write_bytes(vector)?;
        docs.push(doc);
    }
    let vector_data_length = data.file_pointer() - vector_data_offset;

    meta.write_u8(VectorEncoding::Byte.to_u8())?;
    meta.write_u32(dimension)?;
    meta.write_u64(vector_data_offset)?;
    meta.write_u64(vector_data_length)?;
    OrdToDocConfiguration::write_stored_meta(meta, data, &docs, max_doc)?;

    debug!(
        target: "strata::vectors",
        dimension,
        max_doc,
        count = docs.len(),
        vector_data_length,
        "wrote byte vector field"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_storage::io::VecOutput;

    #[test]
    fn test_entry_roundtrip() {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        data.write_bytes(b"hdr").unwrap();
        let vectors: Vec<(DocId, Vec<u8>)> = vec![(1, vec![1, 2]), (4, vec![3, 4])];
        write_byte_vector_field(
            2,
            6,
            vectors.iter().map(|(d, v)| (*d, v.as_slice())),
            &mut meta,
            &mut data,
        )
        .unwrap();

        let mut meta_in = IndexInput::from_vec("meta", meta.into_inner());
        let entry = FieldEntry::read(&mut meta_in).unwrap();
        assert_eq!(entry.encoding, VectorEncoding::Byte);
        assert_eq!(entry.dimension, 2);
        assert_eq!(entry.vector_data_offset, 3);
        assert_eq!(entry.vector_data_length, 4);
        assert_eq!(entry.size(), 2);
        assert!(matches!(entry.configuration, OrdToDocConfiguration::Sparse(_)));
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        let vector = [1u8, 2, 3];
        let err = write_byte_vector_field(2, 4, [(0, &vector[..])], &mut meta, &mut data)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_zero_dimension() {
        let mut meta = VecOutput::new();
        let mut data = VecOutput::new();
        let err = write_byte_vector_field(0, 4, std::iter::empty(), &mut meta, &mut data)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_length_mismatch_is_corruption() {
        let mut meta = VecOutput::new();
        meta.write_u8(0).unwrap();
        meta.write_u32(4).unwrap();
        meta.write_u64(0).unwrap();
        meta.write_u64(7).unwrap();
        meta.write_u8(1).unwrap();
        meta.write_u32(2).unwrap();
        let mut meta_in = IndexInput::from_vec("meta", meta.into_inner());
        assert!(FieldEntry::read(&mut meta_in).unwrap_err().is_corruption());
    }

    #[test]
    fn test_encoding_display() {
        assert_eq!(VectorEncoding::Byte.to_string(), "BYTE");
        assert_eq!(VectorEncoding::Float32.byte_size(), 4);
        assert!(VectorEncoding::from_u8(9).is_err());
    }
}
