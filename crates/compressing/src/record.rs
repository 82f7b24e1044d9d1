//! Stored document record format.
//!
//! ```text
//! num_fields vint
//! field*:    name_len vint | name (UTF-8) | value_len vint | value
//! ```

use std::collections::HashSet;

use strata_core::{Error, Result};
use strata_storage::io::encode_varint;

/// One named value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    /// Field name.
    pub name: String,
    /// Raw value bytes.
    pub value: Vec<u8>,
}

/// Ordered list of named values making up one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredDocument {
    fields: Vec<StoredField>,
}

impl StoredDocument {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field (builder pattern).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.add(name, value);
        self
    }

    /// Append a field. Names may repeat.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.push(StoredField {
            name: name.into(),
            value: value.into(),
        });
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_slice())
    }

    /// First value of `name` as UTF-8, if it is valid.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> &[StoredField] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the document has no field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize into the record format.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(self.fields.len() as u64, &mut buf);
        for field in &self.fields {
            encode_varint(field.name.len() as u64, &mut buf);
            buf.extend_from_slice(field.name.as_bytes());
            encode_varint(field.value.len() as u64, &mut buf);
            buf.extend_from_slice(&field.value);
        }
        buf
    }

    /// Parse a whole record.
    pub fn decode(record: &[u8]) -> Result<Self> {
        Self::decode_filtered(record, None)
    }

    /// Parse a record keeping only the fields in `mask`.
    pub fn decode_masked(record: &[u8], mask: &FieldMask) -> Result<Self> {
        Self::decode_filtered(record, Some(mask))
    }

    fn decode_filtered(record: &[u8], mask: Option<&FieldMask>) -> Result<Self> {
        let mut cursor = record;
        let num_fields = read_vint(&mut cursor)?;
        let mut fields = Vec::new();
        for _ in 0..num_fields {
            let name_len = read_vint(&mut cursor)? as usize;
            let name = take(&mut cursor, name_len)?;
            let name = std::str::from_utf8(name)
                .map_err(|_| Error::corruption("stored field name is not UTF-8"))?;
            let value_len = read_vint(&mut cursor)? as usize;
            let value = take(&mut cursor, value_len)?;
            if mask.map_or(true, |m| m.contains(name)) {
                fields.push(StoredField {
                    name: name.to_string(),
                    value: value.to_vec(),
                });
            }
        }
        if !cursor.is_empty() {
            return Err(Error::corruption(format!(
                "{} trailing bytes after stored document",
                cursor.len()
            )));
        }
        Ok(StoredDocument { fields })
    }
}

/// Set of field names to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask {
    names: HashSet<String>,
}

impl FieldMask {
    /// Mask selecting nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name (builder pattern).
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    /// Add a name.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// True when `name` is selected.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of selected names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldMask {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldMask {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn read_vint(cursor: &mut &[u8]) -> Result<u32> {
    let mut value: u32 = 0;
    for shift in (0..35).step_by(7) {
        let (&byte, rest) = cursor
            .split_first()
            .ok_or_else(|| Error::corruption("stored document truncated"))?;
        *cursor = rest;
        if shift == 28 && byte > 0x0F {
            break;
        }
        value |= u32::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(Error::corruption("stored document varint overflows u32"))
}

fn take<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if cursor.len() < n {
        return Err(Error::corruption(format!(
            "stored document truncated: wanted {} bytes, {} left",
            n,
            cursor.len()
        )));
    }
    let (head, rest) = cursor.split_at(n);
    *cursor = rest;
    Ok(head)
}
