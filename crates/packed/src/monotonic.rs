//! Block-compressed monotonic sequences.
//!
//! A non-decreasing sequence is cut into blocks of `1 << block_shift` values.
//! Each block is approximated by a line `min + avg_inc * i`; only the
//! residuals to that line are bit-packed, shifted so they are non-negative.
//!
//! ## Meta (per block, 21 bytes)
//!
//! ```text
//! min          i64 LE
//! avg_inc      u32 LE   (f32 bits)
//! offset       u64 LE   (residuals, relative to the data start)
//! bpv          u8       (0 = every residual is zero, nothing stored)
//! ```
//!
//! The reader is a pure decoder: `get(i) = min + (avg_inc * i) as i64 + residual(i)`.

use std::sync::Arc;

use strata_core::{Error, Result};
use strata_storage::io::{IndexInput, IndexOutput, RandomAccessInput};

use crate::direct::{bits_required, bytes_required, is_supported, DirectReader, DirectWriter};

/// Smallest accepted block shift.
pub const MIN_BLOCK_SHIFT: u8 = 2;

/// Largest accepted block shift.
pub const MAX_BLOCK_SHIFT: u8 = 22;

/// Writes a monotonic sequence, metadata and residuals to separate sinks.
pub struct DirectMonotonicWriter<'a> {
    meta: &'a mut dyn IndexOutput,
    data: &'a mut dyn IndexOutput,
    base_data_pointer: u64,
    num_values: u64,
    block_shift: u8,
    buffer: Vec<i64>,
    count: u64,
    previous: Option<i64>,
}

impl<'a> DirectMonotonicWriter<'a> {
    /// Start writing `num_values` values.
    ///
    /// Residual offsets in the metadata are relative to the data sink's
    /// position at this call.
    pub fn new(
        meta: &'a mut dyn IndexOutput,
        data: &'a mut dyn IndexOutput,
        num_values: u64,
        block_shift: u8,
    ) -> Result<Self> {
        if !(MIN_BLOCK_SHIFT..=MAX_BLOCK_SHIFT).contains(&block_shift) {
            return Err(Error::invalid_config(format!(
                "block_shift must be in {}..={}, got {}",
                MIN_BLOCK_SHIFT, MAX_BLOCK_SHIFT, block_shift
            )));
        }
        let base_data_pointer = data.file_pointer();
        let block_len = 1usize << block_shift;
        Ok(DirectMonotonicWriter {
            meta,
            data,
            base_data_pointer,
            num_values,
            block_shift,
            buffer: Vec::with_capacity(block_len.min(num_values as usize)),
            count: 0,
            previous: None,
        })
    }

    /// Append the next value; values must not decrease.
    pub fn add(&mut self, value: i64) -> Result<()> {
        if let Some(previous) = self.previous {
            if value < previous {
                return Err(Error::invalid_argument(format!(
                    "values do not come in order: {} after {}",
                    value, previous
                )));
            }
        }
        if self.count >= self.num_values {
            return Err(Error::invalid_argument(format!(
                "more than {} values added",
                self.num_values
            )));
        }
        self.buffer.push(value);
        self.previous = Some(value);
        self.count += 1;
        if self.buffer.len() == 1usize << self.block_shift {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Write the last partial block.
    pub fn finish(mut self) -> Result<()> {
        if self.count != self.num_values {
            return Err(Error::invalid_argument(format!(
                "expected {} values, got {}",
                self.num_values, self.count
            )));
        }
        if !self.buffer.is_empty() {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        let len = self.buffer.len();
        let first = self.buffer[0];
        let last = self.buffer[len - 1];
        let avg_inc = (last.wrapping_sub(first) as f64 / (len.max(2) - 1) as f64) as f32;

        for (i, value) in self.buffer.iter_mut().enumerate() {
            *value = value.wrapping_sub(expected(avg_inc, i as u64));
        }
        let min = self.buffer.iter().copied().min().unwrap_or(0);
        let mut max_delta = 0u64;
        for value in self.buffer.iter_mut() {
            *value = value.wrapping_sub(min);
            max_delta |= *value as u64;
        }

        self.meta.write_i64(min)?;
        self.meta.write_u32(avg_inc.to_bits())?;
        self.meta
            .write_u64(self.data.file_pointer() - self.base_data_pointer)?;
        if max_delta == 0 {
            self.meta.write_u8(0)?;
        } else {
            let bpv = bits_required(max_delta);
            self.meta.write_u8(bpv)?;
            let mut writer = DirectWriter::new(&mut *self.data, len as u64, bpv)?;
            for &delta in &self.buffer {
                writer.add(delta as u64)?;
            }
            writer.finish()?;
        }
        self.buffer.clear();
        Ok(())
    }
}

#[inline]
fn expected(avg_inc: f32, index: u64) -> i64 {
    (avg_inc * index as f32) as i64
}

/// Per-block parameters of a monotonic sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMonotonicMeta {
    num_values: u64,
    block_shift: u8,
    mins: Vec<i64>,
    avgs: Vec<f32>,
    offsets: Vec<u64>,
    bits_per_values: Vec<u8>,
}

impl DirectMonotonicMeta {
    /// Read the metadata of a sequence of `num_values` values.
    pub fn load(meta: &mut IndexInput, num_values: u64, block_shift: u8) -> Result<Self> {
        if !(MIN_BLOCK_SHIFT..=MAX_BLOCK_SHIFT).contains(&block_shift) {
            return Err(Error::corruption(format!(
                "invalid monotonic block shift {}",
                block_shift
            )));
        }
        let num_blocks = num_values.div_ceil(1u64 << block_shift) as usize;
        let mut loaded = DirectMonotonicMeta {
            num_values,
            block_shift,
            mins: Vec::with_capacity(num_blocks),
            avgs: Vec::with_capacity(num_blocks),
            offsets: Vec::with_capacity(num_blocks),
            bits_per_values: Vec::with_capacity(num_blocks),
        };
        for _ in 0..num_blocks {
            loaded.mins.push(meta.read_i64()?);
            loaded.avgs.push(f32::from_bits(meta.read_u32()?));
            loaded.offsets.push(meta.read_u64()?);
            let bpv = meta.read_u8()?;
            if bpv != 0 && !is_supported(bpv) {
                return Err(Error::corruption(format!("invalid bits per value {}", bpv)));
            }
            loaded.bits_per_values.push(bpv);
        }
        Ok(loaded)
    }

    /// Number of values in the sequence.
    pub fn num_values(&self) -> u64 {
        self.num_values
    }

    /// Number of blocks.
    pub fn num_blocks(&self) -> usize {
        self.mins.len()
    }

    /// log2 of the block length.
    pub fn block_shift(&self) -> u8 {
        self.block_shift
    }

    fn values_in_block(&self, block: usize) -> u64 {
        let block_len = 1u64 << self.block_shift;
        let before = block as u64 * block_len;
        (self.num_values - before).min(block_len)
    }
}

/// Random access into a monotonic sequence.
///
/// Cloning is cheap: the metadata is shared and the data handle is a window
/// over shared bytes.
#[derive(Debug, Clone)]
pub struct DirectMonotonicReader {
    meta: Arc<DirectMonotonicMeta>,
    readers: Arc<[Option<DirectReader>]>,
}

impl DirectMonotonicReader {
    /// Bind metadata to the residual data.
    ///
    /// Every block's residuals are bounds-checked here so that `get` cannot
    /// fail later.
    pub fn new(meta: Arc<DirectMonotonicMeta>, data: RandomAccessInput) -> Result<Self> {
        let mut readers = Vec::with_capacity(meta.num_blocks());
        for block in 0..meta.num_blocks() {
            let bpv = meta.bits_per_values[block];
            if bpv == 0 {
                readers.push(None);
                continue;
            }
            let values = meta.values_in_block(block);
            let offset = meta.offsets[block];
            if offset.saturating_add(bytes_required(values, bpv)) > data.len() {
                return Err(Error::corruption(format!(
                    "monotonic block {} exceeds data length {}",
                    block,
                    data.len()
                )));
            }
            readers.push(Some(DirectReader::new(data.clone(), bpv, offset, values)?));
        }
        Ok(DirectMonotonicReader {
            meta,
            readers: readers.into(),
        })
    }

    /// Number of values in the sequence.
    pub fn len(&self) -> u64 {
        self.meta.num_values
    }

    /// True when the sequence holds no values.
    pub fn is_empty(&self) -> bool {
        self.meta.num_values == 0
    }

    /// Value at `index`. `index` must be `< len()`.
    #[inline]
    pub fn get(&self, index: u64) -> i64 {
        debug_assert!(
            index < self.meta.num_values,
            "index {} out of {}",
            index,
            self.meta.num_values
        );
        let block = (index >> self.meta.block_shift) as usize;
        let block_index = index & ((1u64 << self.meta.block_shift) - 1);
        let delta = match &self.readers[block] {
            Some(reader) => reader.get(block_index),
            None => 0,
        };
        self.meta.mins[block]
            .wrapping_add(expected(self.meta.avgs[block], block_index))
            .wrapping_add(delta as i64)
    }
}
