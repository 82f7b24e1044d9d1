//! Fixed-width bit packing.
//!
//! ## Layout
//!
//! ```text
//! value i occupies stream bits [i * bpv, (i + 1) * bpv)
//! stream bit k lives in byte k / 8, bit k % 8 (little-endian bit order)
//! trailing zero padding so value i can be fetched with one 8-byte read
//! at byte (i * bpv) / 8
//! ```
//!
//! Only widths whose bit offset plus width never exceeds 64 are supported,
//! which is what makes the single unaligned read sufficient.

use strata_core::{Error, Result};
use strata_storage::io::{IndexOutput, RandomAccessInput};

/// Widths accepted by [`DirectWriter`] and [`DirectReader`].
pub const SUPPORTED_BITS_PER_VALUE: [u8; 14] = [1, 2, 4, 8, 12, 16, 20, 24, 28, 32, 40, 48, 56, 64];

/// Smallest supported width able to hold `max_value`.
pub fn bits_required(max_value: u64) -> u8 {
    let bits = (64 - max_value.leading_zeros()).max(1) as u8;
    SUPPORTED_BITS_PER_VALUE
        .iter()
        .copied()
        .find(|&bpv| bpv >= bits)
        .unwrap_or(64)
}

/// Whether `bits_per_value` is one of [`SUPPORTED_BITS_PER_VALUE`].
pub fn is_supported(bits_per_value: u8) -> bool {
    SUPPORTED_BITS_PER_VALUE.contains(&bits_per_value)
}

/// Bytes occupied by `num_values` packed values, padding included.
pub fn bytes_required(num_values: u64, bits_per_value: u8) -> u64 {
    if num_values == 0 {
        return 0;
    }
    let bpv = bits_per_value as u64;
    let data_bytes = (num_values * bpv).div_ceil(8);
    let last_read_end = (num_values - 1) * bpv / 8 + 8;
    data_bytes.max(last_read_end)
}

/// Writes `num_values` values of a fixed width to a sink.
pub struct DirectWriter<'a> {
    out: &'a mut dyn IndexOutput,
    num_values: u64,
    bits_per_value: u8,
    count: u64,
    acc: u128,
    acc_bits: u32,
    pending: Vec<u8>,
}

impl<'a> DirectWriter<'a> {
    /// Start writing `num_values` values of `bits_per_value` bits.
    pub fn new(out: &'a mut dyn IndexOutput, num_values: u64, bits_per_value: u8) -> Result<Self> {
        if !is_supported(bits_per_value) {
            return Err(Error::invalid_argument(format!(
                "unsupported bits per value: {}",
                bits_per_value
            )));
        }
        Ok(DirectWriter {
            out,
            num_values,
            bits_per_value,
            count: 0,
            acc: 0,
            acc_bits: 0,
            pending: Vec::with_capacity(1024),
        })
    }

    /// Append one value.
    pub fn add(&mut self, value: u64) -> Result<()> {
        if self.count >= self.num_values {
            return Err(Error::invalid_argument(format!(
                "more than {} values added",
                self.num_values
            )));
        }
        if self.bits_per_value < 64 && value >> self.bits_per_value != 0 {
            return Err(Error::invalid_argument(format!(
                "value {} does not fit in {} bits",
                value, self.bits_per_value
            )));
        }
        self.acc |= (value as u128) << self.acc_bits;
        self.acc_bits += self.bits_per_value as u32;
        while self.acc_bits >= 8 {
            self.pending.push(self.acc as u8);
            self.acc >>= 8;
            self.acc_bits -= 8;
        }
        if self.pending.len() >= 1024 {
            self.out.write_bytes(&self.pending)?;
            self.pending.clear();
        }
        self.count += 1;
        Ok(())
    }

    /// Write the remaining bits and the read padding.
    pub fn finish(mut self) -> Result<()> {
        if self.count != self.num_values {
            return Err(Error::invalid_argument(format!(
                "expected {} values, got {}",
                self.num_values, self.count
            )));
        }
        if self.acc_bits > 0 {
            self.pending.push(self.acc as u8);
        }
        let data_bytes = (self.num_values * self.bits_per_value as u64).div_ceil(8);
        let padding = bytes_required(self.num_values, self.bits_per_value) - data_bytes;
        self.pending.extend(std::iter::repeat(0u8).take(padding as usize));
        self.out.write_bytes(&self.pending)
    }
}

/// Random access over values written by [`DirectWriter`].
#[derive(Debug, Clone)]
pub struct DirectReader {
    input: RandomAccessInput,
    offset: u64,
    bits_per_value: u8,
    mask: u64,
}

impl DirectReader {
    /// Reader over `num_values` values starting at `offset` in `input`.
    ///
    /// Fails with a corruption error when `input` is too short to hold them.
    pub fn new(input: RandomAccessInput, bits_per_value: u8, offset: u64, num_values: u64) -> Result<Self> {
        if !is_supported(bits_per_value) {
            return Err(Error::corruption(format!(
                "unsupported bits per value: {}",
                bits_per_value
            )));
        }
        let needed = offset.saturating_add(bytes_required(num_values, bits_per_value));
        if needed > input.len() {
            return Err(Error::corruption(format!(
                "packed data needs {} bytes, slice has {}",
                needed,
                input.len()
            )));
        }
        let mask = if bits_per_value == 64 {
            u64::MAX
        } else {
            (1u64 << bits_per_value) - 1
        };
        Ok(DirectReader {
            input,
            offset,
            bits_per_value,
            mask,
        })
    }

    /// Value at `index`.
    #[inline]
    pub fn get(&self, index: u64) -> u64 {
        let bit = index * self.bits_per_value as u64;
        let word = self.input.read_u64(self.offset + (bit >> 3));
        (word >> (bit & 7)) & self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_storage::io::{IndexInput, VecOutput};

    fn pack(values: &[u64], bpv: u8) -> (VecOutput, u64) {
        let mut out = VecOutput::new();
        out.write_bytes(&[0xEE; 3]).unwrap(); // unaligned start
        let offset = out.file_pointer();
        let mut writer = DirectWriter::new(&mut out, values.len() as u64, bpv).unwrap();
        for &v in values {
            writer.add(v).unwrap();
        }
        writer.finish().unwrap();
        (out, offset)
    }

    fn reader(out: VecOutput, bpv: u8, offset: u64, n: u64) -> DirectReader {
        let input = IndexInput::from_vec("packed", out.into_inner());
        let ra = input.random_access_slice(0, input.len()).unwrap();
        DirectReader::new(ra, bpv, offset, n).unwrap()
    }

    #[test]
    fn test_bits_required() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(5), 4);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 12);
        assert_eq!(bits_required(1 << 33), 40);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn test_every_width_roundtrips() {
        for &bpv in SUPPORTED_BITS_PER_VALUE.iter() {
            let max = if bpv == 64 { u64::MAX } else { (1u64 << bpv) - 1 };
            let values: Vec<u64> = (0..37u64)
                .map(|i| if i % 3 == 0 { max } else { i.wrapping_mul(0x9E37_79B9_7F4A_7C15) & max })
                .collect();
            let (out, offset) = pack(&values, bpv);
            let r = reader(out, bpv, offset, values.len() as u64);
            for (i, &v) in values.iter().enumerate() {
                assert_eq!(r.get(i as u64), v, "bpv={} index={}", bpv, i);
            }
        }
    }

    #[test]
    fn test_padding_covers_last_read() {
        for &bpv in SUPPORTED_BITS_PER_VALUE.iter() {
            for n in 1..20u64 {
                let last = (n - 1) * bpv as u64 / 8;
                assert!(last + 8 <= bytes_required(n, bpv));
            }
        }
        assert_eq!(bytes_required(0, 8), 0);
    }

    #[test]
    fn test_value_too_wide_rejected() {
        let mut out = VecOutput::new();
        let mut writer = DirectWriter::new(&mut out, 1, 4).unwrap();
        assert!(matches!(writer.add(16), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_wrong_count_rejected() {
        let mut out = VecOutput::new();
        let mut writer = DirectWriter::new(&mut out, 2, 8).unwrap();
        writer.add(1).unwrap();
        assert!(writer.finish().is_err());
    }

    #[test]
    fn test_unsupported_width_rejected() {
        let mut out = VecOutput::new();
        assert!(DirectWriter::new(&mut out, 1, 3).is_err());
    }

    #[test]
    fn test_truncated_data_is_corruption() {
        let (out, offset) = pack(&[1, 2, 3, 4], 16);
        let mut bytes = out.into_inner();
        bytes.truncate(bytes.len() - 1);
        let input = IndexInput::from_vec("short", bytes);
        let ra = input.random_access_slice(0, input.len()).unwrap();
        assert!(DirectReader::new(ra, 16, offset, 4).unwrap_err().is_corruption());
    }
}
