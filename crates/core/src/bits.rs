//! Random-access bit vectors used as live-docs / accept filters.

/// Read-only bit vector addressed by document id or ordinal.
pub trait Bits {
    /// Value of the bit at `index`. `index` must be `< len()`.
    fn get(&self, index: usize) -> bool;

    /// Number of addressable bits.
    fn len(&self) -> usize;

    /// True when no bit is addressable.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B: Bits + ?Sized> Bits for &B {
    fn get(&self, index: usize) -> bool {
        (**self).get(index)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Fixed-length bitset backed by 64-bit words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBitSet {
    words: Vec<u64>,
    num_bits: usize,
}

impl FixedBitSet {
    /// Create a bitset of `num_bits` cleared bits.
    pub fn new(num_bits: usize) -> Self {
        FixedBitSet {
            words: vec![0; Self::words_for(num_bits)],
            num_bits,
        }
    }

    /// Create a bitset of `num_bits` set bits.
    pub fn all_set(num_bits: usize) -> Self {
        let mut bits = Self::new(num_bits);
        for index in 0..num_bits {
            bits.set(index);
        }
        bits
    }

    /// Number of 64-bit words needed to hold `num_bits`.
    pub fn words_for(num_bits: usize) -> usize {
        num_bits.div_ceil(64)
    }

    /// Set the bit at `index`.
    pub fn set(&mut self, index: usize) {
        assert!(index < self.num_bits, "bit {} out of {}", index, self.num_bits);
        self.words[index >> 6] |= 1u64 << (index & 63);
    }

    /// Clear the bit at `index`.
    pub fn clear(&mut self, index: usize) {
        assert!(index < self.num_bits, "bit {} out of {}", index, self.num_bits);
        self.words[index >> 6] &= !(1u64 << (index & 63));
    }

    /// Clear every bit.
    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Backing words, least significant bit first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Indices of the set bits in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut remaining = word;
            std::iter::from_fn(move || {
                if remaining == 0 {
                    return None;
                }
                let bit = remaining.trailing_zeros() as usize;
                remaining &= remaining - 1;
                Some((i << 6) + bit)
            })
        })
    }
}

impl Bits for FixedBitSet {
    fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.num_bits, "bit {} out of {}", index, self.num_bits);
        (self.words[index >> 6] >> (index & 63)) & 1 == 1
    }

    fn len(&self) -> usize {
        self.num_bits
    }
}
