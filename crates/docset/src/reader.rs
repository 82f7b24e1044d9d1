//! Forward-only iterator over an encoded doc set.

use strata_core::{DocId, DocIdSetIterator, Error, Result, NO_MORE_DOCS, UNPOSITIONED};
use strata_storage::io::{IndexInput, RandomAccessInput};

use crate::config::rank_table_bytes;
use crate::{BLOCK_SIZE, DENSE_BLOCK_WORDS, MAX_ARRAY_LENGTH};

const LAST_BLOCK: DocId = NO_MORE_DOCS & !0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Sparse,
    Dense,
    All,
}

/// Iterator over a doc set written by [`write_doc_set`](crate::write_doc_set).
///
/// Besides the current doc it tracks [`index`](Self::index), the ordinal of
/// that doc within the set. Cloning yields an independent cursor.
#[derive(Debug, Clone)]
pub struct IndexedDisi {
    slice: IndexInput,
    jump_table: Option<RandomAccessInput>,
    jump_table_entry_count: u32,
    dense_rank_power: Option<u8>,
    cost: u64,

    block: DocId,
    block_end: u64,
    next_block_index: i64,
    method: Method,
    doc: DocId,
    index: i64,

    // dense
    dense_bitmap_offset: u64,
    dense_rank_table: Vec<u8>,
    word_index: i32,
    word: u64,
    ones_through_word: i64,
    dense_origin_index: i64,

    // all
    gap: i64,
}

impl IndexedDisi {
    /// Open the doc set stored at `[offset, offset + length)` of `data`.
    ///
    /// `cost` is the cardinality recorded at write time.
    pub fn new(
        data: &IndexInput,
        offset: u64,
        length: u64,
        jump_table_entry_count: u32,
        dense_rank_power: Option<u8>,
        cost: u64,
    ) -> Result<Self> {
        let jump_bytes = u64::from(jump_table_entry_count) * 8;
        if jump_bytes > length {
            return Err(Error::corruption(format!(
                "doc set of {} bytes cannot hold {} jump entries",
                length, jump_table_entry_count
            )));
        }
        let slice = data.slice("docs-with-field", offset, length - jump_bytes)?;
        let jump_table = if jump_table_entry_count > 0 {
            Some(data.random_access_slice(offset + length - jump_bytes, jump_bytes)?)
        } else {
            None
        };
        Ok(IndexedDisi {
            slice,
            jump_table,
            jump_table_entry_count,
            dense_rank_power,
            cost,
            block: UNPOSITIONED,
            block_end: 0,
            next_block_index: -1,
            method: Method::Sparse,
            doc: UNPOSITIONED,
            index: -1,
            dense_bitmap_offset: 0,
            dense_rank_table: vec![0; rank_table_bytes(dense_rank_power) as usize],
            word_index: -1,
            word: 0,
            ones_through_word: 0,
            dense_origin_index: 0,
            gap: 0,
        })
    }

    /// Ordinal of the current doc within the set.
    ///
    /// `-1` before the first doc; equal to the cardinality once exhausted.
    pub fn index(&self) -> i32 {
        self.index as i32
    }

    fn advance_block(&mut self, target_block: DocId) -> Result<()> {
        let block_index = target_block >> 16;
        if let Some(jump_table) = &self.jump_table {
            // Skipping one block is cheaper than a lookup
            if block_index >= (self.block >> 16) + 2 {
                let in_range = block_index.min(self.jump_table_entry_count as i32 - 1) as u64;
                let index = jump_table.read_u32(in_range * 8);
                let offset = jump_table.read_u32(in_range * 8 + 4);
                self.next_block_index = i64::from(index) - 1;
                self.slice.seek(u64::from(offset))?;
                self.read_block_header()?;
                return Ok(());
            }
        }

        loop {
            self.slice.seek(self.block_end)?;
            self.read_block_header()?;
            if self.block >= target_block {
                return Ok(());
            }
        }
    }

    fn read_block_header(&mut self) -> Result<()> {
        let block = (self.slice.read_u16()? as DocId) << 16;
        let num_values = 1 + i64::from(self.slice.read_u16()?);
        if self.block != UNPOSITIONED
            && block <= self.block
            && !(block == self.block && self.is_shared_terminator(block, num_values)?)
        {
            return Err(Error::corruption(format!(
                "doc set block {} follows block {}",
                block >> 16,
                self.block >> 16
            )));
        }
        self.block = block;
        self.index = self.next_block_index;
        self.next_block_index = self.index + num_values;

        let body = self.slice.position();
        if num_values <= i64::from(MAX_ARRAY_LENGTH) {
            self.method = Method::Sparse;
            self.block_end = body + (num_values as u64) * 2;
        } else if num_values == i64::from(BLOCK_SIZE) {
            self.method = Method::All;
            self.block_end = body;
            self.gap = i64::from(self.block) - self.index - 1;
        } else {
            self.method = Method::Dense;
            if !self.dense_rank_table.is_empty() {
                self.slice.read_bytes(&mut self.dense_rank_table)?;
            }
            self.dense_bitmap_offset = self.slice.position();
            self.block_end = self.dense_bitmap_offset + (DENSE_BLOCK_WORDS as u64) * 8;
            self.word_index = -1;
            self.word = 0;
            self.ones_through_word = self.index + 1;
            self.dense_origin_index = self.ones_through_word;
        }
        if self.block_end > self.slice.len() {
            return Err(Error::corruption(format!(
                "doc set block {} ends at {} past {} bytes",
                self.block >> 16,
                self.block_end,
                self.slice.len()
            )));
        }
        Ok(())
    }

    /// Docs in the last block push the terminator into that same block.
    fn is_shared_terminator(&mut self, block: DocId, num_values: i64) -> Result<bool> {
        if block != LAST_BLOCK || num_values != 1 {
            return Ok(false);
        }
        let body = self.slice.position();
        let doc = DocId::from(self.slice.read_u16()?);
        self.slice.seek(body)?;
        Ok((block | doc) == NO_MORE_DOCS)
    }

    fn advance_within_block(&mut self, target: DocId) -> Result<bool> {
        match self.method {
            Method::Sparse => self.advance_sparse(target),
            Method::Dense => self.advance_dense(target),
            Method::All => {
                self.doc = target;
                self.index = i64::from(target) - self.gap;
                Ok(true)
            }
        }
    }

    fn advance_sparse(&mut self, target: DocId) -> Result<bool> {
        let target_in_block = target & 0xFFFF;
        while self.index < self.next_block_index {
            let doc = DocId::from(self.slice.read_u16()?);
            self.index += 1;
            if doc >= target_in_block {
                self.doc = self.block | doc;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn advance_dense(&mut self, target: DocId) -> Result<bool> {
        let target_in_block = target & 0xFFFF;
        let target_word_index = target_in_block >> 6;

        if let Some(power) = self.dense_rank_power {
            if target_word_index - self.word_index >= (1 << (power - 6)) {
                let rank_index = (target_in_block >> power) as usize;
                let rank = u16::from_le_bytes([
                    self.dense_rank_table[rank_index * 2],
                    self.dense_rank_table[rank_index * 2 + 1],
                ]);
                let aligned_word = ((rank_index as i32) << power) >> 6;
                self.slice
                    .seek(self.dense_bitmap_offset + (aligned_word as u64) * 8)?;
                self.word = self.slice.read_u64()?;
                self.word_index = aligned_word;
                self.ones_through_word =
                    self.dense_origin_index + i64::from(rank) + i64::from(self.word.count_ones());
            }
        }

        while self.word_index < target_word_index {
            self.word = self.slice.read_u64()?;
            self.word_index += 1;
            self.ones_through_word += i64::from(self.word.count_ones());
        }

        let left_bits = self.word >> (target_in_block & 63);
        if left_bits != 0 {
            self.doc = target + left_bits.trailing_zeros() as DocId;
            self.index = self.ones_through_word - i64::from(left_bits.count_ones());
            return Ok(true);
        }

        while self.word_index < DENSE_BLOCK_WORDS as i32 - 1 {
            self.word = self.slice.read_u64()?;
            self.word_index += 1;
            if self.word != 0 {
                self.index = self.ones_through_word;
                self.ones_through_word += i64::from(self.word.count_ones());
                self.doc = self.block | (self.word_index << 6) | self.word.trailing_zeros() as DocId;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl DocIdSetIterator for IndexedDisi {
    fn doc_id(&self) -> DocId {
        self.doc
    }

    fn next_doc(&mut self) -> Result<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.advance(self.doc + 1)
    }

    fn advance(&mut self, target: DocId) -> Result<DocId> {
        debug_assert!(
            target > self.doc || self.doc == NO_MORE_DOCS,
            "advance({}) must move past current doc {}",
            target,
            self.doc
        );
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }

        let target_block = target & !0xFFFF;
        if self.block < target_block {
            self.advance_block(target_block)?;
        }
        if self.block == target_block {
            if self.advance_within_block(target)? {
                return Ok(self.doc);
            }
            self.slice.seek(self.block_end)?;
            self.read_block_header()?;
        }
        let block = self.block;
        if !self.advance_within_block(block)? {
            return Err(Error::corruption(format!(
                "doc set block {} holds no documents",
                block >> 16
            )));
        }
        Ok(self.doc)
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{write_doc_set, DisiConfig};
    use strata_storage::io::VecOutput;

    fn build(docs: &[DocId], config: &DisiConfig) -> IndexedDisi {
        let mut out = VecOutput::new();
        let summary = write_doc_set(docs.iter().copied(), &mut out, config).unwrap();
        let input = IndexInput::from_vec("disi", out.into_inner());
        IndexedDisi::new(
            &input,
            0,
            summary.length,
            summary.jump_table_entry_count,
            config.dense_rank_power,
            summary.cardinality,
        )
        .unwrap()
    }

    fn collect(disi: &mut IndexedDisi) -> Vec<(DocId, i32)> {
        let mut seen = Vec::new();
        while disi.next_doc().unwrap() != NO_MORE_DOCS {
            seen.push((disi.doc_id(), disi.index()));
        }
        seen
    }

    fn check_all(docs: &[DocId], config: &DisiConfig) {
        let mut disi = build(docs, config);
        let seen = collect(&mut disi);
        let expected: Vec<(DocId, i32)> =
            docs.iter().enumerate().map(|(i, &d)| (d, i as i32)).collect();
        assert_eq!(seen, expected);
        assert_eq!(disi.index(), docs.len() as i32);
    }

    #[test]
    fn test_small_set_with_ordinals() {
        let mut disi = build(&[2, 5, 9], &DisiConfig::default());
        assert_eq!(disi.doc_id(), UNPOSITIONED);
        assert_eq!(disi.index(), -1);
        assert_eq!(disi.cost(), 3);

        assert_eq!(disi.next_doc().unwrap(), 2);
        assert_eq!(disi.index(), 0);
        assert_eq!(disi.advance(6).unwrap(), 9);
        assert_eq!(disi.index(), 2);
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.index(), 3);
    }

    #[test]
    fn test_exhaustion_is_permanent() {
        let mut disi = build(&[7], &DisiConfig::default());
        assert_eq!(disi.next_doc().unwrap(), 7);
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.advance(NO_MORE_DOCS).unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_advance_past_last_doc() {
        let mut disi = build(&[10, 20], &DisiConfig::default());
        assert_eq!(disi.advance(21).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_empty_set() {
        let mut disi = build(&[], &DisiConfig::default());
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.index(), 0);
    }

    #[test]
    fn test_dense_block_iteration() {
        let docs: Vec<DocId> = (0..65536).filter(|d| d % 3 != 0).collect();
        check_all(&docs, &DisiConfig::default());
        check_all(&docs, &DisiConfig::without_rank());
    }

    #[test]
    fn test_dense_advance_uses_rank() {
        let docs: Vec<DocId> = (0..65536).step_by(7).collect();
        for config in [
            DisiConfig::default(),
            DisiConfig::without_rank(),
            DisiConfig::new().with_dense_rank_power(7),
            DisiConfig::new().with_dense_rank_power(15),
        ] {
            let mut disi = build(&docs, &config);
            assert_eq!(disi.advance(40_000).unwrap(), 40_005);
            assert_eq!(disi.index(), 40_005 / 7);
            assert_eq!(disi.advance(40_006).unwrap(), 40_012);
            assert_eq!(disi.index(), 40_012 / 7);
            assert_eq!(disi.advance(65_530).unwrap(), 65_534);
            assert_eq!(disi.advance(65_535).unwrap(), NO_MORE_DOCS);
        }
    }

    #[test]
    fn test_all_block() {
        let docs: Vec<DocId> = (65536..131072).collect();
        let mut disi = build(&docs, &DisiConfig::default());
        assert_eq!(disi.advance(70_000).unwrap(), 70_000);
        assert_eq!(disi.index(), 70_000 - 65536);
        assert_eq!(disi.next_doc().unwrap(), 70_001);
        assert_eq!(disi.index(), 70_001 - 65536);
        assert_eq!(disi.advance(131_072).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_mixed_blocks() {
        let mut docs: Vec<DocId> = vec![1, 4000, 65_000];
        docs.extend((65_536..131_072).step_by(2));
        docs.extend(131_072..196_608);
        docs.extend([300_000, 300_001, 1_000_000]);
        check_all(&docs, &DisiConfig::default());
    }

    #[test]
    fn test_jump_table_skips_blocks() {
        let docs: Vec<DocId> = (0..40).map(|b| b * 65_536 + b).collect();
        let mut disi = build(&docs, &DisiConfig::default());
        assert!(disi.jump_table.is_some());
        assert_eq!(disi.advance(20 * 65_536).unwrap(), 20 * 65_536 + 20);
        assert_eq!(disi.index(), 20);
        // target inside an absent region lands on the next present doc
        assert_eq!(disi.advance(20 * 65_536 + 21).unwrap(), 21 * 65_536 + 21);
        assert_eq!(disi.index(), 21);
        assert_eq!(disi.advance(39 * 65_536).unwrap(), 39 * 65_536 + 39);
        assert_eq!(disi.index(), 39);
        assert_eq!(disi.advance(45 * 65_536).unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.index(), 40);
    }

    #[test]
    fn test_jump_to_empty_block_region() {
        let docs = [3, 70_000, 1_000_000];
        let mut disi = build(&docs, &DisiConfig::default());
        assert_eq!(disi.advance(200_000).unwrap(), 1_000_000);
        assert_eq!(disi.index(), 2);
    }

    #[test]
    fn test_doc_in_last_block() {
        let mut disi = build(&[0x7FFF_0000], &DisiConfig::default());
        assert_eq!(disi.next_doc().unwrap(), 0x7FFF_0000);
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.index(), 1);
        assert_eq!(disi.next_doc().unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_last_block_after_earlier_blocks() {
        let max = NO_MORE_DOCS - 1;
        let docs = [5, 70_000, 0x7FFF_0000, 0x7FFF_0010, max];
        check_all(&docs, &DisiConfig::default());

        let mut disi = build(&docs, &DisiConfig::default());
        assert_eq!(disi.advance(0x7FFF_0001).unwrap(), 0x7FFF_0010);
        assert_eq!(disi.index(), 3);
        assert_eq!(disi.advance(max).unwrap(), max);
        assert_eq!(disi.advance(NO_MORE_DOCS).unwrap(), NO_MORE_DOCS);
        assert_eq!(disi.index(), 5);
    }

    #[test]
    fn test_dense_last_block() {
        let docs: Vec<DocId> = (0x7FFF_0000..NO_MORE_DOCS).step_by(3).collect();
        check_all(&docs, &DisiConfig::default());

        let mut disi = build(&docs, &DisiConfig::without_rank());
        assert_eq!(disi.advance(0x7FFF_0001).unwrap(), 0x7FFF_0003);
        assert_eq!(disi.index(), 1);
        assert_eq!(disi.advance(*docs.last().unwrap() + 1).unwrap(), NO_MORE_DOCS);
    }

    #[test]
    fn test_repeated_last_block_is_corruption() {
        let mut out = VecOutput::new();
        let summary = write_doc_set([0x7FFF_0000], &mut out, &DisiConfig::default()).unwrap();
        let mut bytes = out.into_inner();
        // block header, doc, terminator header, then the terminator's 0xFFFF
        bytes[10..12].copy_from_slice(&0x0001u16.to_le_bytes());
        let input = IndexInput::from_vec("disi", bytes);
        let mut disi = IndexedDisi::new(
            &input,
            0,
            summary.length,
            summary.jump_table_entry_count,
            Some(9),
            summary.cardinality,
        )
        .unwrap();
        assert_eq!(disi.next_doc().unwrap(), 0x7FFF_0000);
        assert!(disi.next_doc().unwrap_err().is_corruption());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut disi = build(&[1, 2, 3], &DisiConfig::default());
        disi.next_doc().unwrap();
        let mut copy = disi.clone();
        assert_eq!(copy.next_doc().unwrap(), 2);
        assert_eq!(disi.doc_id(), 1);
    }

    #[test]
    fn test_truncated_data_is_corruption() {
        let mut out = VecOutput::new();
        let docs: Vec<DocId> = (0..65536).step_by(2).collect();
        write_doc_set(docs, &mut out, &DisiConfig::default()).unwrap();
        let mut bytes = out.into_inner();
        bytes.truncate(100);
        let input = IndexInput::from_vec("disi", bytes);
        let mut disi = IndexedDisi::new(&input, 0, 100, 0, Some(9), 32768).unwrap();
        assert!(disi.next_doc().unwrap_err().is_corruption());
    }

    #[test]
    fn test_jump_table_larger_than_data_rejected() {
        let input = IndexInput::from_vec("disi", vec![0; 8]);
        assert!(IndexedDisi::new(&input, 0, 8, 2, None, 0).is_err());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "must move past current doc")]
    fn test_backward_advance_asserts() {
        let mut disi = build(&[2, 5, 9], &DisiConfig::default());
        disi.advance(5).unwrap();
        let _ = disi.advance(3);
    }
}
