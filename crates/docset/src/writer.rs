//! Doc-set encoder.

use strata_core::{DocId, Error, FixedBitSet, Result, NO_MORE_DOCS};
use strata_storage::io::IndexOutput;
use tracing::debug;

use crate::config::DisiConfig;
use crate::{BLOCK_SIZE, DENSE_BLOCK_WORDS, MAX_ARRAY_LENGTH};

/// What [`write_doc_set`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocSetSummary {
    /// Number of documents written (terminator excluded).
    pub cardinality: u64,
    /// Entries in the trailing jump table, 0 when none was written.
    pub jump_table_entry_count: u32,
    /// Total bytes written, jump table included.
    pub length: u64,
}

/// Encode a strictly increasing sequence of doc ids into `out`.
///
/// Jump-table offsets are relative to the output position at entry, so the
/// returned `length` bytes are self-contained and may be sliced out anywhere.
pub fn write_doc_set<I>(docs: I, out: &mut dyn IndexOutput, config: &DisiConfig) -> Result<DocSetSummary>
where
    I: IntoIterator<Item = DocId>,
{
    config.validate()?;
    let origin = out.file_pointer();
    let mut bits = FixedBitSet::new(BLOCK_SIZE as usize);
    let mut jumps: Vec<(u32, u32)> = Vec::new();
    let mut total: u64 = 0;
    let mut block_cardinality: u32 = 0;
    let mut current_block: Option<u32> = None;
    let mut previous: Option<DocId> = None;

    for doc in docs {
        if doc < 0 || doc >= NO_MORE_DOCS {
            return Err(Error::invalid_argument(format!("doc id {} cannot be stored", doc)));
        }
        if let Some(prev) = previous {
            if doc <= prev {
                return Err(Error::invalid_argument(format!(
                    "doc ids must be strictly increasing: {} after {}",
                    doc, prev
                )));
            }
        }
        previous = Some(doc);

        let block = (doc as u32) >> 16;
        if let Some(cur) = current_block {
            if cur != block {
                let offset = relative(out, origin)?;
                add_jumps(&mut jumps, cur, total, offset);
                flush_block(cur, &mut bits, block_cardinality, config, out)?;
                total += u64::from(block_cardinality);
                block_cardinality = 0;
            }
        }
        current_block = Some(block);
        bits.set((doc & 0xFFFF) as usize);
        block_cardinality += 1;
    }

    let next_block = match current_block {
        Some(cur) => {
            let offset = relative(out, origin)?;
            add_jumps(&mut jumps, cur, total, offset);
            flush_block(cur, &mut bits, block_cardinality, config, out)?;
            total += u64::from(block_cardinality);
            cur + 1
        }
        None => 0,
    };

    // One entry past the last real block lands on the terminator.
    let offset = relative(out, origin)?;
    add_jumps(&mut jumps, next_block, total, offset);
    bits.set((NO_MORE_DOCS & 0xFFFF) as usize);
    flush_block((NO_MORE_DOCS as u32) >> 16, &mut bits, 1, config, out)?;

    let jump_table_entry_count = if jumps.len() <= 2 {
        0
    } else {
        for &(index, offset) in &jumps {
            out.write_u32(index)?;
            out.write_u32(offset)?;
        }
        jumps.len() as u32
    };

    let length = out.file_pointer() - origin;
    debug!(
        target: "strata::io",
        cardinality = total,
        jump_table_entry_count,
        length,
        "wrote doc set"
    );
    Ok(DocSetSummary {
        cardinality: total,
        jump_table_entry_count,
        length,
    })
}

fn relative(out: &dyn IndexOutput, origin: u64) -> Result<u32> {
    u32::try_from(out.file_pointer() - origin)
        .map_err(|_| Error::invalid_argument("doc set exceeds 4 GiB"))
}

/// Point every block up to and including `block` at the given position.
fn add_jumps(jumps: &mut Vec<(u32, u32)>, block: u32, index: u64, offset: u32) {
    while jumps.len() as u32 <= block {
        jumps.push((index as u32, offset));
    }
}

fn flush_block(
    block: u32,
    bits: &mut FixedBitSet,
    cardinality: u32,
    config: &DisiConfig,
    out: &mut dyn IndexOutput,
) -> Result<()> {
    debug_assert!(cardinality > 0 && cardinality <= BLOCK_SIZE);
    out.write_u16(block as u16)?;
    out.write_u16((cardinality - 1) as u16)?;
    if cardinality <= MAX_ARRAY_LENGTH {
        for doc in bits.iter_ones() {
            out.write_u16(doc as u16)?;
        }
    } else if cardinality < BLOCK_SIZE {
        let words = bits.words();
        debug_assert_eq!(words.len(), DENSE_BLOCK_WORDS);
        if let Some(power) = config.dense_rank_power {
            write_rank_table(words, power, out)?;
        }
        for &word in words {
            out.write_u64(word)?;
        }
    }
    bits.clear_all();
    Ok(())
}

/// One u16 per `1 << power` docs: set bits strictly before that position.
fn write_rank_table(words: &[u64], power: u8, out: &mut dyn IndexOutput) -> Result<()> {
    let words_per_entry = 1usize << (power - 6);
    let mut rank: u32 = 0;
    for chunk in words.chunks(words_per_entry) {
        out.write_u16(rank as u16)?;
        rank += chunk.iter().map(|w| w.count_ones()).sum::<u32>();
    }
    Ok(())
}
