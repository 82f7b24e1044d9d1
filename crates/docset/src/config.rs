//! Doc-set encoding configuration.

/// Default rank granularity: one rank entry every 512 docs of a dense block.
pub const DEFAULT_DENSE_RANK_POWER: u8 = 9;

/// Smallest accepted rank power (one entry per 2 words).
pub const MIN_DENSE_RANK_POWER: u8 = 7;

/// Largest accepted rank power (one entry per half block).
pub const MAX_DENSE_RANK_POWER: u8 = 15;

/// Encoding options for [`write_doc_set`](crate::write_doc_set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisiConfig {
    /// log2 of the docs covered by one rank entry in dense blocks.
    ///
    /// `None` writes no rank table: dense blocks are then scanned word by word.
    pub dense_rank_power: Option<u8>,
}

impl Default for DisiConfig {
    fn default() -> Self {
        DisiConfig {
            dense_rank_power: Some(DEFAULT_DENSE_RANK_POWER),
        }
    }
}

impl DisiConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration without rank tables.
    pub fn without_rank() -> Self {
        DisiConfig {
            dense_rank_power: None,
        }
    }

    /// Set the rank power (builder pattern).
    pub fn with_dense_rank_power(mut self, power: u8) -> Self {
        self.dense_rank_power = Some(power);
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), DisiConfigError> {
        match self.dense_rank_power {
            Some(p) if !(MIN_DENSE_RANK_POWER..=MAX_DENSE_RANK_POWER).contains(&p) => {
                Err(DisiConfigError::RankPowerOutOfRange(p))
            }
            _ => Ok(()),
        }
    }

    /// Bytes of rank table preceding each dense bitmap.
    pub fn rank_table_bytes(&self) -> u64 {
        rank_table_bytes(self.dense_rank_power)
    }
}

pub(crate) fn rank_table_bytes(dense_rank_power: Option<u8>) -> u64 {
    match dense_rank_power {
        Some(p) => (65536u64 >> p) * 2,
        None => 0,
    }
}

/// Doc-set configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisiConfigError {
    /// Rank power outside `7..=15`.
    #[error("dense rank power must be between 7 and 15, got {0}")]
    RankPowerOutOfRange(u8),
}

impl From<DisiConfigError> for strata_core::Error {
    fn from(e: DisiConfigError) -> Self {
        strata_core::Error::InvalidConfig(e.to_string())
    }
}
