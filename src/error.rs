//! Crate error type.

use thiserror::Error;

/// Errors produced by the octree and its companion structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Lookup or removal of a key that is not stored.
    #[error("key not found")]
    NotFound,

    /// A structural cycle or corrupted size bookkeeping was detected.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("duplicate key")]
    DuplicateKey,

    #[error("rank {rank} out of range for {len} elements")]
    RankOutOfRange { rank: usize, len: usize },

    #[error("percentile {0} is above 100")]
    PercentileOutOfRange(u32),

    #[error("capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },

    #[error("structure is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, Error>;
