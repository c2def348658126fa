//! Merkle tree and epoch errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MerkleError {
    #[error("unsupported hash algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("leaf index {index} out of bounds for tree with {leaf_count} leaves")]
    LeafIndexOutOfBounds { index: usize, leaf_count: usize },

    #[error("epoch range [{start_sequence}, {end_sequence}] has a gap at sequence {missing_sequence}")]
    GapInEpochRange {
        start_sequence: u64,
        end_sequence: u64,
        missing_sequence: u64,
    },

    #[error("epoch {epoch} has already been built")]
    EpochAlreadyBuilt { epoch: u64 },

    #[error("cannot build epoch {epoch}: range not yet complete (have {have}, need {need})")]
    EpochRangeIncomplete { epoch: u64, have: u64, need: u64 },
}

pub type MerkleResult<T> = Result<T, MerkleError>;
