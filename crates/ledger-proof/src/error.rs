//! Proof-generation and export errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("cannot generate a completeness proof over a broken hash chain (first break at sequence {broken_at_sequence:?})")]
    ChainInvalid { broken_at_sequence: Option<u64> },

    #[error("merkle tree construction failed: {reason}")]
    MerkleBuildFailed { reason: String },

    #[error("backend rejected proof-generation audit event: {reason}")]
    EmissionFailed { reason: String },

    #[error("malformed ledger export: {reason}")]
    MalformedExport { reason: String },
}

pub type ProofResult<T> = Result<T, ProofError>;
