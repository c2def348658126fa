//! # ledger-proof
//!
//! Completeness proof generation and independent offline verification
//! for the governance event ledger, plus its export format and replayer port
//! contract.
//!
//! [`completeness::generate_completeness`] reads a ledger and produces a
//! [`completeness::CompletenessProof`]; [`independent::verify_completeness`]
//! takes that proof plus an event list — live or reconstructed from a
//! [`export::LedgerExport`] via [`export::to_persisted_events`] — and
//! recomputes everything it claims without touching the ledger again.

pub mod completeness;
pub mod error;
pub mod export;
pub mod independent;

pub use completeness::{build_proof_generated_event, generate_completeness, CompletenessProof, HashChainProof};
pub use error::{ProofError, ProofResult};
pub use export::{export_ledger, to_persisted_events, ExportMetadata, ExportedEvent, LedgerExport, VerificationInfo};
pub use independent::{
    apply_state_replay, replay_and_compare, verify_completeness, DetectedIssue, IssueType, VerificationResult,
    VerificationStatus,
};
