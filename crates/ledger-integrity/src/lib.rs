//! # ledger-integrity
//!
//! Hash-break/orphan detection and two-phase intent/commit/failure
//! event emission for the governance event ledger. Detection is
//! stateless and pure; emission is the only place in this crate that
//! appends to a ledger, and it does so through the same hash-chaining gate
//! (`ledger_validate::hash_chain`) every other event goes through.

pub mod error;
pub mod hash_break;
pub mod two_phase;

pub use error::{IntegrityError, IntegrityResult};
pub use hash_break::{build_violation_event, detect, scan, BreakCategory, DetectedBreak};
pub use two_phase::{
    build_orphan_event, emit_commit, emit_failure, emit_intent, get_intent_outcome_pair, scan_orphans,
    GuardError, InFlightRegistry, IntentOutcomePair, OrphanedIntent, TwoPhaseGuard,
};
