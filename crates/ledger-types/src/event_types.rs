//! Event type catalog and branch derivation (C3 surface, catalog supplemented
//! from `event_types.py`).
//!
//! An event type is a lowercase triple `branch.noun.verb`. The catalog below
//! enumerates the concrete identities the strict-mode event-type validator
//! (`ledger-validate`) checks against; it is deliberately not exhaustive of
//! every possible governance action, only of the ones this reference
//! implementation's validators and state machines understand by name.

use crate::error::{LedgerTypeError, LedgerTypeResult};

/// Validates `event_type` against `^[a-z]+\.[a-z]+\.[a-z_]+$` and, if
/// `strict` is set, against [`KNOWN_EVENT_TYPES`].
pub fn validate_event_type(event_type: &str, strict: bool) -> LedgerTypeResult<()> {
    if !is_well_formed(event_type) {
        return Err(LedgerTypeError::MalformedEventType {
            event_type: event_type.to_string(),
        });
    }
    if strict && !KNOWN_EVENT_TYPES.contains(&event_type) {
        return Err(LedgerTypeError::MalformedEventType {
            event_type: event_type.to_string(),
        });
    }
    Ok(())
}

fn is_well_formed(event_type: &str) -> bool {
    let segments: Vec<&str> = event_type.split('.').collect();
    if segments.len() != 3 {
        return false;
    }
    let non_empty_lower = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase());
    let verb_ok = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');
    non_empty_lower(segments[0]) && non_empty_lower(segments[1]) && verb_ok(segments[2])
}

/// The first segment of `event_type`, i.e. the governance branch. Must only
/// be called after [`validate_event_type`] has confirmed the triple shape —
/// the branch is derived at write time and never trusted from caller input.
pub fn derive_branch(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}

/// Event types this reference implementation recognizes by name. Unknown
/// branches are still syntactically legal; this catalog only bounds
/// *strict-mode* validation and the suggestion search in `ledger-validate`.
pub const KNOWN_EVENT_TYPES: &[&str] = &[
    "executive.task.authorized",
    "executive.task.activated",
    "executive.task.accepted",
    "executive.task.declined",
    "executive.task.completed",
    "executive.task.expired",
    "executive.task.cancelled",
    "judicial.finding.issued",
    "witness.observation.recorded",
    "filter.content.screened",
    "consent.grant.recorded",
    "consent.revocation.recorded",
    "legitimacy.band.restored",
    "legitimacy.band.decayed",
    "exit.request.filed",
    "safety.incident.flagged",
    "system.configuration.changed",
    "ledger.merkle.root_published",
    "ledger.integrity.hash_break_detected",
    "ledger.integrity.orphaned_intent_detected",
    "ledger.integrity.gap_detected",
    "ledger.integrity.verification_passed",
    "audit.proof.generated",
    "audit.proof.verified",
    "audit.verification.completed",
    // Two-phase event types: `{branch}.intent.emitted` /
    // `{branch}.commit.confirmed` / `{branch}.failure.recorded` — a
    // 3-segment triple per branch, one trio per branch, matching the
    // original's `GovernanceEventType` two-phase members exactly (the branch
    // alone carries the correlation; there is no per-noun variant).
    "executive.intent.emitted",
    "executive.commit.confirmed",
    "executive.failure.recorded",
    "judicial.intent.emitted",
    "judicial.commit.confirmed",
    "judicial.failure.recorded",
    "witness.intent.emitted",
    "witness.commit.confirmed",
    "witness.failure.recorded",
    "filter.intent.emitted",
    "filter.commit.confirmed",
    "filter.failure.recorded",
    "consent.intent.emitted",
    "consent.commit.confirmed",
    "consent.failure.recorded",
    "legitimacy.intent.emitted",
    "legitimacy.commit.confirmed",
    "legitimacy.failure.recorded",
    "exit.intent.emitted",
    "exit.commit.confirmed",
    "exit.failure.recorded",
    "safety.intent.emitted",
    "safety.commit.confirmed",
    "safety.failure.recorded",
    "system.intent.emitted",
    "system.commit.confirmed",
    "system.failure.recorded",
];

/// Fixed suffix alternations used by the two-phase gap detector. Not a
/// regex or glob engine by design — see DESIGN.md's "Open Questions
/// resolved" — just the three well-known suffixes.
pub const INTENT_SUFFIX: &str = ".intent.emitted";
pub const COMMIT_SUFFIX: &str = ".commit.confirmed";
pub const FAILURE_SUFFIX: &str = ".failure.recorded";

pub fn is_intent(event_type: &str) -> bool {
    event_type.ends_with(INTENT_SUFFIX)
}

pub fn is_outcome(event_type: &str) -> bool {
    event_type.ends_with(COMMIT_SUFFIX) || event_type.ends_with(FAILURE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_triples_validate() {
        assert!(validate_event_type("executive.task.activated", false).is_ok());
        assert!(validate_event_type("ledger.merkle.root_published", true).is_ok());
    }

    #[test]
    fn malformed_triples_rejected() {
        assert!(validate_event_type("Executive.Task.Activated", false).is_err());
        assert!(validate_event_type("executive.task", false).is_err());
        assert!(validate_event_type("executive.task.activated.extra", false).is_err());
    }

    #[test]
    fn strict_mode_rejects_unregistered_type() {
        assert!(validate_event_type("executive.task.activated", true).is_ok());
        assert!(validate_event_type("executive.widget.frobnicated", true).is_err());
        // Non-strict mode permits unregistered but well-formed branches.
        assert!(validate_event_type("executive.widget.frobnicated", false).is_ok());
    }

    #[test]
    fn branch_is_first_segment() {
        assert_eq!(derive_branch("executive.task.activated"), "executive");
        assert_eq!(derive_branch("ledger.merkle.root_published"), "ledger");
    }

    #[test]
    fn two_phase_suffix_detection() {
        assert!(is_intent("executive.intent.emitted"));
        assert!(is_outcome("executive.commit.confirmed"));
        assert!(is_outcome("executive.failure.recorded"));
        assert!(!is_intent("executive.task.activated"));
    }

    #[test]
    fn two_phase_types_are_well_formed_triples() {
        for branch in [
            "executive", "judicial", "witness", "filter", "consent", "legitimacy", "exit", "safety", "system",
        ] {
            assert!(validate_event_type(&format!("{branch}.intent.emitted"), true).is_ok());
            assert!(validate_event_type(&format!("{branch}.commit.confirmed"), true).is_ok());
            assert!(validate_event_type(&format!("{branch}.failure.recorded"), true).is_ok());
        }
    }
}
