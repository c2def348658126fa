//! Validator #4: hash chain (≤ 50 ms budget, runs last — the only validator
//! that needs a ledger read).
//!
//! Accepts either a fresh (unhashed) event — in which case it computes the
//! hash chain fields here — or an already-hashed event, which it instead
//! re-verifies against the ledger's actual current latest. Both flows are
//! needed: producers typically hand the pipeline an unhashed event and let
//! it compute the chain; administrative replay and cross-process import
//! hand it an already-hashed event that must merely be confirmed consistent.

use ledger_audit::chain::compute_event_hash;
use ledger_types::event::{GovernanceEvent, PersistedEvent};
use ledger_types::hash::genesis_marker;

use crate::error::{ValidationError, ValidationResult};

pub fn validate_and_hash(
    event: GovernanceEvent,
    latest: Option<&PersistedEvent>,
    algorithm: &str,
) -> ValidationResult<GovernanceEvent> {
    let expected_prev = latest
        .map(|p| p.event.hash().to_string())
        .unwrap_or_else(|| genesis_marker(algorithm));
    let latest_sequence = latest.map(|p| p.sequence).unwrap_or(0);

    if event.has_hash() {
        if event.prev_hash() != expected_prev {
            return Err(ValidationError::HashChainBreak {
                event_id: event.event_id(),
                expected_prev,
                actual_prev: event.prev_hash().to_string(),
                latest_sequence,
            });
        }

        let expected_hash = compute_event_hash(&event, event.prev_hash(), algorithm)
            .map_err(|e| ValidationError::MalformedHash { event_id: event.event_id(), reason: e.to_string() })?;
        if expected_hash != event.hash() {
            return Err(ValidationError::MalformedHash {
                event_id: event.event_id(),
                reason: format!("self-hash mismatch: expected '{expected_hash}', got '{}'", event.hash()),
            });
        }

        Ok(event)
    } else {
        let hash = compute_event_hash(&event, &expected_prev, algorithm)
            .map_err(|e| ValidationError::MalformedHash { event_id: event.event_id(), reason: e.to_string() })?;
        event
            .with_hash(expected_prev, hash)
            .map_err(|e| ValidationError::MalformedHash { event_id: event.event_id(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn event() -> GovernanceEvent {
        GovernanceEvent::create("executive.task.activated", now(), "actor-1", "trace-1", json!({}), "1.0.0").unwrap()
    }

    #[test]
    fn fresh_genesis_event_gets_hashed() {
        let hashed = validate_and_hash(event(), None, "blake3").unwrap();
        assert!(hashed.has_hash());
        assert_eq!(hashed.prev_hash(), genesis_marker("blake3"));
    }

    #[test]
    fn already_hashed_event_consistent_with_latest_passes() {
        let first = validate_and_hash(event(), None, "blake3").unwrap();
        let persisted = PersistedEvent::new(first.clone(), 1).unwrap();

        let second = event();
        let hash = compute_event_hash(&second, first.hash(), "blake3").unwrap();
        let second_hashed = second.with_hash(first.hash().to_string(), hash).unwrap();

        let result = validate_and_hash(second_hashed, Some(&persisted), "blake3").unwrap();
        assert!(result.has_hash());
    }

    #[test]
    fn stale_prev_hash_rejected() {
        let first = validate_and_hash(event(), None, "blake3").unwrap();
        let persisted = PersistedEvent::new(first.clone(), 1).unwrap();

        let stale = event().with_hash(genesis_marker("blake3"), "blake3:".to_string() + &"1".repeat(64)).unwrap();
        let err = validate_and_hash(stale, Some(&persisted), "blake3").unwrap_err();
        assert!(matches!(err, ValidationError::HashChainBreak { .. }));
    }
}
