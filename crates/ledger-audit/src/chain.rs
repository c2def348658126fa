//! Hash chain primitives.
//!
//! The chain is built by hashing `canonical(metadata_without_hash) ‖
//! canonical(payload)` under the event's tagged algorithm. Every field that
//! contributes to an event's hash goes through canonical JSON (`ledger_types
//! ::canonical`) first, so the same event hashes identically regardless of
//! which process or language computed it.

use ledger_types::canonical::canonical_json_bytes;
use ledger_types::error::LedgerTypeResult;
use ledger_types::event::GovernanceEvent;
use ledger_types::hash::{compute_hash, extract_algorithm, genesis_marker, is_genesis_marker};

/// Computes the self-hash of `event` under `algorithm`, using `prev_hash` as
/// the predecessor link rather than whatever `event.metadata.prev_hash`
/// currently holds. Passing the event's own `prev_hash` back in recomputes
/// and checks self-consistency; passing a freshly-looked-up predecessor hash
/// computes the hash a not-yet-chained event *would* have.
pub fn compute_event_hash(
    event: &GovernanceEvent,
    prev_hash: &str,
    algorithm: &str,
) -> LedgerTypeResult<String> {
    let mut meta_json = event.metadata.to_hashable_json();
    meta_json["prev_hash"] = serde_json::Value::String(prev_hash.to_string());

    let mut bytes = canonical_json_bytes(&meta_json)?;
    bytes.extend_from_slice(&canonical_json_bytes(&event.payload)?);
    compute_hash(algorithm, &bytes)
}

/// Chains an ordered list of fresh (unhashed) events: the first receives the
/// algorithm's genesis marker as `prev_hash`; each subsequent event's
/// `prev_hash` is the previous event's freshly computed `hash`.
pub fn chain_events(events: Vec<GovernanceEvent>, algorithm: &str) -> LedgerTypeResult<Vec<GovernanceEvent>> {
    let mut chained = Vec::with_capacity(events.len());
    let mut prev_hash = genesis_marker(algorithm);

    for event in events {
        let hash = compute_event_hash(&event, &prev_hash, algorithm)?;
        let hashed = event.with_hash(prev_hash.clone(), hash.clone())?;
        prev_hash = hash;
        chained.push(hashed);
    }
    Ok(chained)
}

/// Structured per-event verification result: lets a caller distinguish
/// a tampered payload (`event_hash_valid == false`) from a broken link
/// (`chain_link_valid == false`) instead of a single opaque boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub event_hash_valid: bool,
    pub chain_link_valid: bool,
    pub error_message: Option<String>,
    pub expected_hash: String,
    pub actual_hash: String,
}

/// Verifies one event against its predecessor (`None` for the first event in
/// a chain). Pure — no I/O, no mutation.
pub fn verify_event(event: &GovernanceEvent, predecessor: Option<&GovernanceEvent>) -> ChainVerification {
    let algorithm = match extract_algorithm(event.hash()) {
        Ok(a) => a,
        Err(_) => {
            return ChainVerification {
                is_valid: false,
                event_hash_valid: false,
                chain_link_valid: false,
                error_message: Some(format!("event hash '{}' has no recognized algorithm", event.hash())),
                expected_hash: String::new(),
                actual_hash: event.hash().to_string(),
            };
        }
    };

    let chain_link_valid = match predecessor {
        Some(pred) => event.prev_hash() == pred.hash(),
        None => genesis_policy_ok(event.prev_hash()),
    };

    let expected_hash = compute_event_hash(event, event.prev_hash(), &algorithm).unwrap_or_default();
    let event_hash_valid = expected_hash == event.hash();

    let mut error_message = None;
    if !chain_link_valid {
        error_message = Some(format!(
            "chain link broken: expected prev_hash '{}', got '{}'",
            predecessor.map(|p| p.hash()).unwrap_or("<genesis>"),
            event.prev_hash()
        ));
    } else if !event_hash_valid {
        error_message = Some(format!(
            "self-hash mismatch: expected '{}', got '{}'",
            expected_hash,
            event.hash()
        ));
    }

    ChainVerification {
        is_valid: chain_link_valid && event_hash_valid,
        event_hash_valid,
        chain_link_valid,
        error_message,
        expected_hash,
        actual_hash: event.hash().to_string(),
    }
}

/// Genesis policy: `prev_hash` is valid for a genesis event iff it is
/// empty, or all-zeros (bare or algorithm-tagged). Permissive on read; see
/// `ledger_types::hash::is_genesis_marker`.
pub fn genesis_policy_ok(prev_hash: &str) -> bool {
    is_genesis_marker(prev_hash)
}

/// Verifies an entire chain of events in order, short-circuiting on the first
/// break. Used where a single boolean suffices; `ledger-proof`'s independent
/// verification instead collects every break via repeated [`verify_event`]
/// calls, since it must report all problems in one pass.
pub fn verify_chain(events: &[GovernanceEvent]) -> bool {
    let mut predecessor: Option<&GovernanceEvent> = None;
    for event in events {
        if !verify_event(event, predecessor).is_valid {
            return false;
        }
        predecessor = Some(event);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn make(payload: serde_json::Value) -> GovernanceEvent {
        GovernanceEvent::create(
            "executive.task.activated",
            now(),
            "actor-1",
            "trace-1",
            payload,
            "1.0.0",
        )
        .unwrap()
    }

    #[test]
    fn chains_three_events_with_linked_hashes() {
        let events = vec![make(json!({"seq": 1})), make(json!({"seq": 2})), make(json!({"seq": 3}))];
        let chained = chain_events(events, "blake3").unwrap();

        assert_eq!(chained[0].prev_hash(), genesis_marker("blake3"));
        assert_eq!(chained[1].prev_hash(), chained[0].hash());
        assert_eq!(chained[2].prev_hash(), chained[1].hash());
        assert!(verify_chain(&chained));
    }

    #[test]
    fn tampering_with_payload_breaks_self_hash() {
        let events = chain_events(vec![make(json!({"seq": 1}))], "blake3").unwrap();
        let mut tampered = events[0].clone();
        tampered.payload = json!({"seq": 999});

        let result = verify_event(&tampered, None);
        assert!(!result.event_hash_valid);
        assert!(result.chain_link_valid);
    }

    #[test]
    fn broken_link_detected_independently_of_self_hash() {
        let events = chain_events(vec![make(json!({"seq": 1})), make(json!({"seq": 2}))], "blake3").unwrap();
        // Event 1's self-hash is still internally correct, but its prev_hash
        // no longer matches event 0's actual hash.
        let mut broken = events[1].clone();
        let mut meta = broken.metadata.clone();
        meta.prev_hash = "blake3:ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff".to_string();
        broken.metadata = meta;

        let result = verify_event(&broken, Some(&events[0]));
        assert!(!result.chain_link_valid);
    }

    #[test]
    fn genesis_accepts_empty_and_zero_prev_hash() {
        assert!(genesis_policy_ok(""));
        assert!(genesis_policy_ok(&"0".repeat(64)));
        assert!(genesis_policy_ok(&genesis_marker("sha256")));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    // Bounded-depth arbitrary JSON values: canonical JSON rejects non-finite
    // floats, so floats here are restricted to values `to_finite` accepts,
    // and recursion is capped so shrinking terminates quickly.
    fn arb_json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z0-9_]{0,12}".prop_map(Value::String),
        ]
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        arb_json_leaf().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::hash_map("[a-z][a-z0-9_]{0,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        /// For any sequence of events built from arbitrary JSON payloads,
        /// chaining produces a list that passes full-chain verification and
        /// whose `prev_hash` links are exactly the predecessor's `hash`.
        #[test]
        fn chain_continuity_holds_for_arbitrary_payloads(
            payloads in prop::collection::vec(arb_json(), 1..12)
        ) {
            let events: Vec<GovernanceEvent> = payloads
                .into_iter()
                .map(|p| GovernanceEvent::create("executive.task.activated", now(), "actor-1", "trace-1", p, "1.0.0").unwrap())
                .collect();

            let chained = chain_events(events, "blake3").unwrap();
            prop_assert!(verify_chain(&chained));

            prop_assert_eq!(chained[0].prev_hash(), genesis_marker("blake3"));
            for pair in chained.windows(2) {
                prop_assert_eq!(pair[1].prev_hash(), pair[0].hash());
            }
        }

        /// Self-hash is recomputable: for every chained event, recomputing
        /// `compute_event_hash` with its own `prev_hash` reproduces its
        /// stored `hash` exactly.
        #[test]
        fn self_hash_is_reproducible(payloads in prop::collection::vec(arb_json(), 1..12)) {
            let events: Vec<GovernanceEvent> = payloads
                .into_iter()
                .map(|p| GovernanceEvent::create("executive.task.activated", now(), "actor-1", "trace-1", p, "1.0.0").unwrap())
                .collect();

            let chained = chain_events(events, "blake3").unwrap();
            for event in &chained {
                let recomputed = compute_event_hash(event, event.prev_hash(), "blake3").unwrap();
                prop_assert_eq!(recomputed, event.hash().to_string());
            }
        }
    }
}
