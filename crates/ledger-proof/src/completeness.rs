//! Completeness proof generation (C10, online half).
//!
//! Reads the whole ledger (paged), recomputes the hash chain and a
//! single-epoch Merkle root over it, and assembles a [`CompletenessProof`]
//! that [`crate::independent::verify_completeness`] can later check without
//! touching the ledger again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use ledger_audit::chain::verify_chain;
use ledger_merkle::MerkleTree;
use ledger_ports::{Clock, LedgerRead};
use ledger_types::event::{GovernanceEvent, LedgerReadOptions, PersistedEvent};
use ledger_types::hash::genesis_marker;

use crate::error::{ProofError, ProofResult};

const PAGE_SIZE: usize = 500;

/// Reads every event in `backend` in sequence order, paging through
/// `LedgerReadOptions` rather than assuming the backend tolerates an
/// unbounded `limit`: reads every event in sequence order, paged.
pub fn read_all(backend: &impl LedgerRead) -> Vec<PersistedEvent> {
    let mut all = Vec::new();
    let mut offset = 0;
    loop {
        let page = backend.read(&LedgerReadOptions { limit: PAGE_SIZE, offset, ..Default::default() });
        let page_len = page.len();
        all.extend(page);
        if page_len < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    all
}

/// `(genesis_hash, latest_hash, total_events, algorithm, chain_valid,
/// first_sequence, last_sequence)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChainProof {
    pub genesis_hash: String,
    pub latest_hash: String,
    pub total_events: usize,
    pub algorithm: String,
    pub chain_valid: bool,
    pub first_sequence: u64,
    pub last_sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessProof {
    pub proof_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub requester_id: Option<String>,
    pub hash_chain: HashChainProof,
    pub merkle_root: String,
    pub total_events: usize,
    pub is_empty: bool,
}

/// Generates a completeness proof over the entirety of `backend`. Aborts
/// with [`ProofError::ChainInvalid`] rather than proving over a chain that
/// does not actually verify.
pub fn generate_completeness(
    backend: &impl LedgerRead,
    algorithm: &str,
    requester_id: Option<&str>,
    clock: &dyn Clock,
) -> ProofResult<CompletenessProof> {
    let events = read_all(backend);

    if events.is_empty() {
        let sentinel = genesis_marker(algorithm);
        return Ok(CompletenessProof {
            proof_id: Uuid::new_v4(),
            generated_at: clock.now(),
            requester_id: requester_id.map(str::to_string),
            hash_chain: HashChainProof {
                genesis_hash: sentinel.clone(),
                latest_hash: sentinel,
                total_events: 0,
                algorithm: algorithm.to_string(),
                chain_valid: true,
                first_sequence: 0,
                last_sequence: 0,
            },
            merkle_root: MerkleTree::build(algorithm, &[])
                .map_err(|e| ProofError::MerkleBuildFailed { reason: e.to_string() })?
                .root(),
            total_events: 0,
            is_empty: true,
        });
    }

    let govs: Vec<GovernanceEvent> = events.iter().map(|p| p.event.clone()).collect();
    let chain_valid = verify_chain(&govs);
    if !chain_valid {
        let broken_at = first_break_sequence(&events);
        return Err(ProofError::ChainInvalid { broken_at_sequence: broken_at });
    }

    let hashes: Vec<String> = events.iter().map(|p| p.event.hash().to_string()).collect();
    let tree =
        MerkleTree::build(algorithm, &hashes).map_err(|e| ProofError::MerkleBuildFailed { reason: e.to_string() })?;

    Ok(CompletenessProof {
        proof_id: Uuid::new_v4(),
        generated_at: clock.now(),
        requester_id: requester_id.map(str::to_string),
        hash_chain: HashChainProof {
            genesis_hash: events[0].event.prev_hash().to_string(),
            latest_hash: events.last().unwrap().event.hash().to_string(),
            total_events: events.len(),
            algorithm: algorithm.to_string(),
            chain_valid: true,
            first_sequence: events[0].sequence,
            last_sequence: events.last().unwrap().sequence,
        },
        merkle_root: tree.root(),
        total_events: events.len(),
        is_empty: false,
    })
}

fn first_break_sequence(events: &[PersistedEvent]) -> Option<u64> {
    use ledger_audit::chain::verify_event;
    let mut predecessor: Option<&GovernanceEvent> = None;
    for event in events {
        if !verify_event(&event.event, predecessor).is_valid {
            return Some(event.sequence);
        }
        predecessor = Some(&event.event);
    }
    None
}

/// Builds the `audit.proof.generated` event for `proof`. Emission is
/// suppressed entirely in offline mode — the caller should only invoke this
/// (and append the result) when `proof.requester_id` is `Some`.
pub fn build_proof_generated_event(
    proof: &CompletenessProof,
    timestamp: DateTime<Utc>,
    actor_id: &str,
    trace_id: &str,
) -> ledger_types::error::LedgerTypeResult<GovernanceEvent> {
    let payload = json!({
        "proof_id": proof.proof_id.to_string(),
        "requester_id": proof.requester_id,
        "total_events": proof.total_events,
        "merkle_root": proof.merkle_root,
        "chain_valid": proof.hash_chain.chain_valid,
    });
    GovernanceEvent::create(
        "audit.proof.generated",
        timestamp,
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use ledger_audit::chain::chain_events;
    use ledger_audit::memory::InMemoryLedger;
    use ledger_ports::LedgerAppend;
    use serde_json::json as json_macro;

    struct FixedClock(DateTime<Utc>);
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn clock() -> FixedClock {
        FixedClock(DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc))
    }

    fn seed(ledger: &InMemoryLedger, n: usize) {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let events: Vec<_> = (0..n)
            .map(|i| {
                GovernanceEvent::create("executive.task.activated", now, "actor-1", "trace-1", json_macro!({"i": i}), "1.0.0")
                    .unwrap()
            })
            .collect();
        for event in chain_events(events, "blake3").unwrap() {
            ledger.append(event).unwrap();
        }
    }

    #[test]
    fn empty_ledger_yields_empty_proof() {
        let ledger = InMemoryLedger::new();
        let proof = generate_completeness(&ledger, "blake3", None, &clock()).unwrap();
        assert!(proof.is_empty);
        assert_eq!(proof.total_events, 0);
    }

    #[test]
    fn proof_over_clean_chain_succeeds() {
        let ledger = InMemoryLedger::new();
        seed(&ledger, 10);
        let proof = generate_completeness(&ledger, "blake3", Some("auditor-1"), &clock()).unwrap();
        assert!(proof.hash_chain.chain_valid);
        assert_eq!(proof.total_events, 10);
        assert_eq!(proof.hash_chain.first_sequence, 1);
        assert_eq!(proof.hash_chain.last_sequence, 10);
    }

    #[test]
    fn proof_over_broken_chain_is_rejected() {
        let ledger = InMemoryLedger::new();
        seed(&ledger, 3);

        // Corrupt the middle event's payload directly via the backend's
        // append-only surface is impossible, so read, tamper, and verify the
        // chain-validity check would have caught it before handing the
        // caller a proof (verified by reading all and checking manually).
        let events = read_all(&ledger);
        let mut tampered = events.clone();
        tampered[1].event.payload = json_macro!({"tampered": true});
        let govs: Vec<GovernanceEvent> = tampered.iter().map(|p| p.event.clone()).collect();
        assert!(!verify_chain(&govs));
    }

    #[test]
    fn paging_reads_more_than_one_page() {
        let ledger = InMemoryLedger::new();
        seed(&ledger, PAGE_SIZE + 5);
        let all = read_all(&ledger);
        assert_eq!(all.len(), PAGE_SIZE + 5);
    }
}
