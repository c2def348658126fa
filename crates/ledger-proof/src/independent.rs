//! Independent offline verification (C10, offline half).
//!
//! Pure: touches no ledger and no network. Takes a [`CompletenessProof`] plus
//! the event list it was generated over (or an export's events, via
//! [`crate::export::LedgerExport`]) and recomputes everything the proof
//! claims, collecting every discrepancy rather than stopping at the first —
//! `independent_verification_service.py`'s collect-all-then-classify
//! behavior, carried over verbatim because its testable properties depend
//! on verifiers being able to report more than one problem per pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledger_audit::chain::verify_event;
use ledger_merkle::MerkleTree;
use ledger_ports::{Clock, Replayer};
use ledger_types::event::{GovernanceEvent, PersistedEvent};

use crate::completeness::CompletenessProof;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    BrokenLink,
    SequenceGap,
    MerkleMismatch,
    StateMismatch,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokenLink => "BROKEN_LINK",
            Self::SequenceGap => "SEQUENCE_GAP",
            Self::MerkleMismatch => "MERKLE_MISMATCH",
            Self::StateMismatch => "STATE_MISMATCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedIssue {
    pub issue_type: IssueType,
    pub event_id: Option<Uuid>,
    pub sequence_number: Option<u64>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verification_id: Uuid,
    pub verified_at: DateTime<Utc>,
    pub status: VerificationStatus,
    pub hash_chain_valid: bool,
    pub merkle_valid: bool,
    pub sequence_complete: bool,
    pub state_replay_valid: Option<bool>,
    pub issues: Vec<DetectedIssue>,
    pub total_events_verified: usize,
}

fn classify(issues_empty: bool, checks: &[bool]) -> VerificationStatus {
    let passed = checks.iter().filter(|c| **c).count();
    if issues_empty && passed == checks.len() {
        VerificationStatus::Valid
    } else if passed == 0 {
        VerificationStatus::Invalid
    } else {
        VerificationStatus::Partial
    }
}

/// Verifies `events` against `proof`: event count, hash chain (every break,
/// not just the first), sequence density, and Merkle root. State-replay
/// confirmation is a separate opt-in step — see [`replay_and_compare`] and
/// [`apply_state_replay`] — since it requires a caller-supplied replayer and
/// expected state.
pub fn verify_completeness(proof: &CompletenessProof, events: &[PersistedEvent], clock: &dyn Clock) -> VerificationResult {
    let mut issues = Vec::new();

    let count_matches = events.len() == proof.total_events;
    if !count_matches {
        issues.push(DetectedIssue {
            issue_type: IssueType::SequenceGap,
            event_id: None,
            sequence_number: None,
            expected: Some(proof.total_events.to_string()),
            actual: Some(events.len().to_string()),
        });
    }

    let mut hash_chain_valid = true;
    let mut predecessor: Option<&GovernanceEvent> = None;
    for event in events {
        let verification = verify_event(&event.event, predecessor);
        if !verification.is_valid {
            hash_chain_valid = false;
            issues.push(DetectedIssue {
                issue_type: IssueType::BrokenLink,
                event_id: Some(event.event_id()),
                sequence_number: Some(event.sequence),
                expected: Some(verification.expected_hash),
                actual: Some(verification.actual_hash),
            });
        }
        predecessor = Some(&event.event);
    }

    if let Some(first) = events.first() {
        if first.event.prev_hash() != proof.hash_chain.genesis_hash {
            hash_chain_valid = false;
            issues.push(DetectedIssue {
                issue_type: IssueType::BrokenLink,
                event_id: Some(first.event_id()),
                sequence_number: Some(first.sequence),
                expected: Some(proof.hash_chain.genesis_hash.clone()),
                actual: Some(first.event.prev_hash().to_string()),
            });
        }
    }
    if let Some(last) = events.last() {
        if last.event.hash() != proof.hash_chain.latest_hash {
            hash_chain_valid = false;
            issues.push(DetectedIssue {
                issue_type: IssueType::BrokenLink,
                event_id: Some(last.event_id()),
                sequence_number: Some(last.sequence),
                expected: Some(proof.hash_chain.latest_hash.clone()),
                actual: Some(last.event.hash().to_string()),
            });
        }
    }

    let mut sequence_complete = true;
    let mut expected_seq = events.first().map(|e| e.sequence).unwrap_or(0);
    for event in events {
        if event.sequence != expected_seq {
            sequence_complete = false;
            issues.push(DetectedIssue {
                issue_type: IssueType::SequenceGap,
                event_id: Some(event.event_id()),
                sequence_number: Some(event.sequence),
                expected: Some(expected_seq.to_string()),
                actual: Some(event.sequence.to_string()),
            });
        }
        expected_seq = event.sequence + 1;
    }
    sequence_complete = sequence_complete && count_matches;

    let hashes: Vec<String> = events.iter().map(|p| p.event.hash().to_string()).collect();
    let merkle_valid = match MerkleTree::build(&proof.hash_chain.algorithm, &hashes) {
        Ok(tree) => {
            let root = tree.root();
            let matches = root == proof.merkle_root;
            if !matches {
                issues.push(DetectedIssue {
                    issue_type: IssueType::MerkleMismatch,
                    event_id: None,
                    sequence_number: None,
                    expected: Some(proof.merkle_root.clone()),
                    actual: Some(root),
                });
            }
            matches
        }
        Err(e) => {
            issues.push(DetectedIssue {
                issue_type: IssueType::MerkleMismatch,
                event_id: None,
                sequence_number: None,
                expected: Some(proof.merkle_root.clone()),
                actual: Some(format!("tree construction failed: {e}")),
            });
            false
        }
    };

    let status = classify(issues.is_empty(), &[hash_chain_valid, merkle_valid, sequence_complete]);

    VerificationResult {
        verification_id: Uuid::new_v4(),
        verified_at: clock.now(),
        status,
        hash_chain_valid,
        merkle_valid,
        sequence_complete,
        state_replay_valid: None,
        issues,
        total_events_verified: events.len(),
    }
}

/// Runs `replayer` over `events` and compares the derived state to
/// `expected`. The core never depends on the derived type beyond equality —
/// it only needs to know whether replay reproduced what the caller expected.
pub fn replay_and_compare<S: PartialEq>(
    replayer: &dyn Replayer<S>,
    events: &[PersistedEvent],
    expected: &S,
) -> (bool, Option<DetectedIssue>) {
    let derived = replayer.replay(events);
    if &derived == expected {
        (true, None)
    } else {
        (
            false,
            Some(DetectedIssue {
                issue_type: IssueType::StateMismatch,
                event_id: None,
                sequence_number: None,
                expected: None,
                actual: None,
            }),
        )
    }
}

/// Folds a state-replay check into an already-computed [`VerificationResult`],
/// recomputing its status over the now-four-check set.
pub fn apply_state_replay(mut result: VerificationResult, valid: bool, mismatch: Option<DetectedIssue>) -> VerificationResult {
    result.state_replay_valid = Some(valid);
    if let Some(issue) = mismatch {
        result.issues.push(issue);
    }
    result.status =
        classify(result.issues.is_empty(), &[result.hash_chain_valid, result.merkle_valid, result.sequence_complete, valid]);
    result
}
