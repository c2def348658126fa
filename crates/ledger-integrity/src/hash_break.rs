//! Hash-break detector (C8, first half).
//!
//! Stateless: callers pass a candidate event plus whatever predecessor and
//! expected-sequence context they have. Detection never mutates the ledger;
//! publishing the resulting `ledger.integrity.hash_break_detected` event is
//! the caller's responsibility.

use chrono::{DateTime, Utc};
use serde_json::json;

use ledger_audit::chain::verify_event;
use ledger_types::event::{GovernanceEvent, PersistedEvent};

/// The three integrity-break categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCategory {
    HashMismatch,
    ChainBreak,
    SequenceGap,
}

impl BreakCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashMismatch => "HASH_MISMATCH",
            Self::ChainBreak => "CHAIN_BREAK",
            Self::SequenceGap => "SEQUENCE_GAP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBreak {
    pub category: BreakCategory,
    pub event_id: uuid::Uuid,
    pub sequence: u64,
    pub description: String,
}

/// Checks `candidate` against `predecessor` (the event immediately before it
/// in the ledger) and `expected_sequence` (what its sequence should be if
/// the ledger has no gap at this position). Returns every break found — a
/// single event can simultaneously have a sequence gap and a broken chain
/// link.
pub fn detect(
    candidate: &PersistedEvent,
    predecessor: Option<&PersistedEvent>,
    expected_sequence: u64,
) -> Vec<DetectedBreak> {
    let mut breaks = Vec::new();

    if candidate.sequence != expected_sequence {
        breaks.push(DetectedBreak {
            category: BreakCategory::SequenceGap,
            event_id: candidate.event_id(),
            sequence: candidate.sequence,
            description: format!(
                "expected sequence {expected_sequence}, found {}",
                candidate.sequence
            ),
        });
    }

    let verification = verify_event(&candidate.event, predecessor.map(|p| &p.event));
    if !verification.event_hash_valid {
        breaks.push(DetectedBreak {
            category: BreakCategory::HashMismatch,
            event_id: candidate.event_id(),
            sequence: candidate.sequence,
            description: verification
                .error_message
                .clone()
                .unwrap_or_else(|| "self-hash mismatch".to_string()),
        });
    }
    if !verification.chain_link_valid {
        breaks.push(DetectedBreak {
            category: BreakCategory::ChainBreak,
            event_id: candidate.event_id(),
            sequence: candidate.sequence,
            description: verification.error_message.unwrap_or_else(|| "chain link broken".to_string()),
        });
    }

    breaks
}

/// Scans an ordered slice of events, collecting every break across the
/// whole sequence rather than stopping at the first (collect-all-issues
/// applies equally here: integrity monitoring must report every problem in
/// one pass).
pub fn scan(events: &[PersistedEvent]) -> Vec<DetectedBreak> {
    let mut breaks = Vec::new();
    let mut predecessor: Option<&PersistedEvent> = None;
    let mut expected = events.first().map(|e| e.sequence).unwrap_or(1);

    for event in events {
        breaks.extend(detect(event, predecessor, expected));
        expected = event.sequence + 1;
        predecessor = Some(event);
    }
    breaks
}

/// Builds the (unhashed, unappended) `ledger.integrity.hash_break_detected`
/// event for `detected`. The caller hashes and appends it like any other
/// event.
pub fn build_violation_event(
    detected: &DetectedBreak,
    timestamp: DateTime<Utc>,
    actor_id: &str,
    trace_id: &str,
) -> ledger_types::error::LedgerTypeResult<GovernanceEvent> {
    let payload = json!({
        "offending_event_id": detected.event_id.to_string(),
        "category": detected.category.as_str(),
        "sequence": detected.sequence,
        "description": detected.description,
    });
    GovernanceEvent::create(
        "ledger.integrity.hash_break_detected",
        timestamp,
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
}
