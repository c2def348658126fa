//! Validator #1: event type (≤ 1 ms budget, cheapest gate, runs first).
//!
//! Strict mode rejects any `event_type` outside [`ledger_types::event_types::
//! KNOWN_EVENT_TYPES`] and attaches the closest known match, if any scores
//! above the 0.6 similarity cutoff `difflib.get_close_matches` uses upstream.

use ledger_types::event::GovernanceEvent;
use ledger_types::event_types::KNOWN_EVENT_TYPES;

use crate::error::{ValidationError, ValidationResult};

const SUGGESTION_CUTOFF: f64 = 0.6;

pub fn validate(event: &GovernanceEvent, strict: bool) -> ValidationResult<()> {
    if !strict || KNOWN_EVENT_TYPES.contains(&event.event_type()) {
        return Ok(());
    }

    Err(ValidationError::UnknownEventType {
        event_id: event.event_id(),
        event_type: event.event_type().to_string(),
        suggestion: closest_match(event.event_type()),
    })
}

/// Best catalog match for `needle` by normalized Levenshtein similarity,
/// `None` if nothing clears [`SUGGESTION_CUTOFF`].
fn closest_match(needle: &str) -> Option<String> {
    KNOWN_EVENT_TYPES
        .iter()
        .map(|candidate| (*candidate, similarity(needle, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_CUTOFF)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(candidate, _)| candidate.to_string())
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, in `[0.0, 1.0]`.
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(a, b) as f64 / max_len as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, &ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            let deletion = row[j + 1] + 1;
            let insertion = row[j] + 1;
            let substitution = prev_diag + cost;
            prev_diag = row[j + 1];
            row[j + 1] = deletion.min(insertion).min(substitution);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn event(event_type: &str) -> GovernanceEvent {
        GovernanceEvent::create(event_type, now(), "actor-1", "trace-1", json!({}), "1.0.0").unwrap()
    }

    #[test]
    fn known_type_passes_strict_mode() {
        assert!(validate(&event("executive.task.activated"), true).is_ok());
    }

    #[test]
    fn unknown_branch_passes_non_strict_mode() {
        assert!(validate(&event("executive.widget.frobnicated"), false).is_ok());
    }

    #[test]
    fn unknown_type_rejected_with_suggestion_in_strict_mode() {
        let err = validate(&event("executive.task.activatd"), true).unwrap_err();
        match err {
            ValidationError::UnknownEventType { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("executive.task.activated"));
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[test]
    fn wildly_different_type_has_no_suggestion() {
        let err = validate(&event("zzz.zzz.zzz"), true).unwrap_err();
        match err {
            ValidationError::UnknownEventType { suggestion, .. } => assert!(suggestion.is_none()),
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }
}
