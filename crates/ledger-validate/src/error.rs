//! Write-time validation errors.
//!
//! Every variant carries the offending `event_id` plus enough structured
//! context — expected vs. actual, allowed successors, a suggestion — for a
//! human to act on without re-deriving it from a string.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("event {event_id}: unknown event type '{event_type}'{}", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownEventType {
        event_id: Uuid,
        event_type: String,
        suggestion: Option<String>,
    },

    #[error("event {event_id}: unknown actor '{actor_id}'")]
    UnknownActor { event_id: Uuid, actor_id: String },

    #[error(
        "event {event_id}: illegal state transition for {aggregate_type} '{aggregate_id}': \
         '{current}' has no transition to '{attempted}' (allowed: {allowed:?})"
    )]
    IllegalStateTransition {
        event_id: Uuid,
        aggregate_type: String,
        aggregate_id: String,
        current: String,
        attempted: String,
        allowed: Vec<String>,
    },

    #[error(
        "event {event_id}: hash chain break: expected prev_hash '{expected_prev}', got \
         '{actual_prev}' (latest sequence {latest_sequence})"
    )]
    HashChainBreak {
        event_id: Uuid,
        expected_prev: String,
        actual_prev: String,
        latest_sequence: u64,
    },

    #[error("event {event_id}: {reason}")]
    MalformedHash { event_id: Uuid, reason: String },

    #[error("backend rejected append: {reason}")]
    Backend { reason: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
