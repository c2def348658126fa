//! Validator #3: state transition (≤ 10 ms budget).
//!
//! Two state machines are tracked here: `task` and `legitimacy_band`. Each
//! is an immutable map from a state to its legal successor states. An event
//! only touches a state machine if its `event_type` appears in
//! [`AGGREGATE_MAPPINGS`]; events outside the mapping are ignored by this
//! validator (not an error — most event types carry no aggregate-state
//! meaning).

use std::collections::HashMap;
use std::sync::Mutex;

use ledger_types::event::GovernanceEvent;

use crate::error::{ValidationError, ValidationResult};

/// `event_type -> (aggregate_type, id_field, resulting_state)`. An empty
/// `resulting_state` means: read the new state from the payload field named
/// by the fourth element instead of from the event type itself.
pub struct AggregateMapping {
    pub event_type: &'static str,
    pub aggregate_type: &'static str,
    pub id_field: &'static str,
    pub resulting_state: &'static str,
    pub resulting_state_field: &'static str,
}

pub const AGGREGATE_MAPPINGS: &[AggregateMapping] = &[
    AggregateMapping { event_type: "executive.task.authorized", aggregate_type: "task", id_field: "task_id", resulting_state: "authorized", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.activated", aggregate_type: "task", id_field: "task_id", resulting_state: "activated", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.accepted", aggregate_type: "task", id_field: "task_id", resulting_state: "accepted", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.declined", aggregate_type: "task", id_field: "task_id", resulting_state: "declined", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.completed", aggregate_type: "task", id_field: "task_id", resulting_state: "completed", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.expired", aggregate_type: "task", id_field: "task_id", resulting_state: "expired", resulting_state_field: "" },
    AggregateMapping { event_type: "executive.task.cancelled", aggregate_type: "task", id_field: "task_id", resulting_state: "cancelled", resulting_state_field: "" },
    AggregateMapping { event_type: "legitimacy.band.restored", aggregate_type: "legitimacy_band", id_field: "entity_id", resulting_state: "", resulting_state_field: "new_band" },
    AggregateMapping { event_type: "legitimacy.band.decayed", aggregate_type: "legitimacy_band", id_field: "entity_id", resulting_state: "", resulting_state_field: "new_band" },
];

fn mapping_for(event_type: &str) -> Option<&'static AggregateMapping> {
    AGGREGATE_MAPPINGS.iter().find(|m| m.event_type == event_type)
}

/// `state -> successors`, task machine. Absent key or empty slice
/// means terminal.
fn task_transitions(state: &str) -> &'static [&'static str] {
    match state {
        "pending" => &["authorized", "cancelled"],
        "authorized" => &["activated", "expired", "cancelled"],
        "activated" => &["accepted", "declined", "expired"],
        "accepted" => &["completed", "expired"],
        _ => &[],
    }
}

fn legitimacy_transitions(state: &str) -> &'static [&'static str] {
    match state {
        "full" => &["provisional"],
        "provisional" => &["full", "suspended"],
        "suspended" => &["provisional", "revoked"],
        "revoked" => &["suspended"],
        _ => &[],
    }
}

fn transitions_for(aggregate_type: &str, state: &str) -> &'static [&'static str] {
    match aggregate_type {
        "task" => task_transitions(state),
        "legitimacy_band" => legitimacy_transitions(state),
        _ => &[],
    }
}

fn initial_state(aggregate_type: &str) -> &'static str {
    match aggregate_type {
        "task" => "pending",
        "legitimacy_band" => "full",
        _ => "",
    }
}

/// Tracks the current state of every aggregate this validator has seen. A
/// real backend would derive this by replaying the ledger on startup; the
/// in-process tracker here is updated incrementally as events are validated
/// and appended (see `pipeline::ValidatedLedger`).
#[derive(Debug, Default)]
pub struct AggregateTracker {
    states: Mutex<HashMap<(String, String), String>>,
}

impl AggregateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self, aggregate_type: &str, aggregate_id: &str) -> String {
        let states = self.states.lock().expect("aggregate tracker lock poisoned");
        states
            .get(&(aggregate_type.to_string(), aggregate_id.to_string()))
            .cloned()
            .unwrap_or_else(|| initial_state(aggregate_type).to_string())
    }

    /// Records `new_state` as current for `(aggregate_type, aggregate_id)`.
    /// Call only after the event has been durably appended.
    pub fn record(&self, aggregate_type: &str, aggregate_id: &str, new_state: &str) {
        let mut states = self.states.lock().expect("aggregate tracker lock poisoned");
        states.insert((aggregate_type.to_string(), aggregate_id.to_string()), new_state.to_string());
    }
}

/// The aggregate transition implied by `event`, if its `event_type` is in
/// [`AGGREGATE_MAPPINGS`]: `(aggregate_type, aggregate_id, new_state)`. Used
/// by the pipeline to call [`AggregateTracker::record`] after a successful
/// append.
pub fn implied_transition(event: &GovernanceEvent) -> Option<(String, String, String)> {
    let mapping = mapping_for(event.event_type())?;
    let aggregate_id = event.payload.get(mapping.id_field)?.as_str()?.to_string();
    let new_state = if mapping.resulting_state.is_empty() {
        event.payload.get(mapping.resulting_state_field)?.as_str()?.to_string()
    } else {
        mapping.resulting_state.to_string()
    };
    Some((mapping.aggregate_type.to_string(), aggregate_id, new_state))
}

pub fn validate(event: &GovernanceEvent, tracker: &AggregateTracker) -> ValidationResult<()> {
    let Some((aggregate_type, aggregate_id, attempted)) = implied_transition(event) else {
        return Ok(());
    };

    let current = tracker.current(&aggregate_type, &aggregate_id);
    let allowed = transitions_for(&aggregate_type, &current);

    if allowed.contains(&attempted.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::IllegalStateTransition {
            event_id: event.event_id(),
            aggregate_type,
            aggregate_id,
            current,
            attempted,
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
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

    fn task_event(event_type: &str, task_id: &str) -> GovernanceEvent {
        GovernanceEvent::create(event_type, now(), "actor-1", "trace-1", json!({"task_id": task_id}), "1.0.0").unwrap()
    }

    #[test]
    fn new_aggregate_starts_at_initial_state() {
        let tracker = AggregateTracker::new();
        assert!(validate(&task_event("executive.task.authorized", "task-1"), &tracker).is_ok());
    }

    #[test]
    fn legal_chain_of_transitions() {
        let tracker = AggregateTracker::new();
        for event_type in [
            "executive.task.authorized",
            "executive.task.activated",
            "executive.task.accepted",
            "executive.task.completed",
        ] {
            let event = task_event(event_type, "task-1");
            validate(&event, &tracker).unwrap();
            let (aggregate_type, aggregate_id, new_state) = implied_transition(&event).unwrap();
            tracker.record(&aggregate_type, &aggregate_id, &new_state);
        }
    }

    #[test]
    fn illegal_transition_from_terminal_state_rejected() {
        let tracker = AggregateTracker::new();
        tracker.record("task", "task-123", "completed");
        let err = validate(&task_event("executive.task.activated", "task-123"), &tracker).unwrap_err();
        match err {
            ValidationError::IllegalStateTransition { current, attempted, allowed, .. } => {
                assert_eq!(current, "completed");
                assert_eq!(attempted, "activated");
                assert!(allowed.is_empty());
            }
            other => panic!("expected IllegalStateTransition, got {other:?}"),
        }
    }

    #[test]
    fn events_outside_mapping_are_ignored() {
        let tracker = AggregateTracker::new();
        let event = GovernanceEvent::create(
            "witness.observation.recorded",
            now(),
            "actor-1",
            "trace-1",
            json!({}),
            "1.0.0",
        )
        .unwrap();
        assert!(validate(&event, &tracker).is_ok());
    }

    #[test]
    fn legitimacy_band_reads_resulting_state_from_payload() {
        let tracker = AggregateTracker::new();
        let event = GovernanceEvent::create(
            "legitimacy.band.decayed",
            now(),
            "actor-1",
            "trace-1",
            json!({"entity_id": "entity-1", "new_band": "provisional"}),
            "1.0.0",
        )
        .unwrap();
        assert!(validate(&event, &tracker).is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const TASK_STATES: &[&str] = &["pending", "authorized", "activated", "accepted", "declined", "completed", "expired", "cancelled"];
    const BAND_STATES: &[&str] = &["full", "provisional", "suspended", "revoked"];

    // Only states reachable as an *attempted* transition have a
    // corresponding event type in `AGGREGATE_MAPPINGS` ("pending" is the
    // task machine's initial state only, never an explicit event).
    const ATTEMPTABLE_TASK_STATES: &[&str] = &["authorized", "activated", "accepted", "declined", "completed", "expired", "cancelled"];

    fn task_event_named(attempted_state: &str, task_id: &str) -> GovernanceEvent {
        let event_type = format!("executive.task.{attempted_state}");
        task_event(&event_type, task_id)
    }

    /// Drives a random walk over the task machine, at each step picking
    /// uniformly among the successors `transitions_for` declares legal for
    /// the current state, and submitting that transition to `validate`.
    /// Every step must be accepted and the tracker's recorded state must
    /// always equal the walk's current state; the walk stops early if it
    /// reaches a terminal state.
    fn walk_task_machine(picks: &[usize]) -> Result<(), TestCaseError> {
        let tracker = AggregateTracker::new();
        let mut current = initial_state("task").to_string();

        for &pick in picks {
            let successors = transitions_for("task", &current);
            if successors.is_empty() {
                break;
            }
            let next = successors[pick % successors.len()];
            let event = task_event_named(next, "walker");

            prop_assert!(validate(&event, &tracker).is_ok());
            tracker.record("task", "walker", next);
            current = next.to_string();
            prop_assert_eq!(tracker.current("task", "walker"), current.clone());
        }
        Ok(())
    }

    proptest! {
        /// A random walk that only ever takes declared-legal task
        /// transitions is accepted at every step.
        #[test]
        fn legal_random_walk_always_accepted(picks in prop::collection::vec(0usize..8, 0..20)) {
            walk_task_machine(&picks)?;
        }

        /// `validate` agrees with `transitions_for` for every (current,
        /// attempted) pair of the task machine: accepted iff declared legal.
        #[test]
        fn validate_matches_transitions_for_every_task_state_pair(
            task_state_idx in 0usize..TASK_STATES.len(),
            attempt_idx in 0usize..ATTEMPTABLE_TASK_STATES.len(),
        ) {
            let current = TASK_STATES[task_state_idx];
            let attempted = ATTEMPTABLE_TASK_STATES[attempt_idx];

            let tracker = AggregateTracker::new();
            tracker.record("task", "walker", current);
            let event = task_event_named(attempted, "walker");

            let result = validate(&event, &tracker);
            let declared_legal = transitions_for("task", current).contains(&attempted);
            prop_assert_eq!(result.is_ok(), declared_legal);
        }

        #[test]
        fn validate_matches_transitions_for_every_band_state_pair(
            band_state_idx in 0usize..BAND_STATES.len(),
            attempt_idx in 0usize..BAND_STATES.len(),
        ) {
            let current = BAND_STATES[band_state_idx];
            let attempted = BAND_STATES[attempt_idx];

            let tracker = AggregateTracker::new();
            tracker.record("legitimacy_band", "walker", current);
            let event = GovernanceEvent::create(
                "legitimacy.band.decayed",
                now(),
                "actor-1",
                "trace-1",
                json!({"entity_id": "walker", "new_band": attempted}),
                "1.0.0",
            )
            .unwrap();

            let result = validate(&event, &tracker);
            let declared_legal = transitions_for("legitimacy_band", current).contains(&attempted);
            prop_assert_eq!(result.is_ok(), declared_legal);
        }
    }
}
