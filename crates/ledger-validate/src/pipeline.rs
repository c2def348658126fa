//! C6 orchestration: a `ValidatedLedger` wraps a `LedgerAppend` backend and
//! runs the four write-time validators, in strict cost order, before ever
//! opening a storage transaction. A rejected event never reaches the
//! backend.
//!
//! Hash-chain atomicity: validation (including the `latest()` lookup)
//! and the append itself happen inside one `Mutex<()>`-guarded critical
//! section here, composing with the backend's own internal lock so the two
//! layers together behave as a single atomic unit — no concurrent appender
//! can observe a `latest()` that changes out from under it before its
//! append lands.

use std::sync::Mutex;

use tracing::info;

use ledger_ports::{AppendResult as BackendAppendResult, LedgerAppend, LedgerRead};
use ledger_types::event::GovernanceEvent;

use crate::actor::ActorRegistry;
use crate::error::{ValidationError, ValidationResult};
use crate::state_transition::{self, AggregateTracker};
use crate::{actor, event_type, hash_chain};

/// Validator bypass flags. Every field defaults to `false`; production code
/// never sets one. `Default::default()` is the only constructor the crate
/// exposes for strict mode — bypassing is opt-in and explicit.
#[derive(Debug, Clone, Copy, Default)]
pub struct BypassFlags {
    pub event_type: bool,
    pub actor: bool,
    pub state_transition: bool,
    pub hash_chain: bool,
}

pub struct ValidatedLedger<B> {
    backend: B,
    actors: ActorRegistry,
    aggregates: AggregateTracker,
    algorithm: String,
    strict_event_types: bool,
    bypass: BypassFlags,
    write_lock: Mutex<()>,
}

impl<B: LedgerAppend> ValidatedLedger<B> {
    pub fn new(backend: B, actors: ActorRegistry, algorithm: impl Into<String>, strict_event_types: bool) -> Self {
        Self {
            backend,
            actors,
            aggregates: AggregateTracker::new(),
            algorithm: algorithm.into(),
            strict_event_types,
            bypass: BypassFlags::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Administrative/test-only constructor with explicit bypass flags.
    /// Production code never calls this.
    pub fn with_bypass(
        backend: B,
        actors: ActorRegistry,
        algorithm: impl Into<String>,
        strict_event_types: bool,
        bypass: BypassFlags,
    ) -> Self {
        Self {
            backend,
            actors,
            aggregates: AggregateTracker::new(),
            algorithm: algorithm.into(),
            strict_event_types,
            bypass,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs C6 in cost order, then hashes and appends. The single critical
    /// section spans the `latest()` read used by the hash-chain validator
    /// through the backend's own `append`.
    pub fn append(&self, event: GovernanceEvent) -> ValidationResult<ledger_types::event::PersistedEvent> {
        let _guard = self.write_lock.lock().expect("validated ledger write lock poisoned");

        if !self.bypass.event_type {
            event_type::validate(&event, self.strict_event_types)?;
        }
        if !self.bypass.actor {
            actor::validate(&event, &self.actors)?;
        }
        if !self.bypass.state_transition {
            state_transition::validate(&event, &self.aggregates)?;
        }

        let transition = state_transition::implied_transition(&event);

        let hashed = if self.bypass.hash_chain {
            event
        } else {
            let latest = self.backend.latest();
            hash_chain::validate_and_hash(event, latest.as_ref(), &self.algorithm)?
        };

        let event_type = hashed.event_type().to_string();
        let actor_id = hashed.actor_id().to_string();

        let persisted: BackendAppendResult<_> = self.backend.append(hashed);
        let persisted = persisted.map_err(|e| ValidationError::Backend { reason: e.to_string() })?;

        if let Some((aggregate_type, aggregate_id, new_state)) = transition {
            self.aggregates.record(&aggregate_type, &aggregate_id, &new_state);
        }

        info!(sequence = persisted.sequence, %event_type, %actor_id, "event validated and appended");
        Ok(persisted)
    }
}

impl<B: LedgerRead> LedgerRead for ValidatedLedger<B> {
    fn latest(&self) -> Option<ledger_types::event::PersistedEvent> {
        self.backend.latest()
    }

    fn max_sequence(&self) -> u64 {
        self.backend.max_sequence()
    }

    fn read(&self, options: &ledger_types::event::LedgerReadOptions) -> Vec<ledger_types::event::PersistedEvent> {
        self.backend.read(options)
    }

    fn by_sequence(&self, sequence: u64) -> Option<ledger_types::event::PersistedEvent> {
        self.backend.by_sequence(sequence)
    }

    fn by_id(&self, event_id: uuid::Uuid) -> Option<ledger_types::event::PersistedEvent> {
        self.backend.by_id(event_id)
    }

    fn count(&self, options: &ledger_types::event::LedgerReadOptions) -> usize {
        self.backend.count(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use ledger_audit::memory::InMemoryLedger;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn event(event_type: &str, actor: &str, payload: serde_json::Value) -> GovernanceEvent {
        GovernanceEvent::create(event_type, now(), actor, "trace-1", payload, "1.0.0").unwrap()
    }

    fn ledger() -> ValidatedLedger<InMemoryLedger> {
        let actors = ActorRegistry::with_actors(["registered-actor"]);
        ValidatedLedger::new(InMemoryLedger::new(), actors, "blake3", true)
    }

    #[test]
    fn appends_genesis_event_through_full_gate() {
        let ledger = ledger();
        let persisted = ledger
            .append(event("executive.task.authorized", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        assert_eq!(persisted.sequence, 1);
    }

    #[test]
    fn rejects_unknown_actor_before_append() {
        let ledger = ledger();
        let err = ledger
            .append(event("executive.task.authorized", "ghost", json!({"task_id": "task-1"})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownActor { .. }));
        assert_eq!(ledger.max_sequence(), 0);
    }

    #[test]
    fn rejects_illegal_state_transition_before_append() {
        let ledger = ledger();
        ledger
            .append(event("executive.task.authorized", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        ledger
            .append(event("executive.task.activated", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        ledger
            .append(event("executive.task.accepted", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        ledger
            .append(event("executive.task.completed", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();

        let err = ledger
            .append(event("executive.task.activated", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap_err();
        assert!(matches!(err, ValidationError::IllegalStateTransition { .. }));
        assert_eq!(ledger.max_sequence(), 4);
    }

    #[test]
    fn three_events_chain_and_verify() {
        let ledger = ledger();
        ledger
            .append(event("executive.task.authorized", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        ledger
            .append(event("executive.task.activated", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();
        let third = ledger
            .append(event("executive.task.accepted", "registered-actor", json!({"task_id": "task-1"})))
            .unwrap();

        assert_eq!(third.sequence, 3);
        let all: Vec<_> = ledger.read(&Default::default()).into_iter().map(|p| p.event).collect();
        assert!(ledger_audit::chain::verify_chain(&all));
    }
}
