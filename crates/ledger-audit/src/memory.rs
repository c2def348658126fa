//! In-memory backend implementing the append-only ledger port.
//!
//! `InMemoryLedger` keeps every persisted event in a `Vec` guarded by a
//! single `Mutex`: one writer-visible critical section, safe to share
//! across threads via `Arc`.
//! It is the reference backend this workspace ships; a production backend
//! (Postgres, etc.) would implement the same `LedgerRead`/`LedgerAppend`
//! traits with the same single-writer-serialization guarantee enforced by a
//! strict-serializable transaction instead of an in-process mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use ledger_ports::{AppendError, AppendResult, LedgerAppend, LedgerRead};
use ledger_types::event::{GovernanceEvent, LedgerReadOptions, PersistedEvent};

struct State {
    events: Vec<PersistedEvent>,
    by_id: HashMap<Uuid, usize>,
}

impl State {
    fn new() -> Self {
        Self { events: Vec::new(), by_id: HashMap::new() }
    }
}

/// The reference append-only ledger backend. Holds events in memory only —
/// nothing here persists across process restarts, which is intentional for
/// tests and the demo CLI.
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::new()) }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerRead for InMemoryLedger {
    fn latest(&self) -> Option<PersistedEvent> {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state.events.last().cloned()
    }

    fn max_sequence(&self) -> u64 {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state.events.last().map(|e| e.sequence).unwrap_or(0)
    }

    fn read(&self, options: &LedgerReadOptions) -> Vec<PersistedEvent> {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state
            .events
            .iter()
            .filter(|p| matches(p, options))
            .skip(options.offset)
            .take(options.limit)
            .cloned()
            .collect()
    }

    fn by_sequence(&self, sequence: u64) -> Option<PersistedEvent> {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state.events.iter().find(|p| p.sequence == sequence).cloned()
    }

    fn by_id(&self, event_id: Uuid) -> Option<PersistedEvent> {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state.by_id.get(&event_id).map(|&idx| state.events[idx].clone())
    }

    fn count(&self, options: &LedgerReadOptions) -> usize {
        let state = self.state.lock().expect("ledger state lock poisoned");
        state.events.iter().filter(|p| matches(p, options)).count()
    }
}

impl LedgerAppend for InMemoryLedger {
    /// Appends `event` under the single critical section: the next sequence
    /// is assigned here, and no two concurrent callers can observe the same
    /// `max_sequence()` result before their own append lands.
    ///
    /// `event` is expected to already carry its final `prev_hash`/`hash` —
    /// hash attachment and write-time validation happen upstream in
    /// `ledger_validate::pipeline::ValidatedLedger`, which holds its own
    /// write lock spanning validation *and* this call so the two critical
    /// sections compose into one ("hash-chain atomicity").
    fn append(&self, event: GovernanceEvent) -> AppendResult<PersistedEvent> {
        let mut state = self.state.lock().map_err(|e| AppendError::BackendUnavailable {
            reason: format!("ledger state lock poisoned: {e}"),
        })?;

        let sequence = state.events.last().map(|e| e.sequence).unwrap_or(0) + 1;
        let persisted = PersistedEvent::new(event, sequence).map_err(|e| AppendError::BackendUnavailable {
            reason: e.to_string(),
        })?;

        debug!(
            sequence,
            event_type = persisted.event_type(),
            branch = persisted.branch(),
            "event appended"
        );

        state.by_id.insert(persisted.event_id(), state.events.len());
        state.events.push(persisted.clone());
        Ok(persisted)
    }
}

fn matches(persisted: &PersistedEvent, options: &LedgerReadOptions) -> bool {
    if let Some(start) = options.start_sequence {
        if persisted.sequence < start {
            return false;
        }
    }
    if let Some(end) = options.end_sequence {
        if persisted.sequence > end {
            return false;
        }
    }
    if let Some(branch) = &options.branch {
        if persisted.branch() != branch {
            return false;
        }
    }
    if let Some(event_type) = &options.event_type {
        if persisted.event_type() != event_type {
            return false;
        }
    }
    true
}
