//! Capability-set port traits ("polymorphism via capability sets, not
//! inheritance"). Components are described by the operations they require —
//! ledger-read, ledger-append, time-now, replay, event-emit — rather than by
//! a class hierarchy. Concrete backends (an in-memory map, a database
//! adapter) implement these traits; tests inject fakes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use ledger_types::event::{GovernanceEvent, LedgerReadOptions, PersistedEvent};

/// Raised when the storage layer itself cannot accept a write. Distinct from
/// write-time *validation* errors (`ledger_validate::ValidationError`), which
/// are raised before this port is ever called — a rejected event never
/// reaches `append`.
#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error("ledger backend unavailable: {reason}")]
    BackendUnavailable { reason: String },
}

pub type AppendResult<T> = Result<T, AppendError>;

/// Read-only half of the append-only ledger port.
///
/// No method on this trait, or on [`LedgerAppend`], can mutate or remove a
/// previously persisted event — that absence is itself part of the safety
/// argument. See `tests::no_mutating_method_names` for the structural
/// check that keeps this honest.
pub trait LedgerRead: Send + Sync {
    /// The most recently appended event, or `None` on an empty ledger.
    fn latest(&self) -> Option<PersistedEvent>;

    /// The highest assigned sequence, or `0` on an empty ledger.
    fn max_sequence(&self) -> u64;

    /// Events matching `options`, ordered by sequence ascending. Filters
    /// combine with AND; `limit`/`offset` apply after filtering.
    fn read(&self, options: &LedgerReadOptions) -> Vec<PersistedEvent>;

    fn by_sequence(&self, sequence: u64) -> Option<PersistedEvent>;

    fn by_id(&self, event_id: Uuid) -> Option<PersistedEvent>;

    /// Count of events matching `options`, ignoring `limit`/`offset`.
    fn count(&self, options: &LedgerReadOptions) -> usize;
}

/// Write half of the port. `append` is the only way a new event enters
/// the ledger; sequence assignment is the backend's responsibility and must
/// be serialized so concurrent appenders never share or skip a sequence.
pub trait LedgerAppend: LedgerRead {
    fn append(&self, event: GovernanceEvent) -> AppendResult<PersistedEvent>;
}

/// Injected wall-clock time: the core never reads the system clock directly.
/// Every timestamp that enters an event is read through this capability, not
/// `Utc::now()` called directly, so tests can pin time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production [`Clock`], backed by the system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The narrow capability a detector or two-phase emitter needs: append a
/// synthetic event without also requiring read access. Any [`LedgerAppend`]
/// implementation satisfies this for free.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: GovernanceEvent) -> AppendResult<PersistedEvent>;
}

impl<T: LedgerAppend + ?Sized> EventEmitter for T {
    fn emit(&self, event: GovernanceEvent) -> AppendResult<PersistedEvent> {
        self.append(event)
    }
}

/// C11's replay port: given an ordered event list, derive a caller-defined
/// state `S`. The core only calls this to confirm deterministic state
/// derivation during independent verification; it never depends on `S`
/// otherwise.
pub trait Replayer<S> {
    fn replay(&self, events: &[PersistedEvent]) -> S;
}

#[cfg(test)]
mod tests {
    /// The ledger ports provide no mutating methods, and this asserts it
    /// structurally. Rust has no runtime reflection over trait members, so
    /// this is a hand-maintained list of every public method on
    /// `LedgerRead` and `LedgerAppend`, checked against a forbidden-name set.
    #[test]
    fn no_mutating_method_names() {
        const FORBIDDEN: &[&str] = &[
            "update", "delete", "modify", "remove", "clear", "truncate", "purge",
        ];
        const LEDGER_READ_METHODS: &[&str] =
            &["latest", "max_sequence", "read", "by_sequence", "by_id", "count"];
        const LEDGER_APPEND_METHODS: &[&str] = &["append"];

        for name in LEDGER_READ_METHODS.iter().chain(LEDGER_APPEND_METHODS) {
            for forbidden in FORBIDDEN {
                assert!(
                    !name.contains(forbidden),
                    "port method '{name}' contains forbidden substring '{forbidden}'"
                );
            }
        }
    }
}
