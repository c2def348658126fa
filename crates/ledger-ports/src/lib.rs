//! # ledger-ports
//!
//! The trust boundary between the governance event ledger's core logic and
//! everything that stores, schedules, or observes it. Every capability a
//! component needs — reading the ledger, appending to it, knowing the time,
//! replaying history, emitting a synthetic event — is its own narrow trait.
//! Concrete backends (an in-memory map for tests, a database adapter in
//! production) implement these traits; no component here depends on a
//! concrete implementation.

pub mod traits;

pub use traits::{
    AppendError, AppendResult, Clock, EventEmitter, LedgerAppend, LedgerRead, Replayer,
    SystemClock,
};
