//! # ledger-validate
//!
//! Write-time validators for the governance event ledger: event type,
//! actor, state transition, and hash chain, run fail-fast in strict cost
//! order so a rejected event never reaches storage.
//!
//! [`pipeline::ValidatedLedger`] composes the four gates with any
//! `ledger_ports::LedgerAppend` backend:
//!
//! ```rust,ignore
//! use ledger_audit::memory::InMemoryLedger;
//! use ledger_validate::actor::ActorRegistry;
//! use ledger_validate::pipeline::ValidatedLedger;
//!
//! let actors = ActorRegistry::with_actors(["actor-1"]);
//! let ledger = ValidatedLedger::new(InMemoryLedger::new(), actors, "blake3", true);
//! let persisted = ledger.append(event)?;
//! ```

pub mod actor;
pub mod error;
pub mod event_type;
pub mod hash_chain;
pub mod pipeline;
pub mod state_transition;

pub use actor::ActorRegistry;
pub use error::{ValidationError, ValidationResult};
pub use pipeline::{BypassFlags, ValidatedLedger};
