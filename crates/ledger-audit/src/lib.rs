//! # ledger-audit
//!
//! Hash-chain primitives and the in-memory append-only ledger backend
//! for the governance event ledger.
//!
//! ## Overview
//!
//! Every event links to its predecessor via an algorithm-tagged hash of
//! `canonical(metadata_without_hash) ‖ canonical(payload)`. Tampering with any
//! event — even a single byte of its payload — breaks its self-hash;
//! replacing an event with a different one breaks the next event's chain
//! link. [`chain::verify_event`] distinguishes the two. [`memory::InMemoryLedger`]
//! is the reference backend implementing `ledger_ports::{LedgerRead,
//! LedgerAppend}`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_audit::chain::chain_events;
//! use ledger_audit::memory::InMemoryLedger;
//! use ledger_ports::LedgerAppend;
//!
//! let ledger = InMemoryLedger::new();
//! let events = chain_events(vec![event], "blake3")?;
//! for event in events {
//!     ledger.append(event)?;
//! }
//! ```

pub mod chain;
pub mod memory;

pub use chain::{chain_events, compute_event_hash, verify_chain, verify_event, ChainVerification};
pub use memory::InMemoryLedger;
