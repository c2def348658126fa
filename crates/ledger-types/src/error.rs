//! Error taxonomy shared by every component of the governance ledger.
//!
//! Each fallible construction or encoding step returns `LedgerTypeResult<T>`.
//! Variants carry enough context (offending value, expected form) that a
//! caller never needs to parse an error message to act on it — this is a
//! constitutional violation in nature: an invariant was broken during
//! construction, unrecoverable at the source.

use thiserror::Error;

/// Errors raised while constructing or encoding the immutable event types.
#[derive(Debug, Error)]
pub enum LedgerTypeError {
    /// `event_type` did not match `^[a-z]+\.[a-z]+\.[a-z_]+$`.
    #[error("malformed event type '{event_type}': must match branch.noun.verb")]
    MalformedEventType { event_type: String },

    /// `actor_id` or `trace_id` was empty.
    #[error("{field} must be a non-empty string")]
    EmptyField { field: &'static str },

    /// `schema_version` was not three dot-separated non-negative integers.
    #[error("malformed schema_version '{schema_version}': expected dotted triple (e.g. 1.0.0)")]
    MalformedSchemaVersion { schema_version: String },

    /// A payload value was not representable in canonical JSON (e.g. `NaN`).
    #[error("non-finite float encountered while canonicalizing payload")]
    NonFiniteFloat,

    /// A hash string did not match `^(blake3|sha256):[0-9a-f]{64}$`.
    #[error("malformed hash string '{hash}': expected '<algo>:<64 lowercase hex>'")]
    MalformedHash { hash: String },

    /// An algorithm name outside `{blake3, sha256}` was requested.
    #[error("unsupported hash algorithm '{algorithm}'")]
    UnsupportedAlgorithm { algorithm: String },

    /// An event that already carries a hash was asked to be re-hashed.
    #[error("event {event_id} already has a hash; events are hashed exactly once")]
    AlreadyHashed { event_id: uuid::Uuid },
}

pub type LedgerTypeResult<T> = Result<T, LedgerTypeError>;
