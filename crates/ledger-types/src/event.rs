//! The event envelope: `EventMetadata`, `GovernanceEvent`, and the
//! `PersistedEvent` a ledger hands back once it has assigned a sequence.
//!
//! Every field is validated at construction; once built, neither struct
//! exposes a `&mut self` method, so the only way to "change" an event is to
//! construct a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerTypeError, LedgerTypeResult};
use crate::event_types::{derive_branch, validate_event_type};
use crate::hash::DEFAULT_ALGORITHM;

pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Validates a dotted triple of non-negative integers (e.g. `1.0.0`).
pub fn validate_schema_version(schema_version: &str) -> LedgerTypeResult<()> {
    let parts: Vec<&str> = schema_version.split('.').collect();
    let ok = parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if ok {
        Ok(())
    } else {
        Err(LedgerTypeError::MalformedSchemaVersion {
            schema_version: schema_version.to_string(),
        })
    }
}

/// Immutable metadata attached to every governance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub schema_version: String,
    pub trace_id: String,
    /// Algorithm-tagged hash of the predecessor event; empty until hashed.
    pub prev_hash: String,
    /// Algorithm-tagged hash of this event; empty until hashed.
    pub hash: String,
}

impl EventMetadata {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_id: Uuid,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor_id: impl Into<String>,
        schema_version: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> LedgerTypeResult<Self> {
        let event_type = event_type.into();
        let actor_id = actor_id.into();
        let schema_version = schema_version.into();
        let trace_id = trace_id.into();

        validate_event_type(&event_type, false)?;
        if actor_id.is_empty() {
            return Err(LedgerTypeError::EmptyField { field: "actor_id" });
        }
        if trace_id.is_empty() {
            return Err(LedgerTypeError::EmptyField { field: "trace_id" });
        }
        validate_schema_version(&schema_version)?;

        Ok(Self {
            event_id,
            event_type,
            timestamp,
            actor_id,
            schema_version,
            trace_id,
            prev_hash: String::new(),
            hash: String::new(),
        })
    }

    /// First segment of `event_type`, derived fresh every time rather than
    /// cached, so it can never drift from the validated `event_type`.
    pub fn branch(&self) -> &str {
        derive_branch(&self.event_type)
    }

    pub fn has_hash(&self) -> bool {
        !self.prev_hash.is_empty() && !self.hash.is_empty()
    }

    /// A copy of this metadata with `prev_hash`/`hash` set. Guards against
    /// re-hashing an already-hashed event.
    pub fn with_hash(&self, prev_hash: String, hash: String) -> LedgerTypeResult<Self> {
        if self.has_hash() {
            return Err(LedgerTypeError::AlreadyHashed {
                event_id: self.event_id,
            });
        }
        Ok(Self {
            prev_hash,
            hash,
            ..self.clone()
        })
    }

    /// A JSON map of this metadata with the `hash` field removed — this is
    /// exactly the dictionary the hash chain hashes alongside the
    /// payload (`prev_hash` stays present; `hash` would be self-referential).
    pub fn to_hashable_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event_id": self.event_id.to_string(),
            "event_type": self.event_type,
            "timestamp": self.timestamp.to_rfc3339(),
            "actor_id": self.actor_id,
            "schema_version": self.schema_version,
            "trace_id": self.trace_id,
            "prev_hash": self.prev_hash,
        })
    }
}

/// An immutable `(metadata, payload)` pair. `payload` is frozen at
/// construction by virtue of being moved once into the struct and never
/// re-exposed mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceEvent {
    pub metadata: EventMetadata,
    pub payload: serde_json::Value,
}

impl GovernanceEvent {
    /// Constructs an event with empty hash fields (not yet chained).
    pub fn create(
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
        actor_id: impl Into<String>,
        trace_id: impl Into<String>,
        payload: serde_json::Value,
        schema_version: impl Into<String>,
    ) -> LedgerTypeResult<Self> {
        let metadata = EventMetadata::new(
            Uuid::new_v4(),
            event_type,
            timestamp,
            actor_id,
            schema_version,
            trace_id,
        )?;
        Ok(Self { metadata, payload })
    }

    pub fn event_id(&self) -> Uuid {
        self.metadata.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.metadata.event_type
    }

    pub fn branch(&self) -> &str {
        self.metadata.branch()
    }

    pub fn actor_id(&self) -> &str {
        &self.metadata.actor_id
    }

    pub fn trace_id(&self) -> &str {
        &self.metadata.trace_id
    }

    pub fn prev_hash(&self) -> &str {
        &self.metadata.prev_hash
    }

    pub fn hash(&self) -> &str {
        &self.metadata.hash
    }

    pub fn has_hash(&self) -> bool {
        self.metadata.has_hash()
    }

    /// Returns a copy of this event with hash fields populated, computed by
    /// the caller (typically `ledger_audit::chain::hash_event`).
    pub fn with_hash(&self, prev_hash: String, hash: String) -> LedgerTypeResult<Self> {
        Ok(Self {
            metadata: self.metadata.with_hash(prev_hash, hash)?,
            payload: self.payload.clone(),
        })
    }
}

/// An event plus the positive, ledger-assigned sequence number it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedEvent {
    pub event: GovernanceEvent,
    pub sequence: u64,
}

impl PersistedEvent {
    pub fn new(event: GovernanceEvent, sequence: u64) -> LedgerTypeResult<Self> {
        if sequence == 0 {
            return Err(LedgerTypeError::EmptyField { field: "sequence" });
        }
        Ok(Self { event, sequence })
    }

    pub fn event_id(&self) -> Uuid {
        self.event.event_id()
    }

    pub fn event_type(&self) -> &str {
        self.event.event_type()
    }

    pub fn branch(&self) -> &str {
        self.event.branch()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.event.metadata.timestamp
    }

    pub fn actor_id(&self) -> &str {
        self.event.actor_id()
    }
}

/// Filter/paging options for ledger reads.
#[derive(Debug, Clone)]
pub struct LedgerReadOptions {
    pub start_sequence: Option<u64>,
    pub end_sequence: Option<u64>,
    pub branch: Option<String>,
    pub event_type: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for LedgerReadOptions {
    fn default() -> Self {
        Self {
            start_sequence: None,
            end_sequence: None,
            branch: None,
            event_type: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// The default hash algorithm new events are chained under unless the
/// caller's `LedgerConfig` says otherwise.
pub fn default_algorithm() -> &'static str {
    DEFAULT_ALGORITHM
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn create_builds_unhashed_event() {
        let event = GovernanceEvent::create(
            "executive.task.activated",
            now(),
            "actor-1",
            "trace-1",
            json!({"task_id": "task-001"}),
            CURRENT_SCHEMA_VERSION,
        )
        .unwrap();
        assert!(!event.has_hash());
        assert_eq!(event.branch(), "executive");
    }

    #[test]
    fn rejects_empty_actor_id() {
        let err = GovernanceEvent::create(
            "executive.task.activated",
            now(),
            "",
            "trace-1",
            json!({}),
            CURRENT_SCHEMA_VERSION,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerTypeError::EmptyField { field: "actor_id" }));
    }

    #[test]
    fn rejects_malformed_event_type() {
        let err = GovernanceEvent::create(
            "Not Valid",
            now(),
            "actor-1",
            "trace-1",
            json!({}),
            CURRENT_SCHEMA_VERSION,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerTypeError::MalformedEventType { .. }));
    }

    #[test]
    fn with_hash_guards_against_double_hashing() {
        let event = GovernanceEvent::create(
            "executive.task.activated",
            now(),
            "actor-1",
            "trace-1",
            json!({}),
            CURRENT_SCHEMA_VERSION,
        )
        .unwrap();
        let hashed = event.with_hash("blake3:genesis".into(), "blake3:abc".into()).unwrap();
        assert!(hashed.with_hash("blake3:x".into(), "blake3:y".into()).is_err());
    }

    #[test]
    fn persisted_event_rejects_zero_sequence() {
        let event = GovernanceEvent::create(
            "executive.task.activated",
            now(),
            "actor-1",
            "trace-1",
            json!({}),
            CURRENT_SCHEMA_VERSION,
        )
        .unwrap();
        assert!(PersistedEvent::new(event, 0).is_err());
    }

    #[test]
    fn schema_version_validation() {
        assert!(validate_schema_version("1.0.0").is_ok());
        assert!(validate_schema_version("1.0").is_err());
        assert!(validate_schema_version("1.a.0").is_err());
    }
}
