//! Validator #2: actor (≤ 3 ms budget).
//!
//! A registry of known actor identifiers. Membership, not format, is what's
//! checked — `actor_id` non-emptiness is already enforced by `EventMetadata::
//! new` at construction time.

use std::collections::HashSet;

use ledger_types::event::GovernanceEvent;

use crate::error::{ValidationError, ValidationResult};

/// The set of actor identifiers permitted to write to the ledger.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    known: HashSet<String>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actors<I, S>(actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: actors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn register(&mut self, actor_id: impl Into<String>) {
        self.known.insert(actor_id.into());
    }

    pub fn contains(&self, actor_id: &str) -> bool {
        self.known.contains(actor_id)
    }
}

pub fn validate(event: &GovernanceEvent, registry: &ActorRegistry) -> ValidationResult<()> {
    if registry.contains(event.actor_id()) {
        Ok(())
    } else {
        Err(ValidationError::UnknownActor {
            event_id: event.event_id(),
            actor_id: event.actor_id().to_string(),
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

    fn event(actor_id: &str) -> GovernanceEvent {
        GovernanceEvent::create(
            "executive.task.activated",
            now(),
            actor_id,
            "trace-1",
            json!({}),
            "1.0.0",
        )
        .unwrap()
    }

    #[test]
    fn registered_actor_passes() {
        let registry = ActorRegistry::with_actors(["registered-actor"]);
        assert!(validate(&event("registered-actor"), &registry).is_ok());
    }

    #[test]
    fn unregistered_actor_rejected() {
        let registry = ActorRegistry::with_actors(["registered-actor"]);
        let err = validate(&event("ghost"), &registry).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownActor { .. }));
    }
}
