//! Ledger export format and import.
//!
//! A self-describing JSON document: enough for a verifier with no access to
//! the live ledger to independently confirm hash-chain and Merkle
//! completeness — see [`crate::independent::verify_completeness`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ledger_audit::chain::{genesis_policy_ok, verify_chain};
use ledger_ports::LedgerRead;
use ledger_types::event::{EventMetadata, GovernanceEvent, PersistedEvent};
use ledger_types::hash::genesis_marker;

use crate::completeness::read_all;
use crate::error::{ProofError, ProofResult};

pub const FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub format_version: String,
    pub total_events: usize,
    pub genesis_hash: String,
    pub latest_hash: String,
    pub sequence_range: (u64, u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedEvent {
    pub sequence: u64,
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub schema_version: String,
    pub trace_id: String,
    pub prev_hash: String,
    pub hash: String,
    pub payload: serde_json::Value,
}

impl From<&PersistedEvent> for ExportedEvent {
    fn from(persisted: &PersistedEvent) -> Self {
        let metadata = &persisted.event.metadata;
        Self {
            sequence: persisted.sequence,
            event_id: metadata.event_id,
            event_type: metadata.event_type.clone(),
            timestamp: metadata.timestamp,
            actor_id: metadata.actor_id.clone(),
            schema_version: metadata.schema_version.clone(),
            trace_id: metadata.trace_id.clone(),
            prev_hash: metadata.prev_hash.clone(),
            hash: metadata.hash.clone(),
            payload: persisted.event.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationInfo {
    pub hash_algorithm: String,
    pub chain_valid: bool,
    pub genesis_to_latest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerExport {
    pub metadata: ExportMetadata,
    pub events: Vec<ExportedEvent>,
    pub verification: VerificationInfo,
}

/// Exports the whole of `backend` as a self-describing JSON document.
pub fn export_ledger(backend: &impl LedgerRead, algorithm: &str, exported_at: DateTime<Utc>) -> LedgerExport {
    let events = read_all(backend);
    let chain_valid = verify_chain(&events.iter().map(|p| p.event.clone()).collect::<Vec<_>>());
    let genesis_to_latest =
        chain_valid && events.first().map(|e| genesis_policy_ok(e.event.prev_hash())).unwrap_or(true);

    let sentinel = genesis_marker(algorithm);
    let genesis_hash = events.first().map(|e| e.event.prev_hash().to_string()).unwrap_or_else(|| sentinel.clone());
    let latest_hash = events.last().map(|e| e.event.hash().to_string()).unwrap_or(sentinel);
    let sequence_range = (
        events.first().map(|e| e.sequence).unwrap_or(0),
        events.last().map(|e| e.sequence).unwrap_or(0),
    );

    LedgerExport {
        metadata: ExportMetadata {
            export_id: Uuid::new_v4(),
            exported_at,
            format_version: FORMAT_VERSION.to_string(),
            total_events: events.len(),
            genesis_hash,
            latest_hash,
            sequence_range,
        },
        events: events.iter().map(ExportedEvent::from).collect(),
        verification: VerificationInfo { hash_algorithm: algorithm.to_string(), chain_valid, genesis_to_latest },
    }
}

/// Reconstructs [`PersistedEvent`]s from an export for independent
/// verification. Reconstructing through [`EventMetadata::new`] would
/// re-validate and strip the hash fields, so this builds the struct directly
/// from already-validated exported data instead.
pub fn to_persisted_events(export: &LedgerExport) -> ProofResult<Vec<PersistedEvent>> {
    export
        .events
        .iter()
        .map(|exported| {
            let metadata = EventMetadata::new(
                exported.event_id,
                exported.event_type.clone(),
                exported.timestamp,
                exported.actor_id.clone(),
                exported.schema_version.clone(),
                exported.trace_id.clone(),
            )
            .map_err(|e| ProofError::MalformedExport { reason: e.to_string() })?;
            let hashed = metadata
                .with_hash(exported.prev_hash.clone(), exported.hash.clone())
                .map_err(|e| ProofError::MalformedExport { reason: e.to_string() })?;
            let event = GovernanceEvent { metadata: hashed, payload: exported.payload.clone() };
            PersistedEvent::new(event, exported.sequence).map_err(|e| ProofError::MalformedExport { reason: e.to_string() })
        })
        .collect()
}
