//! Epoch boundary detection, tree construction, and root publication.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use ledger_audit::chain::compute_event_hash;
use ledger_ports::{Clock, LedgerAppend, LedgerRead};
use ledger_types::config::LedgerConfig;
use ledger_types::event::{GovernanceEvent, LedgerReadOptions};

use crate::error::{MerkleError, MerkleResult};
use crate::tree::MerkleTree;

/// A built, published-or-not epoch record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epoch {
    pub epoch_id: u64,
    pub root_hash: String,
    pub algorithm: String,
    pub start_sequence: u64,
    pub end_sequence: u64,
    pub event_count: u64,
    pub root_event_id: Option<Uuid>,
}

/// `epoch_id = floor((sequence - 1) / events_per_epoch)`.
pub fn epoch_id_for_sequence(sequence: u64, events_per_epoch: u64) -> u64 {
    (sequence - 1) / events_per_epoch
}

/// Inclusive `[start, end]` sequence range for `epoch_id`.
pub fn epoch_range(epoch_id: u64, events_per_epoch: u64) -> (u64, u64) {
    (epoch_id * events_per_epoch + 1, (epoch_id + 1) * events_per_epoch)
}

/// True when `current_sequence` lands exactly on an event-count epoch
/// boundary: a positive multiple of `events_per_epoch`.
pub fn crosses_event_boundary(current_sequence: u64, events_per_epoch: u64) -> bool {
    current_sequence > 0 && current_sequence % events_per_epoch == 0
}

/// Tracks built epochs and builds/publishes new ones as sequence boundaries
/// are crossed.
pub struct EpochManager {
    config: LedgerConfig,
    built: Mutex<Vec<Epoch>>,
}

impl EpochManager {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config, built: Mutex::new(Vec::new()) }
    }

    pub fn epochs(&self) -> Vec<Epoch> {
        self.built.lock().expect("epoch manager lock poisoned").clone()
    }

    fn already_built(&self, epoch_id: u64) -> bool {
        self.built.lock().expect("epoch manager lock poisoned").iter().any(|e| e.epoch_id == epoch_id)
    }

    /// Reads `[start_sequence, end_sequence]` from `backend`, verifies it is
    /// gap-free, and builds a Merkle tree over the member event hashes.
    pub fn build<B: LedgerRead>(&self, backend: &B, epoch_id: u64) -> MerkleResult<Epoch> {
        if self.already_built(epoch_id) {
            return Err(MerkleError::EpochAlreadyBuilt { epoch: epoch_id });
        }

        let (start, end) = epoch_range(epoch_id, self.config.events_per_epoch);
        let options = LedgerReadOptions {
            start_sequence: Some(start),
            end_sequence: Some(end),
            limit: (end - start + 1) as usize,
            ..Default::default()
        };
        let members = backend.read(&options);

        if (members.len() as u64) < (end - start + 1) {
            return Err(MerkleError::EpochRangeIncomplete {
                epoch: epoch_id,
                have: members.len() as u64,
                need: end - start + 1,
            });
        }

        for (offset, member) in members.iter().enumerate() {
            let expected = start + offset as u64;
            if member.sequence != expected {
                return Err(MerkleError::GapInEpochRange {
                    start_sequence: start,
                    end_sequence: end,
                    missing_sequence: expected,
                });
            }
        }

        let hashes: Vec<String> = members.iter().map(|m| m.event.hash().to_string()).collect();
        let tree = MerkleTree::build(&self.config.hash_algorithm, &hashes)?;

        let epoch = Epoch {
            epoch_id,
            root_hash: tree.root(),
            algorithm: self.config.hash_algorithm.clone(),
            start_sequence: start,
            end_sequence: members.last().map(|m| m.sequence).unwrap_or(end),
            event_count: members.len() as u64,
            root_event_id: None,
        };

        self.built.lock().expect("epoch manager lock poisoned").push(epoch.clone());
        Ok(epoch)
    }

    /// Publishes `epoch`'s root as a `ledger.merkle.root_published` event.
    /// `prev_hash` is the ledger's *current* latest hash, not the last event
    /// in the epoch's range — roots commit to the chain that produced them,
    /// including anything appended since the epoch was built.
    pub fn publish<B: LedgerAppend>(
        &self,
        backend: &B,
        clock: &dyn Clock,
        epoch: &Epoch,
        actor_id: &str,
        trace_id: &str,
    ) -> MerkleResult<Epoch> {
        let timestamp: DateTime<Utc> = clock.now();
        let payload = json!({
            "epoch": epoch.epoch_id,
            "merkle_root": epoch.root_hash,
            "start_sequence": epoch.start_sequence,
            "end_sequence": epoch.end_sequence,
            "event_count": epoch.event_count,
            "algorithm": epoch.algorithm,
        });

        let event = GovernanceEvent::create(
            "ledger.merkle.root_published",
            timestamp,
            actor_id,
            trace_id,
            payload,
            ledger_types::event::CURRENT_SCHEMA_VERSION,
        )
        .map_err(|_| MerkleError::UnsupportedAlgorithm(epoch.algorithm.clone()))?;

        let latest = backend.latest();
        let prev_hash = latest
            .map(|p| p.event.hash().to_string())
            .unwrap_or_else(|| ledger_types::hash::genesis_marker(&epoch.algorithm));
        let hash = compute_event_hash(&event, &prev_hash, &epoch.algorithm)
            .map_err(|_| MerkleError::UnsupportedAlgorithm(epoch.algorithm.clone()))?;
        let hashed = event
            .with_hash(prev_hash, hash)
            .map_err(|_| MerkleError::EpochAlreadyBuilt { epoch: epoch.epoch_id })?;

        let persisted = backend
            .append(hashed)
            .map_err(|_| MerkleError::EpochRangeIncomplete { epoch: epoch.epoch_id, have: 0, need: 0 })?;

        let published = Epoch { root_event_id: Some(persisted.event_id()), ..epoch.clone() };

        let mut built = self.built.lock().expect("epoch manager lock poisoned");
        if let Some(slot) = built.iter_mut().find(|e| e.epoch_id == epoch.epoch_id) {
            *slot = published.clone();
        }
        drop(built);

        info!(epoch = epoch.epoch_id, root = %published.root_hash, sequence = persisted.sequence, "epoch root published");
        Ok(published)
    }

    /// Convenience: if `current_sequence` crosses an event-count boundary and
    /// the implied epoch hasn't been built yet, builds and publishes it.
    pub fn maybe_build_and_publish<B: LedgerAppend>(
        &self,
        backend: &B,
        clock: &dyn Clock,
        current_sequence: u64,
        actor_id: &str,
        trace_id: &str,
    ) -> MerkleResult<Option<Epoch>> {
        if self.config.time_based_epochs || !crosses_event_boundary(current_sequence, self.config.events_per_epoch) {
            return Ok(None);
        }

        let epoch_id = epoch_id_for_sequence(current_sequence, self.config.events_per_epoch);
        if self.already_built(epoch_id) {
            return Ok(None);
        }

        let epoch = self.build(backend, epoch_id)?;
        let published = self.publish(backend, clock, &epoch, actor_id, trace_id)?;
        Ok(Some(published))
    }
}
