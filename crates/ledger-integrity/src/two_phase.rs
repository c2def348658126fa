//! Two-phase emission and the orphan/gap detector (C8, second half).
//!
//! Every branch gets an `.intent.emitted` / `.commit.confirmed` /
//! `.failure.recorded` trio, correlated by a generated `correlation_id`. An
//! in-process [`InFlightRegistry`] tracks unresolved intents; the orphan
//! detector flags any that outlive `orphan_timeout` without a matching
//! outcome. Suffix matching is plain `str::ends_with` against the three
//! well-known suffixes — not a regex or glob engine, see DESIGN.md's
//! "Open Questions resolved".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use ledger_ports::{AppendResult, Clock, EventEmitter, LedgerAppend, LedgerRead};
use ledger_types::event::{GovernanceEvent, LedgerReadOptions, PersistedEvent};
use ledger_types::event_types::{COMMIT_SUFFIX, FAILURE_SUFFIX, INTENT_SUFFIX};
use ledger_validate::hash_chain::validate_and_hash;

use crate::error::{IntegrityError, IntegrityResult};

/// Chains `event` onto `backend`'s current latest before emission — intent,
/// commit, and failure events are ordinary governance events and take part
/// in the same hash chain as everything else, even though they skip
/// the actor/state-transition gates a user-originated event goes through.
fn hash_onto_latest(
    backend: &(impl LedgerRead + ?Sized),
    event: GovernanceEvent,
    algorithm: &str,
) -> IntegrityResult<GovernanceEvent> {
    let latest = backend.latest();
    validate_and_hash(event, latest.as_ref(), algorithm)
        .map_err(|e| IntegrityError::EmissionFailed { reason: e.to_string() })
}

#[derive(Debug, Clone)]
struct CorrelatedRecord {
    intent_event_id: Uuid,
    branch_prefix: String,
    started_at: DateTime<Utc>,
}

/// In-process mapping from correlation id to pending intent record.
/// Authoritative only for the lifetime of the process — reconciliation
/// against the ledger after a restart is the orphan detector's job, scanning
/// the ledger itself rather than this registry.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    records: Mutex<HashMap<String, CorrelatedRecord>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, correlation_id: String, record: CorrelatedRecord) {
        self.records.lock().expect("in-flight registry lock poisoned").insert(correlation_id, record);
    }

    fn take(&self, correlation_id: &str) -> Option<CorrelatedRecord> {
        self.records.lock().expect("in-flight registry lock poisoned").remove(correlation_id)
    }

    fn peek(&self, correlation_id: &str) -> Option<CorrelatedRecord> {
        self.records.lock().expect("in-flight registry lock poisoned").get(correlation_id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.records.lock().expect("in-flight registry lock poisoned").len()
    }

    fn snapshot(&self) -> Vec<(String, CorrelatedRecord)> {
        self.records
            .lock()
            .expect("in-flight registry lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn emit(backend: &impl EventEmitter, event: GovernanceEvent) -> IntegrityResult<PersistedEvent> {
    let result: AppendResult<PersistedEvent> = backend.emit(event);
    result.map_err(|e| IntegrityError::EmissionFailed { reason: e.to_string() })
}

/// Phase 1: hash and append the intent event, record the correlation, return
/// it to the caller for use in [`emit_commit`]/[`emit_failure`]. Failure
/// here is fail-fast — nothing has happened yet to roll back.
///
/// `branch_prefix` is a single governance branch token (e.g. `"executive"`),
/// not a `branch.noun` pair — the two-phase event type is the 3-segment
/// triple `{branch}.intent.emitted`, matching the original's per-branch
/// `GovernanceEventType` two-phase members.
#[allow(clippy::too_many_arguments)]
pub fn emit_intent(
    backend: &impl LedgerAppend,
    registry: &InFlightRegistry,
    clock: &dyn Clock,
    branch_prefix: &str,
    payload: Value,
    actor_id: &str,
    trace_id: &str,
    algorithm: &str,
) -> IntegrityResult<(PersistedEvent, String)> {
    let correlation_id = Uuid::new_v4().to_string();
    let mut payload = payload;
    if let Value::Object(map) = &mut payload {
        map.insert("correlation_id".to_string(), json!(correlation_id));
    }

    let event = GovernanceEvent::create(
        format!("{branch_prefix}{INTENT_SUFFIX}"),
        clock.now(),
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
    .map_err(|e| IntegrityError::EmissionFailed { reason: e.to_string() })?;

    let event = hash_onto_latest(backend, event, algorithm)?;
    let persisted = emit(backend, event)?;
    registry.insert(
        correlation_id.clone(),
        CorrelatedRecord {
            intent_event_id: persisted.event_id(),
            branch_prefix: branch_prefix.to_string(),
            started_at: clock.now(),
        },
    );
    Ok((persisted, correlation_id))
}

/// Phase 2a: append the commit event and clear the registry entry. Per the
/// source's `emit_fate_event` contract this never swallows an emission
/// failure — it always propagates.
#[allow(clippy::too_many_arguments)]
pub fn emit_commit(
    backend: &impl LedgerAppend,
    registry: &InFlightRegistry,
    clock: &dyn Clock,
    correlation_id: &str,
    result_payload: Value,
    actor_id: &str,
    trace_id: &str,
    algorithm: &str,
) -> IntegrityResult<PersistedEvent> {
    let record = registry
        .take(correlation_id)
        .ok_or_else(|| IntegrityError::UnknownCorrelation { correlation_id: correlation_id.to_string() })?;

    let mut payload = result_payload;
    if let Value::Object(map) = &mut payload {
        map.insert("correlation_id".to_string(), json!(correlation_id));
    }

    let event = GovernanceEvent::create(
        format!("{}{COMMIT_SUFFIX}", record.branch_prefix),
        clock.now(),
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
    .map_err(|e| IntegrityError::FateEmissionFailed { intent_event_id: record.intent_event_id, reason: e.to_string() })?;

    let event = hash_onto_latest(backend, event, algorithm)
        .map_err(|e| IntegrityError::FateEmissionFailed { intent_event_id: record.intent_event_id, reason: e.to_string() })?;

    emit(backend, event).map_err(|e| IntegrityError::FateEmissionFailed {
        intent_event_id: record.intent_event_id,
        reason: e.to_string(),
    })
}

/// Phase 2b: append the failure event and clear the registry entry. Same
/// never-swallow contract as [`emit_commit`].
#[allow(clippy::too_many_arguments)]
pub fn emit_failure(
    backend: &impl LedgerAppend,
    registry: &InFlightRegistry,
    clock: &dyn Clock,
    correlation_id: &str,
    failure_reason: &str,
    failure_details: Value,
    actor_id: &str,
    trace_id: &str,
    algorithm: &str,
) -> IntegrityResult<PersistedEvent> {
    let record = registry
        .take(correlation_id)
        .ok_or_else(|| IntegrityError::UnknownCorrelation { correlation_id: correlation_id.to_string() })?;

    let payload = json!({
        "correlation_id": correlation_id,
        "failure_reason": failure_reason,
        "failure_details": failure_details,
    });

    let event = GovernanceEvent::create(
        format!("{}{FAILURE_SUFFIX}", record.branch_prefix),
        clock.now(),
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
    .map_err(|e| IntegrityError::FateEmissionFailed { intent_event_id: record.intent_event_id, reason: e.to_string() })?;

    let event = hash_onto_latest(backend, event, algorithm)
        .map_err(|e| IntegrityError::FateEmissionFailed { intent_event_id: record.intent_event_id, reason: e.to_string() })?;

    emit(backend, event).map_err(|e| IntegrityError::FateEmissionFailed {
        intent_event_id: record.intent_event_id,
        reason: e.to_string(),
    })
}

/// Errors surfaced by [`TwoPhaseGuard::run`], distinguishing where in the
/// intent/body/outcome sequence things went wrong.
#[derive(Debug)]
pub enum GuardError<E> {
    /// The intent itself failed to emit — nothing ran.
    Intent(IntegrityError),
    /// The guarded body returned an error; its failure event was emitted
    /// successfully and this is the original error re-raised.
    Body(E),
    /// Emitting the commit or failure event failed. Always propagated, even
    /// though the guarded body may have already run and succeeded — a
    /// swallowed witness failure would violate "100% fate events persisted".
    FateEmissionFailed(IntegrityError),
}

/// Scoped two-phase execution: emits the intent on entry, the commit
/// on a successful body, or the failure (and re-raises) on an erroring one.
/// Nested calls each produce an independent intent/outcome pair since each
/// generates its own correlation id. `branch_prefix` is a single branch
/// token, as in [`emit_intent`].
pub struct TwoPhaseGuard;

impl TwoPhaseGuard {
    #[allow(clippy::too_many_arguments)]
    pub fn run<T, E, F>(
        backend: &impl LedgerAppend,
        registry: &InFlightRegistry,
        clock: &dyn Clock,
        branch_prefix: &str,
        intent_payload: Value,
        actor_id: &str,
        trace_id: &str,
        algorithm: &str,
        body: F,
    ) -> Result<(T, PersistedEvent), GuardError<E>>
    where
        F: FnOnce() -> Result<(T, Value), E>,
        E: std::fmt::Display,
    {
        let (_, correlation_id) =
            emit_intent(backend, registry, clock, branch_prefix, intent_payload, actor_id, trace_id, algorithm)
                .map_err(GuardError::Intent)?;

        match body() {
            Ok((result, result_payload)) => {
                let commit =
                    emit_commit(backend, registry, clock, &correlation_id, result_payload, actor_id, trace_id, algorithm)
                        .map_err(GuardError::FateEmissionFailed)?;
                Ok((result, commit))
            }
            Err(body_err) => {
                let reason = body_err.to_string();
                emit_failure(backend, registry, clock, &correlation_id, &reason, json!({}), actor_id, trace_id, algorithm)
                    .map_err(GuardError::FateEmissionFailed)?;
                Err(GuardError::Body(body_err))
            }
        }
    }
}

/// An intent that has outlived `orphan_timeout` without a matching outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedIntent {
    pub intent_event_id: Uuid,
    pub correlation_id: String,
    pub age_seconds: i64,
    pub original_event_type: String,
}

/// Scans the in-flight registry for intents older than `timeout` as of
/// `now`. A snapshot read — does not remove entries; resolution still
/// happens through [`emit_commit`]/[`emit_failure`].
pub fn scan_orphans(registry: &InFlightRegistry, now: DateTime<Utc>, timeout: Duration) -> Vec<OrphanedIntent> {
    registry
        .snapshot()
        .into_iter()
        .filter_map(|(correlation_id, record)| {
            let age = now.signed_duration_since(record.started_at);
            if age.num_seconds() >= timeout.as_secs() as i64 {
                Some(OrphanedIntent {
                    intent_event_id: record.intent_event_id,
                    correlation_id,
                    age_seconds: age.num_seconds(),
                    original_event_type: format!("{}{INTENT_SUFFIX}", record.branch_prefix),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Builds the (unhashed, unappended) `ledger.integrity.orphaned_intent_detected`
/// event for `orphan`.
pub fn build_orphan_event(
    orphan: &OrphanedIntent,
    timestamp: DateTime<Utc>,
    actor_id: &str,
    trace_id: &str,
) -> ledger_types::error::LedgerTypeResult<GovernanceEvent> {
    let payload = json!({
        "intent_event_id": orphan.intent_event_id.to_string(),
        "correlation_id": orphan.correlation_id,
        "age_seconds": orphan.age_seconds,
        "original_event_type": orphan.original_event_type,
    });
    GovernanceEvent::create(
        "ledger.integrity.orphaned_intent_detected",
        timestamp,
        actor_id,
        trace_id,
        payload,
        ledger_types::event::CURRENT_SCHEMA_VERSION,
    )
}

/// The "Knight" observability view of one correlation id: the intent (if any
/// is still found by scanning `backend`), its outcome (if resolved), whether
/// it is still pending, and its age.
pub struct IntentOutcomePair {
    pub intent: Option<PersistedEvent>,
    pub outcome: Option<PersistedEvent>,
    pub is_pending: bool,
    pub age_seconds: i64,
}

fn payload_correlation_id(event: &PersistedEvent) -> Option<&str> {
    event.event.payload.get("correlation_id")?.as_str()
}

/// Looks up `correlation_id` first in the in-flight registry (the cheap
/// path for anything still pending), falling back to a full ledger scan for
/// events already resolved.
pub fn get_intent_outcome_pair(
    backend: &impl LedgerRead,
    registry: &InFlightRegistry,
    correlation_id: &str,
    now: DateTime<Utc>,
) -> IntentOutcomePair {
    if let Some(record) = registry.peek(correlation_id) {
        let intent = backend.by_id(record.intent_event_id);
        let age = now.signed_duration_since(record.started_at).num_seconds();
        return IntentOutcomePair { intent, outcome: None, is_pending: true, age_seconds: age };
    }

    let all = backend.read(&LedgerReadOptions { limit: usize::MAX, ..Default::default() });
    let intent = all
        .iter()
        .find(|e| e.event_type().ends_with(INTENT_SUFFIX) && payload_correlation_id(e) == Some(correlation_id))
        .cloned();
    let outcome = all
        .iter()
        .find(|e| {
            (e.event_type().ends_with(COMMIT_SUFFIX) || e.event_type().ends_with(FAILURE_SUFFIX))
                && payload_correlation_id(e) == Some(correlation_id)
        })
        .cloned();
    let age = intent
        .as_ref()
        .map(|i| now.signed_duration_since(i.timestamp()).num_seconds())
        .unwrap_or(0);

    IntentOutcomePair { intent, outcome, is_pending: false, age_seconds: age }
}
