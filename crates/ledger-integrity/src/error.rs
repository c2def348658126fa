//! Integrity-monitoring and two-phase-emission errors.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum IntegrityError {
    #[error("backend rejected emission: {reason}")]
    EmissionFailed { reason: String },

    #[error("no in-flight intent found for correlation id '{correlation_id}'")]
    UnknownCorrelation { correlation_id: String },

    #[error("commit/failure emission for intent {intent_event_id} failed and was not swallowed: {reason}")]
    FateEmissionFailed { intent_event_id: Uuid, reason: String },
}

pub type IntegrityResult<T> = Result<T, IntegrityError>;
