use crate::domain::status::PaymentStatus;
use crate::domain::{PaymentId, RegistrationId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RaceError>;

/// Coarse failure categories exposed to callers that translate errors into
/// user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unauthorized,
    Storage,
    Persistence,
}

#[derive(Error, Debug)]
pub enum RaceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Registration {0} not found")]
    RegistrationNotFound(RegistrationId),
    #[error("Payment {0} not found")]
    PaymentNotFound(PaymentId),
    #[error("No payment exists for registration {0}")]
    PaymentNotFoundForRegistration(RegistrationId),
    #[error("Email {0} is already registered")]
    DuplicateEmail(String),
    #[error("Registration {0} already has a payment")]
    PaymentAlreadyExists(RegistrationId),
    #[error("No price configured for event type {0}")]
    UnknownEventType(String),
    #[error("Payment {0} is already completed")]
    AlreadyCompleted(PaymentId),
    #[error("Payment {0} was already verified as {1}")]
    AlreadyVerified(PaymentId, PaymentStatus),
    #[error("Invalid verification decision: {0}")]
    InvalidDecision(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Receipt is {size} bytes, the limit is {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Payment {payment_id} changed before the write committed (read as {expected}, now {actual})")]
    StaleStatus {
        payment_id: PaymentId,
        expected: PaymentStatus,
        actual: PaymentStatus,
    },
    #[error("Receipt storage failure: {0}")]
    StorageFailure(#[source] std::io::Error),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("Verification of payment {payment_id} failed: {source}")]
    VerificationFailed {
        payment_id: PaymentId,
        #[source]
        source: Box<RaceError>,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RaceError::ValidationError(_)
            | RaceError::InvalidDecision(_)
            | RaceError::UnknownEventType(_)
            | RaceError::PayloadTooLarge { .. }
            | RaceError::UnsupportedMediaType(_)
            | RaceError::JsonError(_)
            | RaceError::CsvError(_) => ErrorKind::Validation,
            RaceError::RegistrationNotFound(_)
            | RaceError::PaymentNotFound(_)
            | RaceError::PaymentNotFoundForRegistration(_) => ErrorKind::NotFound,
            RaceError::DuplicateEmail(_)
            | RaceError::PaymentAlreadyExists(_)
            | RaceError::AlreadyCompleted(_)
            | RaceError::AlreadyVerified(..)
            | RaceError::StaleStatus { .. } => ErrorKind::Conflict,
            RaceError::Unauthorized(_) => ErrorKind::Unauthorized,
            RaceError::StorageFailure(_) | RaceError::IoError(_) => ErrorKind::Storage,
            RaceError::PersistenceFailure(_) | RaceError::VerificationFailed { .. } => {
                ErrorKind::Persistence
            }
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for RaceError {
    fn from(e: rocksdb::Error) -> Self {
        RaceError::PersistenceFailure(e.to_string())
    }
}
