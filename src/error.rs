use crate::domain::state::ProtocolViolation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinalizationError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Channel transport error: {0}")]
    Transport(String),
    #[error("Status endpoint unavailable: {0}")]
    StatusUnavailable(String),
    #[error("Payment verification request failed: {0}")]
    VerificationRequestFailed(String),
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("Pipeline stalled without a terminal event")]
    Stalled,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, FinalizationError>;
