use thiserror::Error;

// Stable error codes surfaced to callers alongside the message.
pub const ACCOUNT_NOT_FOUND: &str = "ACCOUNT_NOT_FOUND";
pub const ACCOUNT_INSUFFICIENT_BALANCE: &str = "ACCOUNT_INSUFFICIENT_BALANCE";
pub const TRANSACTION_NOT_FOUND: &str = "TRANSACTION_NOT_FOUND";
pub const TRANSACTION_INVALID_AMOUNT: &str = "TRANSACTION_INVALID_AMOUNT";
pub const TRANSACTION_INVALID_TYPE: &str = "TRANSACTION_INVALID_TYPE";
pub const ALERT_NOT_FOUND: &str = "ALERT_NOT_FOUND";
pub const CASE_NOT_FOUND: &str = "CASE_NOT_FOUND";
pub const CASE_ALREADY_CLOSED: &str = "CASE_ALREADY_CLOSED";
pub const CASE_INVALID_DECISION: &str = "CASE_INVALID_DECISION";
pub const SCORING_BAD_PROVIDER: &str = "SCORING_BAD_PROVIDER";
pub const SCORING_UNAVAILABLE: &str = "SCORING_UNAVAILABLE";

#[derive(Error, Debug)]
pub enum AmlError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("[{code}] {message}")]
    Validation { code: &'static str, message: String },

    #[error("[{code}] {message}")]
    Conflict { code: &'static str, message: String },

    #[error("[{code}] scoring backend failure: {message}")]
    Scoring { code: &'static str, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AmlError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AmlError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AmlError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AmlError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn scoring(code: &'static str, message: impl Into<String>) -> Self {
        AmlError::Scoring {
            code,
            message: message.into(),
        }
    }
}

pub type AmlResult<T> = Result<T, AmlError>;
