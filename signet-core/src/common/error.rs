use thiserror::Error;

use crate::domain::Status;

/// Error taxonomy shared across the workspace. Component boundaries preserve
/// the kind; wrapping adds context but never reclassifies.
#[derive(Error, Debug)]
pub enum SignetError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("record is {status} and cannot be modified")]
    ImmutableInStatus { status: Status },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("provider transient failure: {0}")]
    ProviderTransient(String),

    #[error("provider request timed out: {0}")]
    ProviderTimeout(String),

    #[error("provider rejected the submission: {0}")]
    ProviderRejected(String),

    #[error("provider response malformed: {0}")]
    ProviderMalformed(String),

    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("database error: {message}")]
    Database { message: String },
}

impl SignetError {
    /// Stable machine-readable code surfaced in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            SignetError::Validation(_) => "validation",
            SignetError::NotFound(_) => "not_found",
            SignetError::ImmutableInStatus { .. } => "immutable_in_status",
            SignetError::InvalidTransition(_) => "invalid_transition",
            SignetError::ProviderTransient(_) => "provider_transient",
            SignetError::ProviderTimeout(_) => "provider_timeout",
            SignetError::ProviderRejected(_) => "provider_rejected",
            SignetError::ProviderMalformed(_) => "provider_malformed",
            SignetError::ProviderAuth(_) => "provider_auth",
            SignetError::Unauthorized(_) => "unauthorized",
            SignetError::Database { .. } => "database",
        }
    }
}

impl From<sqlx::Error> for SignetError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SignetError::NotFound("record".to_string()),
            other => SignetError::Database { message: other.to_string() },
        }
    }
}

pub type Result<T> = std::result::Result<T, SignetError>;
