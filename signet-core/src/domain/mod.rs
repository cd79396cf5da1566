use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::{Result, SignetError};

pub mod status;

pub use status::Status;

/// Locally authored artifact driven toward the signature provider. The
/// payload bytes themselves are referenced by path and treated opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<Uuid>,
    pub name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
    pub status: Status,
    /// Opaque identifier assigned by the provider; set exactly once,
    /// atomically with the transition into Sent.
    pub provider_key: Option<String>,
    /// Verbatim last provider response that caused a state change. The only
    /// audit artifact for a terminal Failed state.
    pub provider_raw_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        name: String,
        file_path: String,
        file_size: i64,
        mime_type: String,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name,
            file_path,
            file_size,
            mime_type,
            description,
            status: Status::Draft,
            provider_key: None,
            provider_raw_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SignetError::Validation("document name is required".into()));
        }
        if self.file_path.trim().is_empty() {
            return Err(SignetError::Validation("document file path is required".into()));
        }
        if self.file_size <= 0 {
            return Err(SignetError::Validation("document file size must be positive".into()));
        }
        if self.mime_type.trim().is_empty() {
            return Err(SignetError::Validation("document mime type is required".into()));
        }
        Ok(())
    }
}

/// Signer block carried by an auto signature term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub documentation: String,
    pub birthday: NaiveDate,
    pub email: String,
    pub name: String,
}

/// Resource dedicated to the provider's auto signature terms endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSignatureTerm {
    pub id: Option<Uuid>,
    pub signer: Signer,
    pub admin_email: String,
    pub api_email: String,
    pub status: Status,
    pub provider_key: Option<String>,
    pub provider_raw_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutoSignatureTerm {
    pub fn new(signer: Signer, admin_email: String, api_email: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            signer,
            admin_email,
            api_email,
            status: Status::Draft,
            provider_key: None,
            provider_raw_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.signer.documentation.trim().is_empty() {
            return Err(SignetError::Validation("signer documentation is required".into()));
        }
        if self.signer.name.trim().is_empty() {
            return Err(SignetError::Validation("signer name is required".into()));
        }
        for (label, email) in [
            ("signer email", &self.signer.email),
            ("admin email", &self.admin_email),
            ("api email", &self.api_email),
        ] {
            if !email.contains('@') {
                return Err(SignetError::Validation(format!("{label} is not a valid address")));
            }
        }
        Ok(())
    }
}

/// Back-office user; authentication collaborator, not part of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Audit row recorded for every provider callback, including the ones that
/// are acknowledged without mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: Option<Uuid>,
    pub provider_key: String,
    pub event_kind: String,
    /// What the reconciler did with the event: "applied:<status>",
    /// "duplicate", "anomaly" or "unknown_key".
    pub outcome: String,
    pub raw_payload: String,
    pub received_at: DateTime<Utc>,
}
