use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use signet_core::storage::ListFilter;
use signet_core::{AutoSignatureTerm, Document, Signer, Status, User};

// Response envelopes

#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

// Request payloads

#[derive(Debug, Deserialize)]
pub struct DocumentPayload {
    pub name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
}

impl DocumentPayload {
    pub fn into_document(self) -> Document {
        Document::new(self.name, self.file_path, self.file_size, self.mime_type, self.description)
    }
}

#[derive(Debug, Deserialize)]
pub struct SignerPayload {
    pub documentation: String,
    pub birthday: NaiveDate,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TermPayload {
    pub signer: SignerPayload,
    pub admin_email: String,
    pub api_email: String,
}

impl TermPayload {
    pub fn into_term(self) -> AutoSignatureTerm {
        AutoSignatureTerm::new(
            Signer {
                documentation: self.signer.documentation,
                birthday: self.signer.birthday,
                email: self.signer.email,
                name: self.signer.name,
            },
            self.admin_email,
            self.api_email,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<Status>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn into_filter(self) -> ListFilter {
        ListFilter { status: self.status, search: self.search }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Provider callback body: `{ event, data: { id, attributes } }`.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub id: String,
    #[serde(default)]
    pub attributes: Value,
}

// Views. The raw provider payload stays internal; it is audit material, not
// API surface.

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: Option<Uuid>,
    pub name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub description: Option<String>,
    pub status: Status,
    pub provider_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentView {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            file_path: doc.file_path,
            file_size: doc.file_size,
            mime_type: doc.mime_type,
            description: doc.description,
            status: doc.status,
            provider_key: doc.provider_key,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TermView {
    pub id: Option<Uuid>,
    pub signer: Signer,
    pub admin_email: String,
    pub api_email: String,
    pub status: Status,
    pub provider_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AutoSignatureTerm> for TermView {
    fn from(term: AutoSignatureTerm) -> Self {
        Self {
            id: term.id,
            signer: term.signer,
            admin_email: term.admin_email,
            api_email: term.api_email,
            status: term.status,
            provider_key: term.provider_key,
            created_at: term.created_at,
            updated_at: term.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self { id: user.id, name: user.name, email: user.email, created_at: user.created_at }
    }
}
