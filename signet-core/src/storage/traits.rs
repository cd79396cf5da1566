use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::Result;
use crate::domain::{AutoSignatureTerm, Document, Status, User, WebhookEvent};

/// Filters accepted by the list operations.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<Status>,
    /// Free-text predicate over name/description.
    pub search: Option<String>,
}

/// Row-level critical section around a single record.
///
/// Obtained from the lock acquisition methods on [`Storage`]; the record is
/// held under a row lock (or an equivalent per-record mutex) until one of the
/// consuming methods commits a write or releases without change. Dropping a
/// lock without calling either aborts the critical section.
#[async_trait]
pub trait RecordLock<T>: Send {
    /// Snapshot of the record as read under the lock.
    fn record(&self) -> &T;

    /// Sets provider_key + raw payload and moves the record to Sent in a
    /// single write.
    async fn commit_sent(self: Box<Self>, provider_key: &str, raw_payload: &str) -> Result<()>;

    /// Moves the record to Failed. Retains the raw provider response when
    /// one was received; a body-less failure leaves the payload untouched.
    async fn commit_failed(self: Box<Self>, raw_payload: Option<&str>) -> Result<()>;

    /// Applies an arbitrary status transition, optionally refreshing the raw
    /// payload. Used by webhook reconciliation.
    async fn commit_status(self: Box<Self>, status: Status, raw_payload: Option<&str>) -> Result<()>;

    /// Ends the critical section without writing.
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Persistence port for local records.
///
/// The port is deliberately dumb: it does not enforce status rules, which
/// live in the use-case layer. It is, however, the serialization point for
/// per-record read-modify-write cycles via the lock methods.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Creates the schema when missing. A no-op for stores that need none.
    async fn migrate(&self) -> Result<()>;

    // Document operations
    async fn create_document(&self, document: &mut Document) -> Result<()>;
    async fn update_document(&self, document: &Document) -> Result<()>;
    async fn delete_document(&self, id: Uuid) -> Result<()>;
    async fn get_document_by_id(&self, id: Uuid) -> Result<Option<Document>>;
    async fn get_document_by_provider_key(&self, key: &str) -> Result<Option<Document>>;
    async fn list_documents(&self, filter: &ListFilter) -> Result<Vec<Document>>;
    async fn lock_document(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<Document>>>>;
    async fn lock_document_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<Document>>>>;

    // Auto signature term operations
    async fn create_term(&self, term: &mut AutoSignatureTerm) -> Result<()>;
    async fn update_term(&self, term: &AutoSignatureTerm) -> Result<()>;
    async fn delete_term(&self, id: Uuid) -> Result<()>;
    async fn get_term_by_id(&self, id: Uuid) -> Result<Option<AutoSignatureTerm>>;
    async fn get_term_by_provider_key(&self, key: &str) -> Result<Option<AutoSignatureTerm>>;
    async fn list_terms(&self, filter: &ListFilter) -> Result<Vec<AutoSignatureTerm>>;
    async fn lock_term(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>>;
    async fn lock_term_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>>;

    // Webhook audit trail
    async fn record_webhook_event(&self, event: &mut WebhookEvent) -> Result<()>;
    async fn list_webhook_events(&self, provider_key: &str) -> Result<Vec<WebhookEvent>>;

    // Users
    async fn create_user(&self, user: &mut User) -> Result<()>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
