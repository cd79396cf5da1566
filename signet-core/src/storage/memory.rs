use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::common::error::{Result, SignetError};
use crate::domain::{AutoSignatureTerm, Document, Status, User, WebhookEvent};

use super::traits::{ListFilter, RecordLock, Storage};

/// In-memory storage used by the test suites and for local development
/// without a database. Per-record async mutexes stand in for row locks.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: Mutex<HashMap<Uuid, Document>>,
    terms: Mutex<HashMap<Uuid, AutoSignatureTerm>>,
    users: Mutex<HashMap<Uuid, User>>,
    webhook_events: Mutex<Vec<WebhookEvent>>,
    row_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire_row_lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.row_locks.lock().await;
            locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }
}

fn matches_search(haystacks: &[Option<&str>], search: &str) -> bool {
    let needle = search.to_lowercase();
    haystacks
        .iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(&needle))
}

struct MemDocumentLock {
    inner: Arc<Inner>,
    id: Uuid,
    record: Document,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl RecordLock<Document> for MemDocumentLock {
    fn record(&self) -> &Document {
        &self.record
    }

    async fn commit_sent(self: Box<Self>, provider_key: &str, raw_payload: &str) -> Result<()> {
        let mut documents = self.inner.documents.lock().await;
        if documents
            .values()
            .any(|d| d.id != Some(self.id) && d.provider_key.as_deref() == Some(provider_key))
        {
            return Err(SignetError::Database {
                message: format!("provider key '{provider_key}' already exists"),
            });
        }
        let mut record = self.record;
        record.status = Status::Sent;
        record.provider_key = Some(provider_key.to_string());
        record.provider_raw_payload = Some(raw_payload.to_string());
        record.updated_at = Utc::now();
        documents.insert(self.id, record);
        Ok(())
    }

    async fn commit_failed(self: Box<Self>, raw_payload: Option<&str>) -> Result<()> {
        self.commit_status(Status::Failed, raw_payload).await
    }

    async fn commit_status(self: Box<Self>, status: Status, raw_payload: Option<&str>) -> Result<()> {
        let mut documents = self.inner.documents.lock().await;
        let mut record = self.record;
        record.status = status;
        if let Some(raw) = raw_payload {
            record.provider_raw_payload = Some(raw.to_string());
        }
        record.updated_at = Utc::now();
        documents.insert(self.id, record);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct MemTermLock {
    inner: Arc<Inner>,
    id: Uuid,
    record: AutoSignatureTerm,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl RecordLock<AutoSignatureTerm> for MemTermLock {
    fn record(&self) -> &AutoSignatureTerm {
        &self.record
    }

    async fn commit_sent(self: Box<Self>, provider_key: &str, raw_payload: &str) -> Result<()> {
        let mut terms = self.inner.terms.lock().await;
        if terms
            .values()
            .any(|t| t.id != Some(self.id) && t.provider_key.as_deref() == Some(provider_key))
        {
            return Err(SignetError::Database {
                message: format!("provider key '{provider_key}' already exists"),
            });
        }
        let mut record = self.record;
        record.status = Status::Sent;
        record.provider_key = Some(provider_key.to_string());
        record.provider_raw_payload = Some(raw_payload.to_string());
        record.updated_at = Utc::now();
        terms.insert(self.id, record);
        Ok(())
    }

    async fn commit_failed(self: Box<Self>, raw_payload: Option<&str>) -> Result<()> {
        self.commit_status(Status::Failed, raw_payload).await
    }

    async fn commit_status(self: Box<Self>, status: Status, raw_payload: Option<&str>) -> Result<()> {
        let mut terms = self.inner.terms.lock().await;
        let mut record = self.record;
        record.status = status;
        if let Some(raw) = raw_payload {
            record.provider_raw_payload = Some(raw.to_string());
        }
        record.updated_at = Utc::now();
        terms.insert(self.id, record);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn migrate(&self) -> Result<()> {
        Ok(())
    }

    async fn create_document(&self, document: &mut Document) -> Result<()> {
        let id = document.id.unwrap_or_else(Uuid::new_v4);
        document.id = Some(id);
        self.inner.documents.lock().await.insert(id, document.clone());
        Ok(())
    }

    async fn update_document(&self, document: &Document) -> Result<()> {
        let id = document
            .id
            .ok_or_else(|| SignetError::Validation("document id is required".into()))?;
        let mut documents = self.inner.documents.lock().await;
        if !documents.contains_key(&id) {
            return Err(SignetError::NotFound("document".into()));
        }
        documents.insert(id, document.clone());
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.inner.documents.lock().await.remove(&id);
        Ok(())
    }

    async fn get_document_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.inner.documents.lock().await.get(&id).cloned())
    }

    async fn get_document_by_provider_key(&self, key: &str) -> Result<Option<Document>> {
        Ok(self
            .inner
            .documents
            .lock()
            .await
            .values()
            .find(|d| d.provider_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_documents(&self, filter: &ListFilter) -> Result<Vec<Document>> {
        let documents = self.inner.documents.lock().await;
        let mut result: Vec<Document> = documents
            .values()
            .filter(|d| filter.status.map_or(true, |s| d.status == s))
            .filter(|d| {
                filter.search.as_deref().map_or(true, |q| {
                    matches_search(&[Some(&d.name), d.description.as_deref()], q)
                })
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn lock_document(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<Document>>>> {
        let guard = self.acquire_row_lock(id).await;
        let record = match self.inner.documents.lock().await.get(&id) {
            Some(record) => record.clone(),
            None => return Ok(None),
        };
        Ok(Some(Box::new(MemDocumentLock {
            inner: self.inner.clone(),
            id,
            record,
            _guard: guard,
        })))
    }

    async fn lock_document_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<Document>>>> {
        let id = match self.get_document_by_provider_key(key).await? {
            Some(document) => document.id.unwrap_or_default(),
            None => return Ok(None),
        };
        let guard = self.acquire_row_lock(id).await;
        // Re-read under the lock; the record may have changed in between.
        let record = match self.inner.documents.lock().await.get(&id) {
            Some(record) if record.provider_key.as_deref() == Some(key) => record.clone(),
            _ => return Ok(None),
        };
        Ok(Some(Box::new(MemDocumentLock {
            inner: self.inner.clone(),
            id,
            record,
            _guard: guard,
        })))
    }

    async fn create_term(&self, term: &mut AutoSignatureTerm) -> Result<()> {
        let id = term.id.unwrap_or_else(Uuid::new_v4);
        term.id = Some(id);
        self.inner.terms.lock().await.insert(id, term.clone());
        Ok(())
    }

    async fn update_term(&self, term: &AutoSignatureTerm) -> Result<()> {
        let id = term
            .id
            .ok_or_else(|| SignetError::Validation("term id is required".into()))?;
        let mut terms = self.inner.terms.lock().await;
        if !terms.contains_key(&id) {
            return Err(SignetError::NotFound("auto signature term".into()));
        }
        terms.insert(id, term.clone());
        Ok(())
    }

    async fn delete_term(&self, id: Uuid) -> Result<()> {
        self.inner.terms.lock().await.remove(&id);
        Ok(())
    }

    async fn get_term_by_id(&self, id: Uuid) -> Result<Option<AutoSignatureTerm>> {
        Ok(self.inner.terms.lock().await.get(&id).cloned())
    }

    async fn get_term_by_provider_key(&self, key: &str) -> Result<Option<AutoSignatureTerm>> {
        Ok(self
            .inner
            .terms
            .lock()
            .await
            .values()
            .find(|t| t.provider_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_terms(&self, filter: &ListFilter) -> Result<Vec<AutoSignatureTerm>> {
        let terms = self.inner.terms.lock().await;
        let mut result: Vec<AutoSignatureTerm> = terms
            .values()
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .filter(|t| {
                filter.search.as_deref().map_or(true, |q| {
                    matches_search(&[Some(&t.signer.name), Some(&t.signer.email)], q)
                })
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn lock_term(&self, id: Uuid) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>> {
        let guard = self.acquire_row_lock(id).await;
        let record = match self.inner.terms.lock().await.get(&id) {
            Some(record) => record.clone(),
            None => return Ok(None),
        };
        Ok(Some(Box::new(MemTermLock {
            inner: self.inner.clone(),
            id,
            record,
            _guard: guard,
        })))
    }

    async fn lock_term_by_provider_key(
        &self,
        key: &str,
    ) -> Result<Option<Box<dyn RecordLock<AutoSignatureTerm>>>> {
        let id = match self.get_term_by_provider_key(key).await? {
            Some(term) => term.id.unwrap_or_default(),
            None => return Ok(None),
        };
        let guard = self.acquire_row_lock(id).await;
        let record = match self.inner.terms.lock().await.get(&id) {
            Some(record) if record.provider_key.as_deref() == Some(key) => record.clone(),
            _ => return Ok(None),
        };
        Ok(Some(Box::new(MemTermLock {
            inner: self.inner.clone(),
            id,
            record,
            _guard: guard,
        })))
    }

    async fn record_webhook_event(&self, event: &mut WebhookEvent) -> Result<()> {
        let id = event.id.unwrap_or_else(Uuid::new_v4);
        event.id = Some(id);
        self.inner.webhook_events.lock().await.push(event.clone());
        Ok(())
    }

    async fn list_webhook_events(&self, provider_key: &str) -> Result<Vec<WebhookEvent>> {
        Ok(self
            .inner
            .webhook_events
            .lock()
            .await
            .iter()
            .filter(|e| e.provider_key == provider_key)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &mut User) -> Result<()> {
        let mut users = self.inner.users.lock().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(SignetError::Database {
                message: format!("email '{}' already exists", user.email),
            });
        }
        let id = user.id.unwrap_or_else(Uuid::new_v4);
        user.id = Some(id);
        users.insert(id, user.clone());
        Ok(())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .users
            .lock()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;

    fn document() -> Document {
        Document::new(
            "contract.pdf".into(),
            "/files/contract.pdf".into(),
            2048,
            "application/pdf".into(),
            Some("service agreement".into()),
        )
    }

    #[tokio::test]
    async fn create_assigns_an_id() {
        let storage = MemoryStorage::new();
        let mut doc = document();
        storage.create_document(&mut doc).await.unwrap();
        assert!(doc.id.is_some());
        let fetched = storage.get_document_by_id(doc.id.unwrap()).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn commit_sent_persists_key_payload_and_status() {
        let storage = MemoryStorage::new();
        let mut doc = document();
        storage.create_document(&mut doc).await.unwrap();
        let id = doc.id.unwrap();

        let lock = storage.lock_document(id).await.unwrap().unwrap();
        lock.commit_sent("pk-1", "{\"data\":{\"id\":\"pk-1\"}}").await.unwrap();

        let stored = storage.get_document_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Sent);
        assert_eq!(stored.provider_key.as_deref(), Some("pk-1"));
        assert!(stored.provider_raw_payload.is_some());

        let by_key = storage.get_document_by_provider_key("pk-1").await.unwrap().unwrap();
        assert_eq!(by_key.id, Some(id));
    }

    #[tokio::test]
    async fn duplicate_provider_key_is_rejected() {
        let storage = MemoryStorage::new();
        let mut first = document();
        let mut second = document();
        storage.create_document(&mut first).await.unwrap();
        storage.create_document(&mut second).await.unwrap();

        let lock = storage.lock_document(first.id.unwrap()).await.unwrap().unwrap();
        lock.commit_sent("pk-dup", "{}").await.unwrap();

        let lock = storage.lock_document(second.id.unwrap()).await.unwrap().unwrap();
        assert!(lock.commit_sent("pk-dup", "{}").await.is_err());
    }

    #[tokio::test]
    async fn release_leaves_record_untouched() {
        let storage = MemoryStorage::new();
        let mut doc = document();
        storage.create_document(&mut doc).await.unwrap();
        let id = doc.id.unwrap();

        let lock = storage.lock_document(id).await.unwrap().unwrap();
        lock.release().await.unwrap();

        let stored = storage.get_document_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::Draft);
        assert!(stored.provider_key.is_none());
    }

    #[tokio::test]
    async fn list_filters_by_status_and_search() {
        let storage = MemoryStorage::new();
        let mut doc = document();
        storage.create_document(&mut doc).await.unwrap();

        let by_status = storage
            .list_documents(&ListFilter { status: Some(Status::Draft), search: None })
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);

        let by_search = storage
            .list_documents(&ListFilter { status: None, search: Some("AGREEMENT".into()) })
            .await
            .unwrap();
        assert_eq!(by_search.len(), 1);

        let miss = storage
            .list_documents(&ListFilter { status: Some(Status::Sent), search: None })
            .await
            .unwrap();
        assert!(miss.is_empty());
    }
}
