//! Orchestration of the submit-and-persist path. The use cases here are the
//! sole mutators of local records on the happy path; the reconciler owns the
//! callback path.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use signet_core::storage::{ListFilter, Storage};
use signet_core::{AutoSignatureTerm, Document, Result, SignetError, Status};

use crate::client::TransportError;
use crate::submission::{SubmissionError, SubmissionFailure, SubmissionService};

fn submission_to_signet(err: &SubmissionError) -> SignetError {
    match &err.failure {
        SubmissionFailure::Transient(TransportError::Timeout(_)) => {
            SignetError::ProviderTimeout(err.to_string())
        }
        SubmissionFailure::Transient(_) => SignetError::ProviderTransient(err.to_string()),
        SubmissionFailure::Rejected { .. } => SignetError::ProviderRejected(err.to_string()),
        SubmissionFailure::Malformed { .. } => SignetError::ProviderMalformed(err.to_string()),
        SubmissionFailure::Auth { .. } => SignetError::ProviderAuth(err.to_string()),
    }
}

/// Use case for the document resource family.
pub struct DocumentUseCase {
    storage: Arc<dyn Storage>,
    submission: Arc<SubmissionService>,
}

impl DocumentUseCase {
    pub fn new(storage: Arc<dyn Storage>, submission: Arc<SubmissionService>) -> Self {
        Self { storage, submission }
    }

    pub async fn create(&self, mut document: Document) -> Result<Document> {
        document.validate()?;
        document.status = Status::Draft;
        document.provider_key = None;
        document.provider_raw_payload = None;
        self.storage.create_document(&mut document).await?;
        info!(id = ?document.id, "document created");
        Ok(document)
    }

    pub async fn get(&self, id: Uuid) -> Result<Document> {
        self.storage
            .get_document_by_id(id)
            .await?
            .ok_or_else(|| SignetError::NotFound("document".into()))
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Document>> {
        self.storage.list_documents(filter).await
    }

    pub async fn update(&self, id: Uuid, incoming: Document) -> Result<Document> {
        let mut current = self.get(id).await?;
        if current.status.is_locked() {
            return Err(SignetError::ImmutableInStatus { status: current.status });
        }
        current.name = incoming.name;
        current.file_path = incoming.file_path;
        current.file_size = incoming.file_size;
        current.mime_type = incoming.mime_type;
        current.description = incoming.description;
        current.validate()?;
        current.updated_at = Utc::now();
        self.storage.update_document(&current).await?;
        Ok(current)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let current = self.get(id).await?;
        if current.status.is_locked() {
            return Err(SignetError::ImmutableInStatus { status: current.status });
        }
        self.storage.delete_document(id).await
    }

    /// Explicit validation step moving a draft to Ready.
    pub async fn validate(&self, id: Uuid) -> Result<Document> {
        let mut current = self.get(id).await?;
        if current.status != Status::Draft {
            return Err(SignetError::InvalidTransition(format!(
                "cannot validate a {} document",
                current.status
            )));
        }
        current.validate()?;
        current.status = Status::Ready;
        current.updated_at = Utc::now();
        self.storage.update_document(&current).await?;
        Ok(current)
    }

    pub async fn prepare_for_signing(&self, id: Uuid) -> Result<Document> {
        let mut current = self.get(id).await?;
        if current.status != Status::Ready {
            return Err(SignetError::InvalidTransition(format!(
                "cannot prepare a {} document for signing",
                current.status
            )));
        }
        current.status = Status::Processing;
        current.updated_at = Utc::now();
        self.storage.update_document(&current).await?;
        Ok(current)
    }

    /// The critical path. Holds the row lock across the provider call so
    /// that concurrent submits on the same record make at most one outbound
    /// request; a record that already carries a provider key is a no-op.
    #[instrument(skip(self))]
    pub async fn submit_to_provider(&self, id: Uuid) -> Result<Document> {
        let lock = self
            .storage
            .lock_document(id)
            .await?
            .ok_or_else(|| SignetError::NotFound("document".into()))?;
        let current = lock.record().clone();

        if current.provider_key.is_some() {
            lock.release().await?;
            return Ok(current);
        }
        if current.status != Status::Processing {
            lock.release().await?;
            return Err(SignetError::InvalidTransition(format!(
                "cannot submit a {} document",
                current.status
            )));
        }

        match self.submission.create_document(&current).await {
            Ok(outcome) => {
                lock.commit_sent(&outcome.provider_key, &outcome.raw_body).await?;
                let mut sent = current;
                sent.status = Status::Sent;
                sent.provider_key = Some(outcome.provider_key);
                sent.provider_raw_payload = Some(outcome.raw_body);
                Ok(sent)
            }
            Err(err) if err.is_transient() => {
                // Record stays in Processing; the caller may retry.
                lock.release().await?;
                Err(submission_to_signet(&err))
            }
            Err(err) => {
                lock.commit_failed(err.raw_body.as_deref()).await?;
                Err(submission_to_signet(&err))
            }
        }
    }
}

/// Use case for the auto signature term resource family.
pub struct TermUseCase {
    storage: Arc<dyn Storage>,
    submission: Arc<SubmissionService>,
}

impl TermUseCase {
    pub fn new(storage: Arc<dyn Storage>, submission: Arc<SubmissionService>) -> Self {
        Self { storage, submission }
    }

    pub async fn create(&self, mut term: AutoSignatureTerm) -> Result<AutoSignatureTerm> {
        term.validate()?;
        term.status = Status::Draft;
        term.provider_key = None;
        term.provider_raw_payload = None;
        self.storage.create_term(&mut term).await?;
        info!(id = ?term.id, "auto signature term created");
        Ok(term)
    }

    pub async fn get(&self, id: Uuid) -> Result<AutoSignatureTerm> {
        self.storage
            .get_term_by_id(id)
            .await?
            .ok_or_else(|| SignetError::NotFound("auto signature term".into()))
    }

    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<AutoSignatureTerm>> {
        self.storage.list_terms(filter).await
    }

    pub async fn update(&self, id: Uuid, incoming: AutoSignatureTerm) -> Result<AutoSignatureTerm> {
        let mut current = self.get(id).await?;
        if current.status.is_locked() {
            return Err(SignetError::ImmutableInStatus { status: current.status });
        }
        current.signer = incoming.signer;
        current.admin_email = incoming.admin_email;
        current.api_email = incoming.api_email;
        current.validate()?;
        current.updated_at = Utc::now();
        self.storage.update_term(&current).await?;
        Ok(current)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let current = self.get(id).await?;
        if current.status.is_locked() {
            return Err(SignetError::ImmutableInStatus { status: current.status });
        }
        self.storage.delete_term(id).await
    }

    pub async fn validate(&self, id: Uuid) -> Result<AutoSignatureTerm> {
        let mut current = self.get(id).await?;
        if current.status != Status::Draft {
            return Err(SignetError::InvalidTransition(format!(
                "cannot validate a {} term",
                current.status
            )));
        }
        current.validate()?;
        current.status = Status::Ready;
        current.updated_at = Utc::now();
        self.storage.update_term(&current).await?;
        Ok(current)
    }

    pub async fn prepare_for_signing(&self, id: Uuid) -> Result<AutoSignatureTerm> {
        let mut current = self.get(id).await?;
        if current.status != Status::Ready {
            return Err(SignetError::InvalidTransition(format!(
                "cannot prepare a {} term for signing",
                current.status
            )));
        }
        current.status = Status::Processing;
        current.updated_at = Utc::now();
        self.storage.update_term(&current).await?;
        Ok(current)
    }

    /// See [`DocumentUseCase::submit_to_provider`]; identical contract for
    /// the term family.
    #[instrument(skip(self))]
    pub async fn submit_to_provider(&self, id: Uuid) -> Result<AutoSignatureTerm> {
        let lock = self
            .storage
            .lock_term(id)
            .await?
            .ok_or_else(|| SignetError::NotFound("auto signature term".into()))?;
        let current = lock.record().clone();

        if current.provider_key.is_some() {
            lock.release().await?;
            return Ok(current);
        }
        if current.status != Status::Processing {
            lock.release().await?;
            return Err(SignetError::InvalidTransition(format!(
                "cannot submit a {} term",
                current.status
            )));
        }

        match self.submission.create_auto_signature_term(&current).await {
            Ok(outcome) => {
                lock.commit_sent(&outcome.provider_key, &outcome.raw_body).await?;
                let mut sent = current;
                sent.status = Status::Sent;
                sent.provider_key = Some(outcome.provider_key);
                sent.provider_raw_payload = Some(outcome.raw_body);
                Ok(sent)
            }
            Err(err) if err.is_transient() => {
                lock.release().await?;
                Err(submission_to_signet(&err))
            }
            Err(err) => {
                lock.commit_failed(err.raw_body.as_deref()).await?;
                Err(submission_to_signet(&err))
            }
        }
    }
}
