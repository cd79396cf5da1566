//! Webhook-driven reconciliation of provider lifecycle events against local
//! records. Events are acknowledged even when nothing is applied; failing the
//! webhook would make the provider retry forever.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use signet_core::storage::{RecordLock, Storage};
use signet_core::{Result, Status, WebhookEvent};

/// Parsed provider callback.
#[derive(Debug, Clone)]
pub struct ProviderEvent {
    /// Full event name, e.g. "auto_signature_term.finished".
    pub event: String,
    pub provider_key: String,
    /// Verbatim webhook body, retained in the audit trail.
    pub raw_payload: String,
}

/// What the reconciler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(Status),
    /// Record already terminal; acknowledged without mutation.
    AlreadyTerminal,
    /// No local record carries the provider key.
    UnknownKey,
    /// Unknown event kind, or a transition the table does not allow.
    Anomaly,
}

impl ReconcileOutcome {
    fn label(&self) -> String {
        match self {
            ReconcileOutcome::Applied(status) => format!("applied:{status}"),
            ReconcileOutcome::AlreadyTerminal => "duplicate".to_string(),
            ReconcileOutcome::UnknownKey => "unknown_key".to_string(),
            ReconcileOutcome::Anomaly => "anomaly".to_string(),
        }
    }
}

pub struct ReconcileUseCase {
    storage: Arc<dyn Storage>,
}

impl ReconcileUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self, event), fields(event = %event.event, provider_key = %event.provider_key))]
    pub async fn handle(&self, event: &ProviderEvent) -> Result<ReconcileOutcome> {
        let kind = event.event.rsplit('.').next().unwrap_or(&event.event);
        let target = Status::webhook_target(kind);

        // The event-name prefix picks the family to try first; the provider
        // key is unique, so a miss falls back to the other family rather
        // than misfiling the event as an unknown key.
        let documents_first = event.event.starts_with("document");
        let first = if documents_first {
            self.apply_to_document(event, target).await?
        } else {
            self.apply_to_term(event, target).await?
        };
        let outcome = match first {
            Some(outcome) => outcome,
            None if documents_first => self
                .apply_to_term(event, target)
                .await?
                .unwrap_or(ReconcileOutcome::UnknownKey),
            None => self
                .apply_to_document(event, target)
                .await?
                .unwrap_or(ReconcileOutcome::UnknownKey),
        };

        match outcome {
            ReconcileOutcome::Applied(status) => {
                info!(%status, "webhook transition applied");
            }
            ReconcileOutcome::AlreadyTerminal => {
                info!("webhook event for terminal record acknowledged");
            }
            ReconcileOutcome::UnknownKey => {
                warn!("webhook event for unknown provider key acknowledged");
            }
            ReconcileOutcome::Anomaly => {
                warn!("webhook event recorded as anomaly, transition not applied");
            }
        }

        let mut audit = WebhookEvent {
            id: None,
            provider_key: event.provider_key.clone(),
            event_kind: event.event.clone(),
            outcome: outcome.label(),
            raw_payload: event.raw_payload.clone(),
            received_at: Utc::now(),
        };
        self.storage.record_webhook_event(&mut audit).await?;

        Ok(outcome)
    }

    async fn apply_to_document(
        &self,
        event: &ProviderEvent,
        target: Option<Status>,
    ) -> Result<Option<ReconcileOutcome>> {
        match self.storage.lock_document_by_provider_key(&event.provider_key).await? {
            Some(lock) => Ok(Some(apply_event(lock, target, &event.raw_payload).await?)),
            None => Ok(None),
        }
    }

    async fn apply_to_term(
        &self,
        event: &ProviderEvent,
        target: Option<Status>,
    ) -> Result<Option<ReconcileOutcome>> {
        match self.storage.lock_term_by_provider_key(&event.provider_key).await? {
            Some(lock) => Ok(Some(apply_event(lock, target, &event.raw_payload).await?)),
            None => Ok(None),
        }
    }
}

/// Applies the guarded transition for one locked record. Only Sent records
/// move; terminal records acknowledge idempotently and anything else is an
/// anomaly.
async fn apply_event<T: HasStatus + Send + Sync>(
    lock: Box<dyn RecordLock<T>>,
    target: Option<Status>,
    raw_payload: &str,
) -> Result<ReconcileOutcome> {
    let current = lock.record().status();
    let Some(target) = target else {
        lock.release().await?;
        return Ok(ReconcileOutcome::Anomaly);
    };
    if current.is_terminal() {
        lock.release().await?;
        return Ok(ReconcileOutcome::AlreadyTerminal);
    }
    if current != Status::Sent {
        lock.release().await?;
        return Ok(ReconcileOutcome::Anomaly);
    }
    lock.commit_status(target, Some(raw_payload)).await?;
    Ok(ReconcileOutcome::Applied(target))
}

/// Both record families expose their lifecycle status to the reconciler.
pub trait HasStatus {
    fn status(&self) -> Status;
}

impl HasStatus for signet_core::Document {
    fn status(&self) -> Status {
        self.status
    }
}

impl HasStatus for signet_core::AutoSignatureTerm {
    fn status(&self) -> Status {
        self.status
    }
}
