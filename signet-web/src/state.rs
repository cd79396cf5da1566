use std::sync::Arc;

use signet_core::storage::Storage;
use signet_pipeline::client::SignatureTransport;
use signet_pipeline::submission::SubmissionService;
use signet_pipeline::{DocumentUseCase, ReconcileUseCase, TermUseCase};

/// Shared application state handed to every handler. One storage handle and
/// one provider transport are created at process start and injected here.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<DocumentUseCase>,
    pub terms: Arc<TermUseCase>,
    pub reconciler: Arc<ReconcileUseCase>,
    pub jwt_secret: String,
    pub webhook_secret: String,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        transport: Arc<dyn SignatureTransport>,
        jwt_secret: String,
        webhook_secret: String,
    ) -> Self {
        let submission = Arc::new(SubmissionService::new(transport));
        Self {
            documents: Arc::new(DocumentUseCase::new(storage.clone(), submission.clone())),
            terms: Arc::new(TermUseCase::new(storage.clone(), submission)),
            reconciler: Arc::new(ReconcileUseCase::new(storage.clone())),
            storage,
            jwt_secret,
            webhook_secret,
        }
    }
}
