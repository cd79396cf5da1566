use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};

use signet_core::{AutoSignatureTerm, Document};

use crate::client::{SignatureTransport, TransportError};
use crate::dto;

pub const DOCUMENTS_ENDPOINT: &str = "/api/v1/documents";
pub const TERMS_ENDPOINT: &str = "/api/v1/auto_signature_terms";

/// How a submission failed. The classification arrives unchanged from the
/// transport; `Malformed` additionally covers 2xx responses that do not echo
/// a usable `data.id`.
#[derive(Debug, Error)]
pub enum SubmissionFailure {
    #[error("transient transport failure: {0}")]
    Transient(#[source] TransportError),

    #[error("rejected with status {status}")]
    Rejected { status: u16 },

    #[error("malformed response: {detail}")]
    Malformed { detail: String },

    #[error("authentication failed with status {status}")]
    Auth { status: u16 },
}

/// Submission failure wrapped with context: resource family and endpoint.
#[derive(Debug, Error)]
#[error("submission of {resource} to {endpoint} failed: {failure}")]
pub struct SubmissionError {
    pub resource: &'static str,
    pub endpoint: &'static str,
    pub failure: SubmissionFailure,
    /// Raw provider body when one was received; retained verbatim for audit.
    pub raw_body: Option<String>,
}

impl SubmissionError {
    pub fn is_transient(&self) -> bool {
        matches!(self.failure, SubmissionFailure::Transient(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.failure, SubmissionFailure::Transient(TransportError::Timeout(_)))
    }
}

/// Provider key plus the verbatim response body that carried it.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub provider_key: String,
    pub raw_body: String,
}

/// One submit operation per resource family: builds the envelope, posts it,
/// and extracts the provider key. Retry-free; policy lives with the caller.
pub struct SubmissionService {
    transport: Arc<dyn SignatureTransport>,
}

impl SubmissionService {
    pub fn new(transport: Arc<dyn SignatureTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self, document), fields(name = %document.name))]
    pub async fn create_document(
        &self,
        document: &Document,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let envelope = dto::document_request(document);
        self.submit("document", DOCUMENTS_ENDPOINT, &envelope).await
    }

    #[instrument(skip(self, term), fields(signer = %term.signer.email))]
    pub async fn create_auto_signature_term(
        &self,
        term: &AutoSignatureTerm,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let envelope = dto::term_request(term);
        self.submit("auto_signature_term", TERMS_ENDPOINT, &envelope).await
    }

    async fn submit(
        &self,
        resource: &'static str,
        endpoint: &'static str,
        envelope: &Value,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let response = match self.transport.post(endpoint, envelope).await {
            Ok(response) => response,
            Err(err) => {
                warn!(resource, endpoint, error = %err, "provider submission failed");
                return Err(wrap_transport_error(resource, endpoint, err));
            }
        };

        // The provider is contract-bound to echo the created resource.
        if response.bytes.is_empty() {
            return Err(SubmissionError {
                resource,
                endpoint,
                failure: SubmissionFailure::Malformed { detail: "empty response body".into() },
                raw_body: Some(String::new()),
            });
        }

        let raw_body = String::from_utf8_lossy(&response.bytes).to_string();
        match dto::extract_provider_key(&response.bytes) {
            Ok(provider_key) => {
                info!(resource, provider_key, "provider accepted submission");
                Ok(SubmissionOutcome { provider_key, raw_body })
            }
            Err(detail) => Err(SubmissionError {
                resource,
                endpoint,
                failure: SubmissionFailure::Malformed { detail },
                raw_body: Some(raw_body),
            }),
        }
    }
}

fn wrap_transport_error(
    resource: &'static str,
    endpoint: &'static str,
    err: TransportError,
) -> SubmissionError {
    match err {
        TransportError::Client { status, body } => SubmissionError {
            resource,
            endpoint,
            failure: SubmissionFailure::Rejected { status },
            raw_body: Some(body),
        },
        TransportError::Auth { status, body } => SubmissionError {
            resource,
            endpoint,
            failure: SubmissionFailure::Auth { status },
            raw_body: Some(body),
        },
        TransportError::Malformed(detail) => SubmissionError {
            resource,
            endpoint,
            failure: SubmissionFailure::Malformed { detail },
            raw_body: None,
        },
        transient => SubmissionError {
            resource,
            endpoint,
            failure: SubmissionFailure::Transient(transient),
            raw_body: None,
        },
    }
}
