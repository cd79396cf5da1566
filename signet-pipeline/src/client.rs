use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Default per-request deadline; overridable through `PROVIDER_TIMEOUT_MS`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport failure classification. Exactly one classification per failure;
/// callers decide the retry policy, the client never retries.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not reach provider: {0}")]
    Network(String),

    #[error("provider request timed out: {0}")]
    Timeout(String),

    #[error("provider server error {status}")]
    Server { status: u16, body: String },

    #[error("provider client error {status}")]
    Client { status: u16, body: String },

    #[error("provider rejected credentials ({status})")]
    Auth { status: u16, body: String },

    #[error("provider rate limited the request")]
    RateLimit { body: String },

    #[error("provider response unreadable: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Transient failures leave the local record untouched so the caller may
    /// retry; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_)
                | TransportError::Timeout(_)
                | TransportError::Server { .. }
                | TransportError::RateLimit { .. }
        )
    }
}

/// Successful (2xx) provider response.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub headers: HeaderMap,
}

/// Verb surface toward the signature provider. The submission service is
/// written against this port so tests can substitute a scripted transport.
#[async_trait]
pub trait SignatureTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<ProviderResponse, TransportError>;
    async fn post(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError>;
    async fn put(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError>;
    async fn patch(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError>;
    async fn delete(&self, path: &str) -> Result<ProviderResponse, TransportError>;
}

/// Immutable provider connection settings, built once from configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self { base_url, api_key, timeout: DEFAULT_TIMEOUT }
    }
}

/// Authenticated reqwest-backed transport. Safe for concurrent use; the
/// underlying client shares a connection pool.
pub struct ProviderClient {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ProviderResponse, TransportError> {
        let url = self.url(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        debug!(%method, %url, "provider request");
        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Malformed(format!("failed to read response body: {e}")))?
            .to_vec();
        classify_status(status, &bytes)?;
        Ok(ProviderResponse { status, bytes, headers })
    }
}

fn classify_send_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

fn classify_status(status: u16, body: &[u8]) -> Result<(), TransportError> {
    let body_text = || String::from_utf8_lossy(body).to_string();
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(TransportError::Auth { status, body: body_text() }),
        429 => Err(TransportError::RateLimit { body: body_text() }),
        400..=499 => Err(TransportError::Client { status, body: body_text() }),
        500..=599 => Err(TransportError::Server { status, body: body_text() }),
        other => Err(TransportError::Malformed(format!("unexpected status {other}"))),
    }
}

#[async_trait]
impl SignatureTransport for ProviderClient {
    async fn get(&self, path: &str) -> Result<ProviderResponse, TransportError> {
        self.request(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError> {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<ProviderResponse, TransportError> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<ProviderResponse, TransportError> {
        self.request(Method::DELETE, path, None).await
    }
}
