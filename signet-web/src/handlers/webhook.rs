use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use signet_core::SignetError;
use signet_pipeline::ProviderEvent;

use crate::error::ApiError;
use crate::models::WebhookPayload;
use crate::state::AppState;

const SECRET_HEADER: &str = "x-provider-secret";

/// Provider callback endpoint. Authenticated by a shared secret header; the
/// body is kept verbatim for the audit trail. Always answers 200 once the
/// event has been recorded, whatever the reconciler decided.
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if secret != Some(state.webhook_secret.as_str()) {
        warn!("webhook rejected: bad shared secret");
        return Err(SignetError::Unauthorized("invalid webhook secret".to_string()).into());
    }

    let payload: WebhookPayload = serde_json::from_str(&body)
        .map_err(|e| SignetError::Validation(format!("malformed webhook body: {e}")))?;

    let event = ProviderEvent {
        event: payload.event,
        provider_key: payload.data.id,
        raw_payload: body,
    };
    state.reconciler.handle(&event).await?;

    Ok(Json(json!({ "data": { "received": true } })))
}
