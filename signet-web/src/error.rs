use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use signet_core::SignetError;

use crate::models::ErrorBody;

/// Translates the shared error taxonomy into HTTP status codes and a stable
/// machine-readable `code`. Raw provider payloads are never echoed here.
pub struct ApiError(pub SignetError);

impl From<SignetError> for ApiError {
    fn from(err: SignetError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SignetError::Validation(_) => StatusCode::BAD_REQUEST,
            SignetError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SignetError::NotFound(_) => StatusCode::NOT_FOUND,
            SignetError::ImmutableInStatus { .. } | SignetError::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            SignetError::ProviderRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SignetError::ProviderTransient(_) | SignetError::ProviderMalformed(_) => {
                StatusCode::BAD_GATEWAY
            }
            SignetError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            SignetError::ProviderAuth(_) | SignetError::Database { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if matches!(self.0, SignetError::ProviderAuth(_)) {
            // Operator attention needed; the credential is broken.
            error!(error = %self.0, "provider rejected our credentials");
        }

        let body = ErrorBody { message: self.0.to_string(), code: self.0.code() };
        (status, Json(body)).into_response()
    }
}
