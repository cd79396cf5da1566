use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use signet_core::SignetError;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_TTL_SECS: i64 = 86_400;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn issue_token(email: &str, secret: &str) -> Result<String, SignetError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: email.to_string(),
        iat: now as usize,
        exp: (now + TOKEN_TTL_SECS) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| SignetError::Unauthorized(format!("could not issue token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, SignetError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| SignetError::Unauthorized("invalid or expired token".to_string()))
}

/// Middleware guarding the back-office routes. Expects `Authorization: Bearer <jwt>`.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SignetError::Unauthorized("missing authorization header".to_string()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| SignetError::Unauthorized("malformed authorization header".to_string()))?;

    verify_token(token, &state.jwt_secret)?;
    Ok(next.run(request).await)
}
