use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use signet_core::{SignetError, User};

use crate::auth;
use crate::error::ApiError;
use crate::models::{DataEnvelope, LoginPayload, TokenResponse, UserPayload, UserView};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .storage
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| SignetError::Unauthorized("invalid credentials".to_string()))?;

    if user.password_digest != auth::password_digest(&payload.password) {
        return Err(SignetError::Unauthorized("invalid credentials".to_string()).into());
    }

    let token = auth::issue_token(&user.email, &state.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

/// Creating a user is idempotent by email: replaying the same request
/// returns the existing account instead of erroring.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<UserView>>), ApiError> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(SignetError::Validation("user email is invalid".to_string()).into());
    }
    if payload.password.is_empty() {
        return Err(SignetError::Validation("password must not be empty".to_string()).into());
    }

    if let Some(existing) = state.storage.get_user_by_email(&payload.email).await? {
        return Ok((StatusCode::OK, Json(DataEnvelope { data: existing.into() })));
    }

    let mut user = User {
        id: None,
        name: payload.name,
        email: payload.email,
        password_digest: auth::password_digest(&payload.password),
        created_at: Utc::now(),
    };
    state.storage.create_user(&mut user).await?;
    info!(email = %user.email, "user created");
    Ok((StatusCode::CREATED, Json(DataEnvelope { data: user.into() })))
}
