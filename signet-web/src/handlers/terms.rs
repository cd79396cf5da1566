use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{DataEnvelope, ListQuery, TermPayload, TermView};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DataEnvelope<Vec<TermView>>>, ApiError> {
    let terms = state.terms.list(&query.into_filter()).await?;
    let data = terms.into_iter().map(TermView::from).collect();
    Ok(Json(DataEnvelope { data }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<TermPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<TermView>>), ApiError> {
    let term = state.terms.create(payload.into_term()).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope { data: term.into() })))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<TermView>>, ApiError> {
    let term = state.terms.get(id).await?;
    Ok(Json(DataEnvelope { data: term.into() }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TermPayload>,
) -> Result<Json<DataEnvelope<TermView>>, ApiError> {
    let term = state.terms.update(id, payload.into_term()).await?;
    Ok(Json(DataEnvelope { data: term.into() }))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.terms.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<TermView>>, ApiError> {
    let term = state.terms.validate(id).await?;
    Ok(Json(DataEnvelope { data: term.into() }))
}

pub async fn prepare_for_signing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<TermView>>, ApiError> {
    let term = state.terms.prepare_for_signing(id).await?;
    Ok(Json(DataEnvelope { data: term.into() }))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<TermView>>, ApiError> {
    let term = state.terms.submit_to_provider(id).await?;
    Ok(Json(DataEnvelope { data: term.into() }))
}
