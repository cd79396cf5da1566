use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{DataEnvelope, DocumentPayload, DocumentView, ListQuery};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DataEnvelope<Vec<DocumentView>>>, ApiError> {
    let documents = state.documents.list(&query.into_filter()).await?;
    let data = documents.into_iter().map(DocumentView::from).collect();
    Ok(Json(DataEnvelope { data }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<DocumentPayload>,
) -> Result<(StatusCode, Json<DataEnvelope<DocumentView>>), ApiError> {
    let document = state.documents.create(payload.into_document()).await?;
    Ok((StatusCode::CREATED, Json(DataEnvelope { data: document.into() })))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<DocumentView>>, ApiError> {
    let document = state.documents.get(id).await?;
    Ok(Json(DataEnvelope { data: document.into() }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentPayload>,
) -> Result<Json<DataEnvelope<DocumentView>>, ApiError> {
    let document = state.documents.update(id, payload.into_document()).await?;
    Ok(Json(DataEnvelope { data: document.into() }))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<DocumentView>>, ApiError> {
    let document = state.documents.validate(id).await?;
    Ok(Json(DataEnvelope { data: document.into() }))
}

pub async fn prepare_for_signing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<DocumentView>>, ApiError> {
    let document = state.documents.prepare_for_signing(id).await?;
    Ok(Json(DataEnvelope { data: document.into() }))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<DocumentView>>, ApiError> {
    let document = state.documents.submit_to_provider(id).await?;
    Ok(Json(DataEnvelope { data: document.into() }))
}
