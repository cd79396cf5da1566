pub mod documents;
pub mod terms;
pub mod users;
pub mod webhook;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
