use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use signet_core::storage::{MemoryStorage, Storage};
use signet_core::{Status, User};
use signet_pipeline::client::{ProviderResponse, SignatureTransport, TransportError};
use signet_web::auth::password_digest;
use signet_web::router::build_router;
use signet_web::state::AppState;

const JWT_SECRET: &str = "test-jwt-secret";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

struct FakeTransport {
    responses: Mutex<VecDeque<Result<ProviderResponse, TransportError>>>,
}

impl FakeTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(VecDeque::new()) })
    }

    async fn enqueue_ok(&self, status: u16, body: Value) {
        self.responses.lock().await.push_back(Ok(ProviderResponse {
            status,
            bytes: body.to_string().into_bytes(),
            headers: Default::default(),
        }));
    }

    async fn enqueue_err(&self, err: TransportError) {
        self.responses.lock().await.push_back(Err(err));
    }

    async fn next(&self) -> Result<ProviderResponse, TransportError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

#[async_trait]
impl SignatureTransport for FakeTransport {
    async fn get(&self, _path: &str) -> Result<ProviderResponse, TransportError> {
        self.next().await
    }
    async fn post(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        self.next().await
    }
    async fn put(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        self.next().await
    }
    async fn patch(&self, _path: &str, _body: &Value) -> Result<ProviderResponse, TransportError> {
        self.next().await
    }
    async fn delete(&self, _path: &str) -> Result<ProviderResponse, TransportError> {
        self.next().await
    }
}

async fn test_app() -> (Router, Arc<MemoryStorage>, Arc<FakeTransport>) {
    let storage = Arc::new(MemoryStorage::default());
    let transport = FakeTransport::new();

    let mut user = User {
        id: None,
        name: "Ops".to_string(),
        email: "ops@example.com".to_string(),
        password_digest: password_digest("hunter2"),
        created_at: Utc::now(),
    };
    storage.create_user(&mut user).await.unwrap();

    let state = AppState::new(
        storage.clone() as Arc<dyn Storage>,
        transport.clone(),
        JWT_SECRET.to_string(),
        WEBHOOK_SECRET.to_string(),
    );
    (build_router(state), storage, transport)
}

async fn login(app: &Router) -> String {
    let request = Request::post("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "ops@example.com", "password": "hunter2" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn authed_post(path: &str, token: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_empty_post(path: &str, token: &str) -> Request<Body> {
    Request::post(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn document_body() -> Value {
    json!({
        "name": "contract.pdf",
        "file_path": "/files/contract.pdf",
        "file_size": 2048,
        "mime_type": "application/pdf",
        "description": "Q3 supplier contract"
    })
}

#[tokio::test]
async fn health_is_open() {
    let (app, _, _) = test_app().await;
    let response =
        app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let (app, _, _) = test_app().await;
    let response =
        app.clone().oneshot(Request::get("/documents").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::get("/documents")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let (app, _, _) = test_app().await;
    let request = Request::post("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "ops@example.com", "password": "wrong" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_document_returns_envelope_without_raw_payload() {
    let (app, _, _) = test_app().await;
    let token = login(&app).await;

    let response = app.oneshot(authed_post("/documents", &token, document_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "draft");
    assert_eq!(body["data"]["name"], "contract.pdf");
    assert!(body["data"]["provider_key"].is_null());
    assert!(body["data"].get("provider_raw_payload").is_none());
}

#[tokio::test]
async fn invalid_document_create_is_a_validation_error() {
    let (app, _, _) = test_app().await;
    let token = login(&app).await;

    let mut bad = document_body();
    bad["file_size"] = json!(0);
    let response = app.oneshot(authed_post("/documents", &token, bad)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn submit_from_draft_conflicts() {
    let (app, _, _) = test_app().await;
    let token = login(&app).await;

    let response =
        app.clone().oneshot(authed_post("/documents", &token, document_body())).await.unwrap();
    let body = read_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn full_signing_flow_over_http() {
    let (app, storage, transport) = test_app().await;
    let token = login(&app).await;
    transport.enqueue_ok(201, json!({ "data": { "id": "pk-http-1" } })).await;

    let response =
        app.clone().oneshot(authed_post("/documents", &token, document_body())).await.unwrap();
    let body = read_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    for step in ["validate", "prepare-for-signing"] {
        let response = app
            .clone()
            .oneshot(authed_empty_post(&format!("/documents/{id}/{step}"), &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["data"]["provider_key"], "pk-http-1");

    // Provider callback closes the loop.
    let webhook = Request::post("/webhooks/provider")
        .header("x-provider-secret", WEBHOOK_SECRET)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "event": "document.finished", "data": { "id": "pk-http-1" } }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(webhook).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = storage
        .get_document_by_provider_key("pk-http-1")
        .await
        .unwrap()
        .expect("document persisted");
    assert_eq!(doc.status, Status::Signed);
}

/// Creates a document and walks it to Processing, returning its id.
async fn processing_document(app: &Router, token: &str) -> String {
    let response =
        app.clone().oneshot(authed_post("/documents", token, document_body())).await.unwrap();
    let body = read_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    for step in ["validate", "prepare-for-signing"] {
        let response = app
            .clone()
            .oneshot(authed_empty_post(&format!("/documents/{id}/{step}"), token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    id
}

#[tokio::test]
async fn provider_server_error_surfaces_as_bad_gateway() {
    let (app, _, transport) = test_app().await;
    let token = login(&app).await;
    transport.enqueue_err(TransportError::Server { status: 503, body: "unavailable".into() }).await;
    let id = processing_document(&app, &token).await;

    let response = app
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert_eq!(body["code"], "provider_transient");
}

#[tokio::test]
async fn provider_timeout_surfaces_as_gateway_timeout() {
    let (app, storage, transport) = test_app().await;
    let token = login(&app).await;
    transport.enqueue_err(TransportError::Timeout("deadline exceeded".into())).await;
    let id = processing_document(&app, &token).await;

    let response = app
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = read_json(response).await;
    assert_eq!(body["code"], "provider_timeout");

    // Transient failures never advance the record.
    let doc = storage
        .get_document_by_id(id.parse().unwrap())
        .await
        .unwrap()
        .expect("document persisted");
    assert_eq!(doc.status, Status::Processing);
    assert!(doc.provider_key.is_none());
}

#[tokio::test]
async fn provider_rejection_surfaces_as_unprocessable_entity() {
    let (app, _, transport) = test_app().await;
    let token = login(&app).await;
    transport
        .enqueue_err(TransportError::Client {
            status: 422,
            body: r#"{"errors":[{"detail":"invalid signer"}]}"#.into(),
        })
        .await;
    let id = processing_document(&app, &token).await;

    let response = app
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["code"], "provider_rejected");
    // The provider body stays in the audit trail, not in the API response.
    assert!(!body["message"].as_str().unwrap().contains("invalid signer"));
}

#[tokio::test]
async fn provider_auth_failure_surfaces_as_internal_error() {
    let (app, _, transport) = test_app().await;
    let token = login(&app).await;
    transport
        .enqueue_err(TransportError::Auth { status: 401, body: String::new() })
        .await;
    let id = processing_document(&app, &token).await;

    let response = app
        .oneshot(authed_empty_post(&format!("/documents/{id}/submit"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["code"], "provider_auth");
}

#[tokio::test]
async fn webhook_requires_shared_secret() {
    let (app, _, _) = test_app().await;
    let request = Request::post("/webhooks/provider")
        .header("x-provider-secret", "wrong")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "event": "document.finished", "data": { "id": "pk-1" } }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_for_unknown_key_is_acknowledged_and_audited() {
    let (app, storage, _) = test_app().await;
    let request = Request::post("/webhooks/provider")
        .header("x-provider-secret", WEBHOOK_SECRET)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "event": "document.finished", "data": { "id": "pk-missing" } }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = storage.list_webhook_events("pk-missing").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, "unknown_key");
}

#[tokio::test]
async fn user_creation_is_idempotent_by_email() {
    let (app, _, _) = test_app().await;
    let token = login(&app).await;

    let payload = json!({ "name": "Aud", "email": "aud@example.com", "password": "pw" });
    let response =
        app.clone().oneshot(authed_post("/users", &token, payload.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(authed_post("/users", &token, payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["email"], "aud@example.com");
    assert!(body["data"].get("password_digest").is_none());
}

#[tokio::test]
async fn update_of_sent_document_conflicts_with_immutable_code() {
    let (app, _, transport) = test_app().await;
    let token = login(&app).await;
    transport.enqueue_ok(201, json!({ "data": { "id": "pk-http-2" } })).await;

    let response =
        app.clone().oneshot(authed_post("/documents", &token, document_body())).await.unwrap();
    let body = read_json(response).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    for step in ["validate", "prepare-for-signing", "submit"] {
        app.clone()
            .oneshot(authed_empty_post(&format!("/documents/{id}/{step}"), &token))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(
            Request::put(format!("/documents/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(document_body().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["code"], "immutable_in_status");
}
