use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers::{self, documents, terms, users, webhook};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let document_routes = Router::new()
        .route("/", get(documents::list).post(documents::create))
        .route(
            "/:id",
            get(documents::get_by_id).put(documents::update).delete(documents::remove),
        )
        .route("/:id/validate", post(documents::validate))
        .route("/:id/prepare-for-signing", post(documents::prepare_for_signing))
        .route("/:id/submit", post(documents::submit));

    let term_routes = Router::new()
        .route("/", get(terms::list).post(terms::create))
        .route("/:id", get(terms::get_by_id).put(terms::update).delete(terms::remove))
        .route("/:id/validate", post(terms::validate))
        .route("/:id/prepare-for-signing", post(terms::prepare_for_signing))
        .route("/:id/submit", post(terms::submit));

    let protected = Router::new()
        .nest("/documents", document_routes)
        .nest("/auto-signature-terms", term_routes)
        .route("/users", post(users::create))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .merge(protected)
        .route("/auth/login", post(users::login))
        .route("/webhooks/provider", post(webhook::receive))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
