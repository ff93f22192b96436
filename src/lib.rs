use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod query;
pub mod services;
pub mod state;
pub mod validation;

use crate::state::AppState;

/// Assemble the full router for the given state.
pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.config.api.max_upload_bytes;
    let local_media_dir = state.config.media.local_media_dir.clone();

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_routes())
        // Protected inventory API
        .merge(book_routes(state.clone()))
        // Locally hosted cover images
        .nest_service("/media", ServeDir::new(local_media_dir))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

fn user_routes() -> Router<AppState> {
    use handlers::public::users;

    Router::new()
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
}

fn book_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{books, dashboard};

    Router::new()
        .route("/books", get(books::list).post(books::create))
        .route("/books/stats", get(dashboard::stats))
        .route(
            "/books/:id",
            get(books::show).patch(books::update).delete(books::remove),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "BookHub API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant bookstore inventory backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "register": "POST /users (public)",
                "login": "POST /users/login (public)",
                "books": "/books[/:id] (protected)",
                "stats": "/books/stats (protected)",
                "media": "/media/* (public, locally hosted covers)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match database::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": err.to_string()
                }
            })),
        ),
    }
}
