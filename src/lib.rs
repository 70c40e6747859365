pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod routes;
pub mod state;
pub mod validate;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::media::MediaStore;
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    let media = MediaStore::new(config.media_root.clone());
    let media_service = ServeDir::new(media.root());
    let media_url = config.media_url.clone();
    let max_upload_size = config.max_upload_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        media,
    });

    Router::new()
        .merge(routes::api_routes(max_upload_size))
        .nest_service(&media_url, media_service)
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
