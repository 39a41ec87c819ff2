pub mod api;
pub mod config;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::RelayConfig;
use crate::services::media_hosting::MediaHost;
use crate::services::object_store::ObjectStore;
use crate::services::staging::StagingArea;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    routing::post,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::set_header::SetResponseHeaderLayer;

#[derive(Clone)]
pub struct AppState {
    pub staging: Arc<StagingArea>,
    pub object_store: Arc<dyn ObjectStore>,
    pub media_host: Arc<dyn MediaHost>,
    pub upload_permits: Arc<Semaphore>,
    pub config: RelayConfig,
}

impl AppState {
    pub fn new(
        staging: StagingArea,
        object_store: Arc<dyn ObjectStore>,
        media_host: Arc<dyn MediaHost>,
        config: RelayConfig,
    ) -> Self {
        Self {
            staging: Arc::new(staging),
            object_store,
            media_host,
            upload_permits: Arc::new(Semaphore::new(config.max_concurrent_uploads)),
            config,
        }
    }
}

/// Headers attached to every response, including errors and preflights.
pub const RESPONSE_HEADERS: [(HeaderName, &str); 4] = [
    (header::CONTENT_TYPE, "application/json"),
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS, POST, GET"),
    (header::ACCESS_CONTROL_MAX_AGE, "2592000"),
];

/// Largest accepted request body: the file itself plus room for the
/// multipart framing around it.
pub fn request_body_limit(max_file_size: usize) -> usize {
    max_file_size.saturating_add(10 * 1024 * 1024)
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = request_body_limit(state.config.max_file_size);

    let mut app = Router::new()
        .route(
            "/upload",
            post(api::handlers::upload_file)
                .options(api::handlers::preflight)
                .fallback(api::handlers::fallback),
        )
        .fallback(api::handlers::fallback)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit));

    for (name, value) in RESPONSE_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ));
    }

    app.with_state(state)
}
