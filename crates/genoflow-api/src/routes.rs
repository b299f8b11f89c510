use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Json, Router};
use genoflow_core::ServerConfig;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub const API_PREFIX: &str = "/api/v1";
pub const OPENAPI_PATH: &str = "/api/v1/openapi.json";
pub const DOC_PATH: &str = "/api/v1/doc";

/// Cap on requests served at once
const HTTP_CONCURRENCY_LIMIT: usize = 1024;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status/{user_id}", get(handlers::get_processing_status))
        .route("/product/{user_id}", get(handlers::get_product_code));

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(handlers::health))
        .route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
        .merge(RapiDoc::new(OPENAPI_PATH).path(DOC_PATH))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bound request bodies by the read timeout and responses by the write
/// timeout. An expired response deadline answers `408 Request Timeout`.
pub fn with_timeouts(router: Router, server: &ServerConfig) -> Router {
    tracing::info!(
        read_timeout_ms = server.read_timeout.as_millis() as u64,
        write_timeout_ms = server.write_timeout.as_millis() as u64,
        "Request timeout layers enabled"
    );
    router
        .layer(TimeoutLayer::new(server.write_timeout))
        .layer(RequestBodyTimeoutLayer::new(server.read_timeout))
}
