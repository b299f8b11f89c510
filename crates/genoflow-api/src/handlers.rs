use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessingStatusResponse {
    /// `NA`, `new`, `running`, `done` or `error`
    pub current_status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductCodeResponse {
    pub product_code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// `GET /api/v1/status/{user_id}`
#[utoipa::path(
    get,
    path = "/api/v1/status/{user_id}",
    tag = "status",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Processing status of the active file", body = ProcessingStatusResponse),
        (status = 404, description = "Unknown user or no file", body = ErrorResponse),
        (status = 504, description = "Store deadline exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_processing_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProcessingStatusResponse>, HttpAppError> {
    const HANDLER: &str = "get-processing-status";
    tracing::info!(handler = HANDLER, "HTTP endpoint hit");

    let ctx = state.request_context();
    let current_status = state
        .agent
        .processing_status_for(&ctx, &user_id)
        .await
        .map_err(|e| HttpAppError::new(HANDLER, e))?;
    Ok(Json(ProcessingStatusResponse { current_status }))
}

/// `GET /api/v1/product/{user_id}`
#[utoipa::path(
    get,
    path = "/api/v1/product/{user_id}",
    tag = "product",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Product code derived at validation", body = ProductCodeResponse),
        (status = 404, description = "Unknown user or no product code", body = ErrorResponse),
        (status = 504, description = "Store deadline exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_product_code(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProductCodeResponse>, HttpAppError> {
    const HANDLER: &str = "get-product-code";
    tracing::info!(handler = HANDLER, "HTTP endpoint hit");

    let ctx = state.request_context();
    let product_code = state
        .agent
        .product_code_for(&ctx, &user_id)
        .await
        .map_err(|e| HttpAppError::new(HANDLER, e))?;
    Ok(Json(ProductCodeResponse { product_code }))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
