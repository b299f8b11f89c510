//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Genoflow API",
        version = "0.1.0",
        description = "Read-only lookups of processing status and product codes. Versioned under /api/v1/."
    ),
    paths(
        handlers::get_processing_status,
        handlers::get_product_code,
        handlers::health,
    ),
    components(schemas(
        handlers::ProcessingStatusResponse,
        handlers::ProductCodeResponse,
        handlers::HealthResponse,
        ErrorResponse,
    )),
    tags(
        (name = "status", description = "Processing status"),
        (name = "product", description = "Product codes"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
