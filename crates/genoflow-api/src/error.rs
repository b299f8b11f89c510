//! HTTP error response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use genoflow_agent::AgentError;
use genoflow_core::{log_error, ErrorMetadata};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper so [`AgentError`] can be returned from handlers.
#[derive(Debug)]
pub struct HttpAppError {
    handler: &'static str,
    error: AgentError,
}

impl HttpAppError {
    pub fn new(handler: &'static str, error: AgentError) -> Self {
        Self { handler, error }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(self.handler, &self.error);

        let status = StatusCode::from_u16(self.error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: self.error.client_message(),
            code: self.error.error_code().to_string(),
            recoverable: self.error.is_recoverable(),
        });
        (status, body).into_response()
    }
}
