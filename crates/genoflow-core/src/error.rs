//! Error metadata shared by every crate's error enum.
//!
//! Each crate defines its own `thiserror` enum (store, storage, runner, bus,
//! agent). They all implement [`ErrorMetadata`] so the HTTP layer, the bus
//! listener and the CLI can present and log them uniformly.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes such as a missing user
    Debug,
    /// Recoverable issues like an expired deadline
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORE_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same request
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Emit a tracing event for `err` at the level it asks for.
pub fn log_error<E>(handler: &str, err: &E)
where
    E: ErrorMetadata + std::fmt::Display,
{
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(handler = %handler, code = err.error_code(), error = %err, "Request failed")
        }
        LogLevel::Warn => {
            tracing::warn!(handler = %handler, code = err.error_code(), error = %err, "Request failed")
        }
        LogLevel::Error => {
            tracing::error!(handler = %handler, code = err.error_code(), error = %err, "Request failed")
        }
    }
}
