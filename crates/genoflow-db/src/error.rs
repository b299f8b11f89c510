use genoflow_core::{ErrorMetadata, InvalidStatus, LogLevel};

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("already exists: {id}")]
    AlreadyExists { id: String },

    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),

    #[error("context timeout exceeded during {operation}")]
    ContextTimeoutExceeded { operation: &'static str },

    #[error("store execution error: {0}")]
    Execution(#[source] sqlx::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Classify a driver error. `id` names the natural key being written or read.
    pub(crate) fn from_sqlx(err: sqlx::Error, entity: &'static str, id: &str) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                entity,
                id: id.to_string(),
            },
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::AlreadyExists { id: id.to_string() }
            }
            other => StoreError::Execution(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::ContextTimeoutExceeded { .. })
    }
}

impl ErrorMetadata for StoreError {
    fn http_status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::AlreadyExists { .. } => 409,
            StoreError::InvalidStatus(_) => 400,
            StoreError::ContextTimeoutExceeded { .. } => 504,
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::AlreadyExists { .. } => "ALREADY_EXISTS",
            StoreError::InvalidStatus(_) => "INVALID_STATUS",
            StoreError::ContextTimeoutExceeded { .. } => "STORE_TIMEOUT",
            StoreError::Execution(_) | StoreError::Task(_) => "STORE_ERROR",
            StoreError::Migration(_) => "MIGRATION_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::ContextTimeoutExceeded { .. } | StoreError::Execution(_)
        )
    }

    fn client_message(&self) -> String {
        match self {
            StoreError::Execution(_) | StoreError::Task(_) | StoreError::Migration(_) => {
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StoreError::NotFound { .. } => LogLevel::Debug,
            StoreError::AlreadyExists { .. }
            | StoreError::InvalidStatus(_)
            | StoreError::ContextTimeoutExceeded { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = StoreError::from_sqlx(sqlx::Error::RowNotFound, "user", "u1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "user not found: u1");
    }

    #[test]
    fn other_driver_errors_are_execution_errors() {
        let err = StoreError::from_sqlx(sqlx::Error::PoolTimedOut, "user", "u1");
        assert!(matches!(err, StoreError::Execution(_)));
        assert!(!err.is_timeout());
    }

    #[test]
    fn timeout_is_recoverable_and_distinct() {
        let err = StoreError::ContextTimeoutExceeded {
            operation: "create_user",
        };
        assert!(err.is_timeout());
        assert!(err.is_recoverable());
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.error_code(), "STORE_TIMEOUT");
    }
}
