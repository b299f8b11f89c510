use genoflow_core::{ErrorMetadata, LogLevel};
use genoflow_db::StoreError;
use genoflow_processing::RunnerError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("no file associated with user {user_id}")]
    FileNotFound { user_id: String },

    #[error("file is not valid: {file_name}")]
    InvalidFile { file_name: String },

    #[error("processing is currently running for {file_name}")]
    ProcessingInProgress { file_name: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

pub type AgentResult<T> = Result<T, AgentError>;

impl AgentError {
    /// Whether a caller deadline expired somewhere below the agent.
    pub fn is_timeout(&self) -> bool {
        match self {
            AgentError::Store(e) => e.is_timeout(),
            AgentError::Runner(RunnerError::Store(e)) => e.is_timeout(),
            AgentError::Runner(RunnerError::DeadlineExceeded { .. }) => true,
            _ => false,
        }
    }
}

impl ErrorMetadata for AgentError {
    fn http_status_code(&self) -> u16 {
        match self {
            AgentError::UserNotFound { .. } | AgentError::FileNotFound { .. } => 404,
            AgentError::InvalidFile { .. } => 417,
            AgentError::ProcessingInProgress { .. } => 409,
            other if other.is_timeout() => 504,
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AgentError::UserNotFound { .. } => "USER_NOT_FOUND",
            AgentError::FileNotFound { .. } => "FILE_NOT_FOUND",
            AgentError::InvalidFile { .. } => "INVALID_FILE",
            AgentError::ProcessingInProgress { .. } => "PROCESSING_IN_PROGRESS",
            AgentError::Store(e) => e.error_code(),
            AgentError::Runner(e) => e.error_code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AgentError::ProcessingInProgress { .. } => true,
            AgentError::Store(e) => e.is_recoverable(),
            AgentError::Runner(e) => e.is_recoverable(),
            _ => false,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AgentError::Store(e) => e.client_message(),
            AgentError::Runner(e) => e.client_message(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AgentError::UserNotFound { .. }
            | AgentError::FileNotFound { .. }
            | AgentError::InvalidFile { .. } => LogLevel::Debug,
            AgentError::ProcessingInProgress { .. } => LogLevel::Warn,
            AgentError::Store(e) => e.log_level(),
            AgentError::Runner(e) => e.log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_errors_map_to_client_statuses() {
        let cases = [
            (AgentError::UserNotFound { user_id: "u".into() }, 404),
            (AgentError::FileNotFound { user_id: "u".into() }, 404),
            (AgentError::InvalidFile { file_name: "f".into() }, 417),
            (AgentError::ProcessingInProgress { file_name: "f".into() }, 409),
        ];
        for (err, status) in cases {
            assert_eq!(err.http_status_code(), status, "{}", err);
        }
    }

    #[test]
    fn store_timeout_is_gateway_timeout() {
        let err = AgentError::from(StoreError::ContextTimeoutExceeded {
            operation: "active_file",
        });
        assert!(err.is_timeout());
        assert_eq!(err.http_status_code(), 504);
        assert!(err.is_recoverable());
    }

    #[test]
    fn compute_deadline_is_gateway_timeout() {
        let err = AgentError::from(RunnerError::DeadlineExceeded { stage: "processing" });
        assert_eq!(err.http_status_code(), 504);
    }

    #[test]
    fn lost_creation_race_surfaces_as_server_error() {
        let err = AgentError::from(StoreError::AlreadyExists { id: "f1".into() });
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
    }
}
