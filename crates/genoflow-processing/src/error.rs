use crate::executor::ExecError;
use genoflow_core::{ErrorMetadata, LogLevel};
use genoflow_db::StoreError;
use genoflow_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("fetching source file failed: {0}")]
    Download(#[source] StorageError),

    #[error("compute subprocess failed: {0}")]
    Subprocess(#[from] ExecError),

    #[error("{stage} did not finish before the deadline")]
    DeadlineExceeded { stage: &'static str },

    #[error("malformed validation output: {0}")]
    ResultParse(#[from] serde_json::Error),

    #[error("artifact upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("upload task failed: {0}")]
    UploadTask(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

impl ErrorMetadata for RunnerError {
    fn http_status_code(&self) -> u16 {
        match self {
            RunnerError::DeadlineExceeded { .. } => 504,
            RunnerError::Store(e) => e.http_status_code(),
            RunnerError::Download(e) => e.http_status_code(),
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RunnerError::Download(_) => "DOWNLOAD_ERROR",
            RunnerError::Subprocess(_) => "SUBPROCESS_ERROR",
            RunnerError::DeadlineExceeded { .. } => "COMPUTE_TIMEOUT",
            RunnerError::ResultParse(_) => "RESULT_PARSE_ERROR",
            RunnerError::Upload(_) | RunnerError::UploadTask(_) => "UPLOAD_ERROR",
            RunnerError::Store(e) => e.error_code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            RunnerError::Download(e) | RunnerError::Upload(e) => e.is_recoverable(),
            RunnerError::DeadlineExceeded { .. } => true,
            RunnerError::Store(e) => e.is_recoverable(),
            _ => false,
        }
    }

    fn client_message(&self) -> String {
        match self {
            RunnerError::Store(e) => e.client_message(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            RunnerError::Store(e) => e.log_level(),
            RunnerError::DeadlineExceeded { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
