//! Storage abstraction trait

use crate::layout::ArtifactCategory;
use async_trait::async_trait;
use genoflow_core::{ErrorMetadata, LogLevel};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorMetadata for StorageError {
    fn http_status_code(&self) -> u16 {
        match self {
            StorageError::NotFound(_) => 404,
            StorageError::InvalidKey(_) => 400,
            _ => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            StorageError::UploadFailed(_) => "UPLOAD_FAILED",
            StorageError::DownloadFailed(_) => "DOWNLOAD_FAILED",
            StorageError::NotFound(_) => "OBJECT_NOT_FOUND",
            StorageError::InvalidKey(_) => "INVALID_KEY",
            StorageError::IoError(_) => "STORAGE_IO_ERROR",
            StorageError::ConfigError(_) => "STORAGE_CONFIG_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::UploadFailed(_) | StorageError::DownloadFailed(_)
        )
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StorageError::NotFound(_) | StorageError::InvalidKey(_) => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Object storage used by the compute runner.
///
/// Implementations are shared across tasks and hold no per-call state.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local file into the folder for `category` under `dest_name`.
    /// Returns the object key.
    async fn upload(
        &self,
        local_path: &Path,
        category: ArtifactCategory,
        dest_name: &str,
    ) -> StorageResult<String>;

    /// Fetch a user-uploaded source file into the staging directory.
    /// Returns the local path it was written to.
    async fn download(&self, file_name: &str) -> StorageResult<PathBuf>;

    /// Directory downloads are written to.
    fn staging_dir(&self) -> &Path;
}

/// Reject names that would escape the staging directory.
pub(crate) fn staging_path(staging_dir: &Path, file_name: &str) -> StorageResult<PathBuf> {
    if file_name.is_empty()
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid source file name: {}",
            file_name
        )));
    }
    Ok(staging_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_rejects_traversal() {
        let dir = Path::new("/mnt/source");
        assert!(staging_path(dir, "../etc/passwd").is_err());
        assert!(staging_path(dir, "a/b").is_err());
        assert!(staging_path(dir, "").is_err());
        assert_eq!(
            staging_path(dir, "u_sample.vcf").unwrap(),
            PathBuf::from("/mnt/source/u_sample.vcf")
        );
    }
}
