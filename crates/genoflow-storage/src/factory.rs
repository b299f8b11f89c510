#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
#[cfg(feature = "storage-local")]
use crate::FolderLayout;
#[cfg(not(all(feature = "storage-s3", feature = "storage-local")))]
use crate::StorageError;
use crate::{ObjectStorage, StorageResult};
use genoflow_core::{Config, StorageBackend};
use std::path::PathBuf;
use std::sync::Arc;

/// Subdirectory of the compute mount that source files are staged in.
pub const STAGING_SUBDIR: &str = "source";

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn ObjectStorage>> {
    let staging_dir = PathBuf::from(&config.compute.mount_dir).join(STAGING_SUBDIR);

    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let storage = S3Storage::new(&config.s3, staging_dir)?;
            tracing::info!(
                bucket = %config.s3.bucket,
                upload_bucket = %config.s3.upload_bucket,
                "Using S3 object storage"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let layout = FolderLayout::from_config(&config.s3);
            let storage =
                LocalStorage::new(&config.local_storage_path, layout, staging_dir).await?;
            tracing::info!(path = %config.local_storage_path, "Using local object storage");
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
