use crate::layout::{ArtifactCategory, FolderLayout};
use crate::traits::{staging_path, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use genoflow_core::S3Config;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// S3-compatible storage.
///
/// Artifacts and source uploads live in separate buckets with separate
/// credentials, so two clients are kept.
#[derive(Clone)]
pub struct S3Storage {
    artifacts: AmazonS3,
    uploads: AmazonS3,
    artifact_bucket: String,
    upload_bucket: String,
    layout: FolderLayout,
    staging_dir: PathBuf,
}

fn build_store(
    config: &S3Config,
    bucket: &str,
    access_key_id: Option<&String>,
    secret_access_key: Option<&String>,
) -> StorageResult<AmazonS3> {
    let allow_http = config.endpoint.starts_with("http://");
    let mut builder = AmazonS3Builder::from_env()
        .with_region(config.region.clone())
        .with_bucket_name(bucket.to_string())
        .with_endpoint(config.endpoint.clone())
        .with_allow_http(allow_http);

    if let (Some(key), Some(secret)) = (access_key_id, secret_access_key) {
        builder = builder
            .with_access_key_id(key.clone())
            .with_secret_access_key(secret.clone());
    }

    builder
        .build()
        .map_err(|e| StorageError::ConfigError(e.to_string()))
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `config` - endpoint, buckets, folders and both credential pairs
    /// * `staging_dir` - local directory downloads are written into
    pub fn new(config: &S3Config, staging_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let artifacts = build_store(
            config,
            &config.bucket,
            config.access_key_id.as_ref(),
            config.secret_access_key.as_ref(),
        )?;
        let uploads = build_store(
            config,
            &config.upload_bucket,
            config.upload_access_key_id.as_ref(),
            config.upload_secret_access_key.as_ref(),
        )?;

        Ok(S3Storage {
            artifacts,
            uploads,
            artifact_bucket: config.bucket.clone(),
            upload_bucket: config.upload_bucket.clone(),
            layout: FolderLayout::from_config(config),
            staging_dir: staging_dir.into(),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        local_path: &Path,
        category: ArtifactCategory,
        dest_name: &str,
    ) -> StorageResult<String> {
        let key = self.layout.artifact_key(category, dest_name);
        let data = fs::read(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!("reading {}: {}", local_path.display(), e))
        })?;
        let size = data.len() as u64;
        let location = ObjectPath::from(key.clone());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .artifacts
            .put(&location, PutPayload::from(Bytes::from(data)))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.artifact_bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.artifact_bucket,
            key = %key,
            category = %category,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(key)
    }

    async fn download(&self, file_name: &str) -> StorageResult<PathBuf> {
        let target = staging_path(&self.staging_dir, file_name)?;
        let key = self.layout.source_key(file_name);
        let location = ObjectPath::from(key.clone());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.uploads.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.clone()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.upload_bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        let size = bytes.len() as u64;

        fs::create_dir_all(&self.staging_dir).await?;
        fs::write(&target, &bytes).await?;

        tracing::info!(
            bucket = %self.upload_bucket,
            key = %key,
            path = %target.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(target)
    }

    fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}
