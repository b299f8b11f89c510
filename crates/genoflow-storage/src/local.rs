use crate::layout::{ArtifactCategory, FolderLayout};
use crate::traits::{staging_path, ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage.
///
/// `base_path` plays the role of the bucket: artifacts land in
/// `base_path/<category folder>/` and sources are read from
/// `base_path/<upload folder>/`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    layout: FolderLayout,
    staging_dir: PathBuf,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        layout: FolderLayout,
        staging_dir: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            layout,
            staging_dir: staging_dir.into(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a storage key to a filesystem path under `base_path`.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(
        &self,
        local_path: &Path,
        category: ArtifactCategory,
        dest_name: &str,
    ) -> StorageResult<String> {
        let key = self.layout.artifact_key(category, dest_name);
        let target = self.key_to_path(&key)?;
        self.ensure_parent_dir(&target).await?;

        let size = fs::copy(local_path, &target).await.map_err(|e| {
            tracing::error!(
                error = %e,
                source = %local_path.display(),
                key = %key,
                "Local upload failed"
            );
            StorageError::UploadFailed(format!("{}: {}", local_path.display(), e))
        })?;

        tracing::info!(key = %key, category = %category, size_bytes = size, "Local upload successful");
        Ok(key)
    }

    async fn download(&self, file_name: &str) -> StorageResult<PathBuf> {
        let target = staging_path(&self.staging_dir, file_name)?;
        let key = self.layout.source_key(file_name);
        let source = self.key_to_path(&key)?;

        if !fs::try_exists(&source).await? {
            return Err(StorageError::NotFound(key));
        }

        fs::create_dir_all(&self.staging_dir).await?;
        let size = fs::copy(&source, &target)
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(key = %key, path = %target.display(), size_bytes = size, "Local download successful");
        Ok(target)
    }

    fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> FolderLayout {
        FolderLayout {
            internal: "internal".into(),
            external: "external".into(),
            binary: "binary".into(),
            upload: "upload".into(),
        }
    }

    async fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(dir.path().join("bucket"), layout(), dir.path().join("source"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upload_places_file_in_category_folder() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let artifact = dir.path().join("B1.bed");
        fs::write(&artifact, b"bed").await.unwrap();

        let key = storage
            .upload(&artifact, ArtifactCategory::Binary, "B1.bed")
            .await
            .unwrap();

        assert_eq!(key, "binary/B1.bed");
        let stored = fs::read(dir.path().join("bucket/binary/B1.bed")).await.unwrap();
        assert_eq!(stored, b"bed");
    }

    #[tokio::test]
    async fn upload_of_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let err = storage
            .upload(&dir.path().join("nope.txt"), ArtifactCategory::Internal, "nope.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn download_stages_source_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        fs::create_dir_all(dir.path().join("bucket/upload")).await.unwrap();
        fs::write(dir.path().join("bucket/upload/u1_s.vcf"), b"##fileformat=VCF")
            .await
            .unwrap();

        let path = storage.download("u1_s.vcf").await.unwrap();

        assert_eq!(path, dir.path().join("source/u1_s.vcf"));
        assert_eq!(fs::read(path).await.unwrap(), b"##fileformat=VCF");
    }

    #[tokio::test]
    async fn download_of_unknown_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let err = storage.download("missing.vcf").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref key) if key == "upload/missing.vcf"));
    }
}
