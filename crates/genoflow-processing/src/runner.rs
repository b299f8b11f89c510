//! Validation and processing runs with their status transitions.

use crate::error::{RunnerError, RunnerResult};
use crate::executor::{ComputeExecutor, ComputeTask};
use genoflow_core::{CallContext, ProcessingStatus, ValidationResult, ValidationStatus};
use genoflow_db::JobStore;
use genoflow_storage::{ArtifactCategory, ObjectStorage};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Output files the compute image writes under `<mount>/raw_data`, as
/// (sub-directory, extension).
const ARTIFACT_FILES: [(&str, &str); 5] = [
    ("atlas_raw_data", "txt"),
    ("external_raw_data", "txt"),
    ("binary", "bed"),
    ("binary", "bim"),
    ("binary", "fam"),
];

/// A processing output file and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub category: ArtifactCategory,
    pub dest_name: String,
}

/// Files produced by a processing run for `barcode`.
pub fn artifact_manifest(raw_data_dir: &Path, barcode: &str) -> Vec<Artifact> {
    ARTIFACT_FILES
        .iter()
        .map(|(dir, ext)| {
            let dest_name = format!("{}.{}", barcode, ext);
            Artifact {
                path: raw_data_dir.join(dir).join(&dest_name),
                category: ArtifactCategory::from_raw_data_dir(dir),
                dest_name,
            }
        })
        .collect()
}

/// Race `fut` against the context.
async fn within<T>(
    ctx: &CallContext,
    stage: &'static str,
    fut: impl Future<Output = T>,
) -> RunnerResult<T> {
    tokio::select! {
        out = fut => Ok(out),
        _ = ctx.done() => Err(RunnerError::DeadlineExceeded { stage }),
    }
}

#[derive(Clone)]
pub struct Runner {
    store: Arc<dyn JobStore>,
    executor: Arc<dyn ComputeExecutor>,
    storage: Arc<dyn ObjectStorage>,
    raw_data_dir: PathBuf,
}

impl Runner {
    pub fn new(
        store: Arc<dyn JobStore>,
        executor: Arc<dyn ComputeExecutor>,
        storage: Arc<dyn ObjectStorage>,
        mount_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            store,
            executor,
            storage,
            raw_data_dir: mount_dir.as_ref().join("raw_data"),
        }
    }

    async fn fetch(&self, ctx: &CallContext, file_name: &str) -> RunnerResult<()> {
        within(ctx, "download", self.storage.download(file_name))
            .await?
            .map_err(|e| {
                tracing::error!(file_name = %file_name, error = %e, "Fetching source file failed");
                RunnerError::Download(e)
            })?;
        Ok(())
    }

    /// Validate `file_name` and record the outcome.
    ///
    /// With `dry_run` no status is written. With `fetch_remote` the source is
    /// downloaded first; a failed download changes no status. If `ctx` ends
    /// while the executable runs, the status stays `running`.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn run_validation(
        &self,
        ctx: &CallContext,
        file_name: &str,
        dry_run: bool,
        fetch_remote: bool,
    ) -> RunnerResult<ValidationResult> {
        if fetch_remote {
            self.fetch(ctx, file_name).await?;
        }

        if !dry_run {
            self.store
                .set_validation_status(ctx, file_name, ValidationStatus::Running)
                .await?;
        }

        let task = ComputeTask::Validate {
            input: file_name.to_string(),
        };
        let outcome = match within(ctx, "validation", self.executor.execute(&task)).await {
            Ok(Ok(stdout)) => ValidationResult::from_stdout(&stdout).map_err(|e| {
                tracing::error!(
                    error = %e,
                    data = %String::from_utf8_lossy(&stdout),
                    "Could not parse validation output"
                );
                RunnerError::from(e)
            }),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(err @ RunnerError::DeadlineExceeded { .. }) => {
                tracing::warn!(file_name = %file_name, "Validation abandoned, status left running");
                return Err(err);
            }
            Err(err) => {
                tracing::error!(file_name = %file_name, error = %err, "Validation failed");
                if !dry_run {
                    self.store
                        .set_validation_status(ctx, file_name, ValidationStatus::Error)
                        .await?;
                }
                return Err(err);
            }
        };

        tracing::info!(
            file_name = %file_name,
            mode = %result.mode,
            passed = result.passed,
            "Validation completed"
        );

        if !dry_run {
            let status = if result.passed {
                ValidationStatus::Valid
            } else {
                ValidationStatus::Invalid
            };
            self.store
                .set_validation_status(ctx, file_name, status)
                .await?;
        }

        Ok(result)
    }

    /// Process `file_name` and, unless `dry_run`, upload the artifacts.
    ///
    /// Status is written even in dry-run mode; only the upload is skipped.
    /// If `ctx` ends while the executable runs, the status stays `running`
    /// and the file is refused until it is reset.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn run_processing(
        &self,
        ctx: &CallContext,
        file_name: &str,
        barcode: &str,
        dry_run: bool,
        fetch_remote: bool,
    ) -> RunnerResult<()> {
        if fetch_remote {
            self.fetch(ctx, file_name).await?;
        }

        self.store
            .set_processing_status(ctx, file_name, ProcessingStatus::Running)
            .await?;

        let task = ComputeTask::Process {
            input: file_name.to_string(),
            barcode: barcode.to_string(),
        };
        let outcome = match within(ctx, "processing", self.executor.execute(&task)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RunnerError::from(e)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            // The container may still be running; `running` keeps the file
            // gated until an operator resets it.
            Err(err @ RunnerError::DeadlineExceeded { .. }) => {
                tracing::warn!(
                    file_name = %file_name,
                    barcode = %barcode,
                    "Processing abandoned, status left running"
                );
                return Err(err);
            }
            Err(err) => {
                tracing::error!(file_name = %file_name, barcode = %barcode, error = %err, "Processing failed");
                self.store
                    .set_processing_status(ctx, file_name, ProcessingStatus::Error)
                    .await?;
                return Err(err);
            }
        }

        self.store
            .set_processing_status(ctx, file_name, ProcessingStatus::Done)
            .await?;

        if !dry_run {
            self.upload_artifacts(barcode).await?;
        }

        tracing::info!(file_name = %file_name, barcode = %barcode, dry_run, "Processing completed");
        Ok(())
    }

    /// Upload every artifact concurrently; the first failure is returned and
    /// the remaining uploads are abandoned.
    async fn upload_artifacts(&self, barcode: &str) -> RunnerResult<()> {
        let mut uploads = JoinSet::new();
        for artifact in artifact_manifest(&self.raw_data_dir, barcode) {
            let storage = self.storage.clone();
            uploads.spawn(async move {
                storage
                    .upload(&artifact.path, artifact.category, &artifact.dest_name)
                    .await
            });
        }

        while let Some(joined) = uploads.join_next().await {
            joined?.map_err(|e| {
                tracing::error!(barcode = %barcode, error = %e, "Artifact upload failed");
                RunnerError::Upload(e)
            })?;
        }
        Ok(())
    }
}
