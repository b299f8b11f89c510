//! Scripted [`ComputeExecutor`] for tests.

use crate::executor::{ComputeExecutor, ComputeTask, ExecError};
use crate::runner::artifact_manifest;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// What the next invocation does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Exit 0 printing this output
    Stdout(Vec<u8>),
    /// Exit 0 printing nothing
    Succeed,
    /// Exit with `code`
    Fail { code: i32, stderr: String },
    /// Never finish
    Hang,
}

#[derive(Default)]
struct State {
    scripts: VecDeque<Script>,
    calls: Vec<ComputeTask>,
    skipped_artifacts: HashSet<String>,
}

/// Replays queued [`Script`]s in order; an empty queue behaves like
/// [`Script::Succeed`].
///
/// With an artifact root, a successful `process` invocation writes the
/// output files the real image would produce.
#[derive(Default)]
pub struct ScriptedExecutor {
    state: Mutex<State>,
    artifact_root: Option<PathBuf>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact_root(mut self, raw_data_dir: impl Into<PathBuf>) -> Self {
        self.artifact_root = Some(raw_data_dir.into());
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, script: Script) {
        self.state().scripts.push_back(script);
    }

    /// Do not write the artifact named `dest_name` on the next runs.
    pub fn skip_artifact(&self, dest_name: &str) {
        self.state().skipped_artifacts.insert(dest_name.to_string());
    }

    pub fn calls(&self) -> Vec<ComputeTask> {
        self.state().calls.clone()
    }

    async fn write_artifacts(&self, barcode: &str) -> Result<(), ExecError> {
        let Some(root) = &self.artifact_root else {
            return Ok(());
        };
        let skipped = self.state().skipped_artifacts.clone();
        for artifact in artifact_manifest(root, barcode) {
            if skipped.contains(&artifact.dest_name) {
                continue;
            }
            let write = async {
                if let Some(parent) = artifact.path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&artifact.path, artifact.dest_name.as_bytes()).await
            };
            write.await.map_err(|source| ExecError::Spawn {
                program: "scripted".to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeExecutor for ScriptedExecutor {
    async fn execute(&self, task: &ComputeTask) -> Result<Vec<u8>, ExecError> {
        let script = {
            let mut state = self.state();
            state.calls.push(task.clone());
            state.scripts.pop_front().unwrap_or(Script::Succeed)
        };

        match script {
            Script::Stdout(out) => Ok(out),
            Script::Succeed => {
                if let ComputeTask::Process { barcode, .. } = task {
                    self.write_artifacts(barcode).await?;
                }
                Ok(Vec::new())
            }
            Script::Fail { code, stderr } => Err(ExecError::Failed {
                code: Some(code),
                stderr,
            }),
            Script::Hang => std::future::pending().await,
        }
    }
}
