//! Launching the compute container.

use async_trait::async_trait;
use genoflow_core::ComputeConfig;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Entry script inside the compute image.
const ENTRYPOINT: &str = "main.py";
/// Where the host mount directory appears inside the container.
const CONTAINER_MOUNT: &str = "/mnt";

/// One invocation of the compute executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeTask {
    Validate { input: String },
    Process { input: String, barcode: String },
}

impl ComputeTask {
    /// Arguments passed after the image name.
    pub fn args(&self) -> Vec<String> {
        match self {
            ComputeTask::Validate { input } => vec![
                ENTRYPOINT.to_string(),
                "validate".to_string(),
                "--input".to_string(),
                input.clone(),
            ],
            ComputeTask::Process { input, barcode } => vec![
                ENTRYPOINT.to_string(),
                "process".to_string(),
                "--input".to_string(),
                input.clone(),
                "--barcode".to_string(),
                barcode.clone(),
            ],
        }
    }

    /// Validation reports its verdict on stdout; processing output goes
    /// straight to the service's own stdout.
    pub fn captures_stdout(&self) -> bool {
        matches!(self, ComputeTask::Validate { .. })
    }

    pub fn input(&self) -> &str {
        match self {
            ComputeTask::Validate { input } | ComputeTask::Process { input, .. } => input,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compute exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

/// Runs a [`ComputeTask`] and returns its standard output, empty when the
/// task does not capture it.
///
/// A non-zero exit is an [`ExecError::Failed`].
#[async_trait]
pub trait ComputeExecutor: Send + Sync {
    async fn execute(&self, task: &ComputeTask) -> Result<Vec<u8>, ExecError>;
}

/// Runs the compute image with `docker run --rm -v <mount>:/mnt <image> ...`.
///
/// The child is not killed if the caller stops waiting for it.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    program: String,
    image: String,
    mount_dir: String,
}

impl DockerExecutor {
    pub fn new(config: &ComputeConfig) -> Self {
        Self {
            program: config.exec.clone(),
            image: config.image.clone(),
            mount_dir: config.mount_dir.clone(),
        }
    }

    pub fn command_args(&self, task: &ComputeTask) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", self.mount_dir, CONTAINER_MOUNT),
            self.image.clone(),
        ];
        args.extend(task.args());
        args
    }
}

#[async_trait]
impl ComputeExecutor for DockerExecutor {
    async fn execute(&self, task: &ComputeTask) -> Result<Vec<u8>, ExecError> {
        let args = self.command_args(task);
        tracing::info!(program = %self.program, args = ?args, "Starting compute");
        let start = std::time::Instant::now();

        let stdout = if task.captures_stdout() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(
                code = ?output.status.code(),
                duration_ms = elapsed_ms,
                stderr = %stderr,
                "Compute failed"
            );
            return Err(ExecError::Failed {
                code: output.status.code(),
                stderr,
            });
        }

        tracing::info!(duration_ms = elapsed_ms, "Compute finished");
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(program: &str) -> DockerExecutor {
        DockerExecutor::new(&ComputeConfig {
            exec: program.to_string(),
            image: "upload_app:latest".to_string(),
            mount_dir: "/data/mnt".to_string(),
        })
    }

    #[test]
    fn validate_command_line() {
        let args = executor("docker").command_args(&ComputeTask::Validate {
            input: "u1_s.vcf".into(),
        });
        assert_eq!(
            args,
            [
                "run",
                "--rm",
                "-v",
                "/data/mnt:/mnt",
                "upload_app:latest",
                "main.py",
                "validate",
                "--input",
                "u1_s.vcf"
            ]
        );
    }

    #[test]
    fn process_command_line_carries_barcode() {
        let args = executor("docker").command_args(&ComputeTask::Process {
            input: "f1".into(),
            barcode: "B1".into(),
        });
        assert_eq!(&args[5..], ["main.py", "process", "--input", "f1", "--barcode", "B1"]);
    }

    #[test]
    fn only_validation_captures_stdout() {
        assert!(ComputeTask::Validate { input: "f".into() }.captures_stdout());
        assert!(!ComputeTask::Process {
            input: "f".into(),
            barcode: "B1".into(),
        }
        .captures_stdout());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_output_is_not_captured() {
        // `echo` prints its arguments and exits 0.
        let validate = executor("echo")
            .execute(&ComputeTask::Validate { input: "f".into() })
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&validate).contains("validate"));

        let process = executor("echo")
            .execute(&ComputeTask::Process {
                input: "f".into(),
                barcode: "B1".into(),
            })
            .await
            .unwrap();
        assert!(process.is_empty());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = executor("/nonexistent/genoflow-docker")
            .execute(&ComputeTask::Validate { input: "f".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failed() {
        // `false` ignores its arguments and exits 1.
        let err = executor("false")
            .execute(&ComputeTask::Validate { input: "f".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Failed { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_captured() {
        // `echo` prints its arguments, standing in for the container.
        let out = executor("echo")
            .execute(&ComputeTask::Validate { input: "f".into() })
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("main.py validate --input f"));
    }
}
