//! External compute runner.
//!
//! The validation/processing algorithms live in a container image and are
//! invoked as a black box. [`Runner`] wraps each invocation with status
//! transitions in the job store, optional source download beforehand and
//! artifact upload afterwards.

pub mod error;
pub mod executor;
pub mod runner;
#[cfg(any(test, feature = "test-helpers"))]
pub mod scripted;

pub use error::{RunnerError, RunnerResult};
pub use executor::{ComputeExecutor, ComputeTask, DockerExecutor, ExecError};
pub use runner::{artifact_manifest, Artifact, Runner};
#[cfg(any(test, feature = "test-helpers"))]
pub use scripted::{Script, ScriptedExecutor};
