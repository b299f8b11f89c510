//! Pipeline orchestrator.
//!
//! [`Agent`] is the single entry point for validate and process intents,
//! shared by the CLI, the HTTP read endpoints and the bus handlers. It keeps
//! no state of its own: every gate is a fresh read of the job store.

pub mod agent;
pub mod error;

pub use agent::Agent;
pub use error::{AgentError, AgentResult};
