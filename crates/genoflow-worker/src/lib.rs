//! Bus-driven job handlers.
//!
//! One long-running consumer per job queue. Each delivery is decoded,
//! handed to the [`genoflow_agent::Agent`] under the domain's deadline and
//! answered with a completion notification by the queue listener.

pub mod consumers;
pub mod handlers;

pub use consumers::run_consumers;
pub use handlers::{ProcessingHandler, ValidationHandler};

#[cfg(test)]
mod test_support;
