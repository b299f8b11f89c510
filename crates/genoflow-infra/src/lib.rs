//! Process-level plumbing: tracing setup, lifecycle ownership of long-lived
//! resources and the OS shutdown signal.

pub mod lifecycle;
pub mod signal;
pub mod telemetry;

pub use lifecycle::Lifecycle;
pub use signal::shutdown_signal;
pub use telemetry::init_tracing;
