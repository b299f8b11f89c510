//! Durable job-state storage.
//!
//! [`JobStore`] is the contract used by the rest of the pipeline;
//! [`PgJobStore`] implements it on PostgreSQL. With the `test-helpers`
//! feature, [`MemoryJobStore`] provides an in-process equivalent.

pub mod error;
pub mod executor;
#[cfg(any(test, feature = "test-helpers"))]
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use executor::SerialExecutor;
#[cfg(any(test, feature = "test-helpers"))]
pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;
pub use store::JobStore;
