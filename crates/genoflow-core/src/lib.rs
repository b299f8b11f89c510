//! Genoflow core: configuration, error metadata, domain models and the
//! deadline-carrying call context shared by every other crate.

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod product;

pub use config::{
    AmqpConfig, ComputeConfig, Config, DatabaseConfig, DeadlineConfig, LogConfig, LogFormat,
    S3Config, ServerConfig, StorageBackend,
};
pub use context::CallContext;
pub use error::{log_error, ErrorMetadata, LogLevel};
pub use models::*;
pub use product::{product_code_for_mode, PRODUCT_CODE_23ANDME, PRODUCT_CODE_GENOTEK_VCF};
