//! Object storage for source files and processing artifacts.
//!
//! Source files are downloaded from the upload bucket into a local staging
//! directory before compute runs. Processing artifacts are uploaded to the
//! artifact bucket under a folder chosen by their [`ArtifactCategory`].

pub mod factory;
pub mod layout;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use layout::{ArtifactCategory, FolderLayout};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
