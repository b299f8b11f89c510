//! The job-state store contract.

use crate::error::StoreResult;
use async_trait::async_trait;
use genoflow_core::{CallContext, ProcessingStatus, ValidationStatus, WriteMode};

/// Durable job state: users, active files, validation and processing
/// statuses, product codes.
///
/// Every operation is serialized with respect to every other operation on the
/// same store and bounded by the caller's [`CallContext`]. There are no
/// multi-statement transactions; a read followed by a write is not atomic.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// `Ok(())` if the user exists, `NotFound` otherwise.
    async fn check_user_exists(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()>;

    async fn create_user(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()>;

    /// File name currently associated with the user. `NotFound` if none.
    async fn active_file(&self, ctx: &CallContext, user_id: &str) -> StoreResult<String>;

    async fn set_active_file(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: &str,
        mode: WriteMode,
    ) -> StoreResult<()>;

    /// Insert a validation record with status `new`.
    async fn create_validation_record(&self, ctx: &CallContext, file_name: &str)
        -> StoreResult<()>;

    async fn set_validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ValidationStatus,
    ) -> StoreResult<()>;

    /// Current validation status, `None` when no record exists.
    async fn validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ValidationStatus>>;

    /// True iff a validation record exists with status `valid`.
    async fn is_file_valid(&self, ctx: &CallContext, file_name: &str) -> StoreResult<bool>;

    /// Current processing status, `None` (rendered "NA") when no record exists.
    async fn processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ProcessingStatus>>;

    /// Insert a processing record with status `new`.
    async fn create_processing_record(
        &self,
        ctx: &CallContext,
        file_name: &str,
        barcode: &str,
    ) -> StoreResult<()>;

    async fn set_processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ProcessingStatus,
    ) -> StoreResult<()>;

    /// Product code for the user, `None` (rendered "NA") when absent.
    async fn product_code(&self, ctx: &CallContext, user_id: &str) -> StoreResult<Option<String>>;

    async fn set_product_code(
        &self,
        ctx: &CallContext,
        user_id: &str,
        code: &str,
        mode: WriteMode,
    ) -> StoreResult<()>;

    /// Every known user id, ordered.
    async fn list_user_ids(&self, ctx: &CallContext) -> StoreResult<Vec<String>>;

    /// Delete the user's rows from all five tables, one statement at a time.
    ///
    /// Without `file_name` only the user-keyed tables are cleared. Not
    /// transactional: a failure partway leaves the earlier deletes applied.
    async fn delete_user_data(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: Option<&str>,
    ) -> StoreResult<()>;

    /// Create the schema if it does not exist.
    async fn migrate(&self, ctx: &CallContext) -> StoreResult<()>;

    /// Drop the schema.
    async fn drop_all(&self, ctx: &CallContext) -> StoreResult<()>;

    /// Set a validation status from raw text, rejecting unknown values
    /// before anything is written.
    async fn set_validation_status_str(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: &str,
    ) -> StoreResult<()> {
        let status: ValidationStatus = status.parse()?;
        self.set_validation_status(ctx, file_name, status).await
    }

    /// Set a processing status from raw text, rejecting unknown values
    /// before anything is written.
    async fn set_processing_status_str(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: &str,
    ) -> StoreResult<()> {
        let status: ProcessingStatus = status.parse()?;
        self.set_processing_status(ctx, file_name, status).await
    }
}
