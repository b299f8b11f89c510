use crate::error::{AgentError, AgentResult};
use genoflow_core::{
    display_or_na, product_code_for_mode, CallContext, ProcessingStatus, UserSummary,
    ValidationResult, WriteMode,
};
use genoflow_db::{JobStore, StoreError};
use genoflow_processing::Runner;
use std::sync::Arc;

#[derive(Clone)]
pub struct Agent {
    store: Arc<dyn JobStore>,
    runner: Runner,
}

impl Agent {
    pub fn new(store: Arc<dyn JobStore>, runner: Runner) -> Self {
        Self { store, runner }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    async fn require_user(&self, ctx: &CallContext, user_id: &str) -> AgentResult<()> {
        match self.store.check_user_exists(ctx, user_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(AgentError::UserNotFound {
                user_id: user_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn resolve_file(&self, ctx: &CallContext, user_id: &str) -> AgentResult<String> {
        match self.store.active_file(ctx, user_id).await {
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => Err(AgentError::FileNotFound {
                user_id: user_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// User must exist and its active file must have passed validation.
    async fn resolve_valid_file(&self, ctx: &CallContext, user_id: &str) -> AgentResult<String> {
        self.require_user(ctx, user_id).await?;
        let file_name = self.resolve_file(ctx, user_id).await?;
        if !self.store.is_file_valid(ctx, &file_name).await? {
            return Err(AgentError::InvalidFile { file_name });
        }
        Ok(file_name)
    }

    /// Validate `file_name` for `user_id`, registering the user on first sight.
    ///
    /// An existing user only gets its active file moved; the validation
    /// record of the previous file is left as it was. A passed validation
    /// stores the product code derived from the detected mode.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn validate(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: &str,
        dry_run: bool,
        from_bus: bool,
    ) -> AgentResult<ValidationResult> {
        let user_is_new = match self.store.check_user_exists(ctx, user_id).await {
            Ok(()) => false,
            Err(e) if e.is_not_found() => true,
            Err(e) => return Err(e.into()),
        };

        if !dry_run {
            self.register_file(ctx, user_id, file_name, user_is_new)
                .await?;
        }

        let result = self
            .runner
            .run_validation(ctx, file_name, dry_run, from_bus)
            .await?;

        if !dry_run && result.passed {
            let code = product_code_for_mode(&result.mode);
            tracing::info!(user_id = %user_id, product_code = %code, "Derived product code");
            self.store_product_code(ctx, user_id, code, WriteMode::for_new_user(user_is_new))
                .await?;
        }

        Ok(result)
    }

    async fn register_file(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: &str,
        user_is_new: bool,
    ) -> AgentResult<()> {
        if user_is_new {
            self.store.create_user(ctx, user_id).await?;
            self.store
                .set_active_file(ctx, user_id, file_name, WriteMode::Create)
                .await?;
            self.store.create_validation_record(ctx, file_name).await?;
            return Ok(());
        }

        match self
            .store
            .set_active_file(ctx, user_id, file_name, WriteMode::Update)
            .await
        {
            // A user whose first registration stopped before its file row
            // was written.
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(user_id = %user_id, "User has no file row, creating it");
                self.store
                    .set_active_file(ctx, user_id, file_name, WriteMode::Create)
                    .await?;
            }
            other => other?,
        }
        // Re-validating a known file re-enters its record; a file never seen
        // before needs one to carry its status.
        if self
            .store
            .validation_status(ctx, file_name)
            .await?
            .is_none()
        {
            self.store.create_validation_record(ctx, file_name).await?;
        }
        Ok(())
    }

    async fn store_product_code(
        &self,
        ctx: &CallContext,
        user_id: &str,
        code: &str,
        mode: WriteMode,
    ) -> AgentResult<()> {
        match self.store.set_product_code(ctx, user_id, code, mode).await {
            // Known user whose earlier validations never passed.
            Err(StoreError::NotFound { .. }) if mode == WriteMode::Update => {
                self.store
                    .set_product_code(ctx, user_id, code, WriteMode::Create)
                    .await?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    /// Process the user's active file.
    ///
    /// Refuses to start while a run for the same file is recorded as running.
    /// The gate is a plain read followed by a write, so two racing callers may
    /// both pass it; the loser then fails on the processing record's
    /// uniqueness with [`StoreError::AlreadyExists`].
    #[tracing::instrument(skip(self, ctx))]
    pub async fn process(
        &self,
        ctx: &CallContext,
        user_id: &str,
        barcode: &str,
        dry_run: bool,
        from_bus: bool,
    ) -> AgentResult<()> {
        let file_name = self.resolve_valid_file(ctx, user_id).await?;

        match self.store.processing_status(ctx, &file_name).await? {
            Some(ProcessingStatus::Running) => {
                tracing::warn!(user_id = %user_id, file_name = %file_name, "Processing is locked");
                return Err(AgentError::ProcessingInProgress { file_name });
            }
            None => {
                self.store
                    .create_processing_record(ctx, &file_name, barcode)
                    .await?;
            }
            Some(_) => {}
        }

        self.runner
            .run_processing(ctx, &file_name, barcode, dry_run, from_bus)
            .await?;
        Ok(())
    }

    /// Processing status of the user's active file, `NA` before the first run.
    pub async fn processing_status_for(
        &self,
        ctx: &CallContext,
        user_id: &str,
    ) -> AgentResult<String> {
        let file_name = self.resolve_valid_file(ctx, user_id).await?;
        let status = self.store.processing_status(ctx, &file_name).await?;
        Ok(display_or_na(status))
    }

    /// Product code of the user, `NA` if none was derived.
    pub async fn product_code_for(&self, ctx: &CallContext, user_id: &str) -> AgentResult<String> {
        self.resolve_valid_file(ctx, user_id).await?;
        let code = self.store.product_code(ctx, user_id).await?;
        Ok(display_or_na(code))
    }

    /// Operator view of one user; only a missing user is an error.
    pub async fn user_summary(&self, ctx: &CallContext, user_id: &str) -> AgentResult<UserSummary> {
        self.require_user(ctx, user_id).await?;
        self.summarize(ctx, user_id).await
    }

    /// Summaries of every user ordered by id.
    pub async fn user_summaries(&self, ctx: &CallContext) -> AgentResult<Vec<UserSummary>> {
        let mut summaries = Vec::new();
        for user_id in self.store.list_user_ids(ctx).await? {
            summaries.push(self.summarize(ctx, &user_id).await?);
        }
        Ok(summaries)
    }

    async fn summarize(&self, ctx: &CallContext, user_id: &str) -> AgentResult<UserSummary> {
        let file_name = match self.resolve_file(ctx, user_id).await {
            Ok(file) => Some(file),
            Err(AgentError::FileNotFound { .. }) => {
                tracing::warn!(user_id = %user_id, "User has no active file");
                None
            }
            Err(e) => return Err(e),
        };

        let product_code = self.store.product_code(ctx, user_id).await?;
        let (valid, processing_status) = match &file_name {
            Some(file) => (
                self.store.is_file_valid(ctx, file).await?,
                self.store.processing_status(ctx, file).await?,
            ),
            None => (false, None),
        };

        Ok(UserSummary {
            user_id: user_id.to_string(),
            file_name: display_or_na(file_name),
            valid,
            product_code: display_or_na(product_code),
            processing_status: display_or_na(processing_status),
        })
    }

    /// Remove every record of the user and its active file.
    ///
    /// A user without an active file still has its own rows removed.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_user(&self, ctx: &CallContext, user_id: &str) -> AgentResult<()> {
        self.require_user(ctx, user_id).await?;
        let file_name = match self.resolve_file(ctx, user_id).await {
            Ok(file) => Some(file),
            Err(AgentError::FileNotFound { .. }) => {
                tracing::warn!(user_id = %user_id, "User has no active file");
                None
            }
            Err(e) => return Err(e),
        };
        self.store
            .delete_user_data(ctx, user_id, file_name.as_deref())
            .await?;
        tracing::info!(user_id = %user_id, file_name = ?file_name, "User data deleted");
        Ok(())
    }

    /// Put a stuck processing status back to `new`.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn reset_processing(&self, ctx: &CallContext, user_id: &str) -> AgentResult<()> {
        self.require_user(ctx, user_id).await?;
        let file_name = self.resolve_file(ctx, user_id).await?;
        self.store
            .set_processing_status(ctx, &file_name, ProcessingStatus::New)
            .await?;
        tracing::info!(user_id = %user_id, file_name = %file_name, "Processing status reset");
        Ok(())
    }
}
