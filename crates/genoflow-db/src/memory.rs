//! In-memory [`JobStore`] for tests.
//!
//! Mirrors the PostgreSQL store's uniqueness rules and goes through the same
//! [`SerialExecutor`], so deadline behaviour matches. Every status write is
//! also appended to a history so tests can assert full status sequences.

use crate::error::{StoreError, StoreResult};
use crate::executor::SerialExecutor;
use crate::store::JobStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genoflow_core::{CallContext, ProcessingStatus, ValidationStatus, WriteMode};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, DateTime<Utc>>,
    files: HashMap<String, String>,
    products: HashMap<String, String>,
    validation: HashMap<String, ValidationStatus>,
    processing: HashMap<String, (String, ProcessingStatus)>,
    validation_history: Vec<(String, ValidationStatus)>,
    processing_history: Vec<(String, ProcessingStatus)>,
    failing_delete: Option<&'static str>,
    latency: Duration,
    schema_ready: bool,
}

#[derive(Clone, Default)]
pub struct MemoryJobStore {
    tables: Arc<Mutex<Tables>>,
    executor: SerialExecutor,
}

fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every statement by `latency` while holding the store lock.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.tables).latency = latency;
    }

    /// Make `delete_user_data` fail when it reaches `table`.
    pub fn fail_deletes_at(&self, table: &'static str) {
        lock(&self.tables).failing_delete = Some(table);
    }

    pub fn validation_history(&self, file_name: &str) -> Vec<ValidationStatus> {
        lock(&self.tables)
            .validation_history
            .iter()
            .filter(|(f, _)| f == file_name)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn processing_history(&self, file_name: &str) -> Vec<ProcessingStatus> {
        lock(&self.tables)
            .processing_history
            .iter()
            .filter(|(f, _)| f == file_name)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        lock(&self.tables).users.contains_key(user_id)
    }

    pub fn has_validation_record(&self, file_name: &str) -> bool {
        lock(&self.tables).validation.contains_key(file_name)
    }

    pub fn has_processing_record(&self, file_name: &str) -> bool {
        lock(&self.tables).processing.contains_key(file_name)
    }

    pub fn barcode(&self, file_name: &str) -> Option<String> {
        lock(&self.tables)
            .processing
            .get(file_name)
            .map(|(barcode, _)| barcode.clone())
    }

    pub fn is_migrated(&self) -> bool {
        lock(&self.tables).schema_ready
    }

    async fn exec<T, F>(&self, ctx: &CallContext, operation: &'static str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Tables) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let tables = self.tables.clone();
        self.executor
            .run(ctx, operation, async move {
                let latency = lock(&tables).latency;
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                let mut guard = lock(&tables);
                f(&mut guard)
            })
            .await
    }
}

fn not_found(entity: &'static str, id: String) -> StoreError {
    StoreError::NotFound { entity, id }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn check_user_exists(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()> {
        let id = user_id.to_string();
        self.exec(ctx, "check_user_exists", move |t| {
            if t.users.contains_key(&id) {
                Ok(())
            } else {
                Err(not_found("user", id))
            }
        })
        .await
    }

    async fn create_user(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()> {
        let id = user_id.to_string();
        self.exec(ctx, "create_user", move |t| {
            if t.users.contains_key(&id) {
                return Err(StoreError::AlreadyExists { id });
            }
            t.users.insert(id, Utc::now());
            Ok(())
        })
        .await
    }

    async fn active_file(&self, ctx: &CallContext, user_id: &str) -> StoreResult<String> {
        let id = user_id.to_string();
        self.exec(ctx, "active_file", move |t| {
            t.files.get(&id).cloned().ok_or_else(|| not_found("file", id))
        })
        .await
    }

    async fn set_active_file(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: &str,
        mode: WriteMode,
    ) -> StoreResult<()> {
        let id = user_id.to_string();
        let file = file_name.to_string();
        self.exec(ctx, "set_active_file", move |t| {
            let taken = t.files.iter().any(|(u, f)| *f == file && *u != id);
            match mode {
                WriteMode::Create => {
                    if taken || t.files.contains_key(&id) {
                        return Err(StoreError::AlreadyExists { id: file });
                    }
                }
                WriteMode::Update => {
                    if !t.files.contains_key(&id) {
                        return Err(not_found("file", id));
                    }
                    if taken {
                        return Err(StoreError::AlreadyExists { id: file });
                    }
                }
            }
            t.files.insert(id, file);
            Ok(())
        })
        .await
    }

    async fn create_validation_record(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<()> {
        let file = file_name.to_string();
        self.exec(ctx, "create_validation_record", move |t| {
            if t.validation.contains_key(&file) {
                return Err(StoreError::AlreadyExists { id: file });
            }
            t.validation.insert(file.clone(), ValidationStatus::New);
            t.validation_history.push((file, ValidationStatus::New));
            Ok(())
        })
        .await
    }

    async fn set_validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ValidationStatus,
    ) -> StoreResult<()> {
        let file = file_name.to_string();
        self.exec(ctx, "set_validation_status", move |t| {
            match t.validation.get_mut(&file) {
                Some(current) => *current = status,
                None => return Err(not_found("validation record", file)),
            }
            t.validation_history.push((file, status));
            Ok(())
        })
        .await
    }

    async fn validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ValidationStatus>> {
        let file = file_name.to_string();
        self.exec(ctx, "validation_status", move |t| {
            Ok(t.validation.get(&file).copied())
        })
        .await
    }

    async fn is_file_valid(&self, ctx: &CallContext, file_name: &str) -> StoreResult<bool> {
        let file = file_name.to_string();
        self.exec(ctx, "is_file_valid", move |t| {
            Ok(t.validation.get(&file) == Some(&ValidationStatus::Valid))
        })
        .await
    }

    async fn processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ProcessingStatus>> {
        let file = file_name.to_string();
        self.exec(ctx, "processing_status", move |t| {
            Ok(t.processing.get(&file).map(|(_, status)| *status))
        })
        .await
    }

    async fn create_processing_record(
        &self,
        ctx: &CallContext,
        file_name: &str,
        barcode: &str,
    ) -> StoreResult<()> {
        let file = file_name.to_string();
        let barcode = barcode.to_string();
        self.exec(ctx, "create_processing_record", move |t| {
            if t.processing.contains_key(&file) {
                return Err(StoreError::AlreadyExists { id: file });
            }
            t.processing
                .insert(file.clone(), (barcode, ProcessingStatus::New));
            t.processing_history.push((file, ProcessingStatus::New));
            Ok(())
        })
        .await
    }

    async fn set_processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ProcessingStatus,
    ) -> StoreResult<()> {
        let file = file_name.to_string();
        self.exec(ctx, "set_processing_status", move |t| {
            match t.processing.get_mut(&file) {
                Some((_, current)) => *current = status,
                None => return Err(not_found("processing record", file)),
            }
            t.processing_history.push((file, status));
            Ok(())
        })
        .await
    }

    async fn product_code(&self, ctx: &CallContext, user_id: &str) -> StoreResult<Option<String>> {
        let id = user_id.to_string();
        self.exec(ctx, "product_code", move |t| Ok(t.products.get(&id).cloned()))
            .await
    }

    async fn set_product_code(
        &self,
        ctx: &CallContext,
        user_id: &str,
        code: &str,
        mode: WriteMode,
    ) -> StoreResult<()> {
        let id = user_id.to_string();
        let code = code.to_string();
        self.exec(ctx, "set_product_code", move |t| {
            match mode {
                WriteMode::Create if t.products.contains_key(&id) => {
                    return Err(StoreError::AlreadyExists { id });
                }
                WriteMode::Update if !t.products.contains_key(&id) => {
                    return Err(not_found("product code", id));
                }
                _ => {}
            }
            t.products.insert(id, code);
            Ok(())
        })
        .await
    }

    async fn list_user_ids(&self, ctx: &CallContext) -> StoreResult<Vec<String>> {
        self.exec(ctx, "list_user_ids", |t| Ok(t.users.keys().cloned().collect()))
            .await
    }

    async fn delete_user_data(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: Option<&str>,
    ) -> StoreResult<()> {
        let id = user_id.to_string();
        let file = file_name.map(str::to_string);
        self.exec(ctx, "delete_user_data", move |t| {
            let failing = t.failing_delete;
            let check = |table: &'static str| -> StoreResult<()> {
                if failing == Some(table) {
                    Err(StoreError::Execution(sqlx::Error::Protocol(format!(
                        "delete from {} failed",
                        table
                    ))))
                } else {
                    Ok(())
                }
            };
            check("users")?;
            t.users.remove(&id);
            check("files")?;
            t.files.remove(&id);
            check("products")?;
            t.products.remove(&id);
            let Some(file) = file else {
                return Ok(());
            };
            check("validation")?;
            t.validation.remove(&file);
            check("processing")?;
            t.processing.remove(&file);
            Ok(())
        })
        .await
    }

    async fn migrate(&self, ctx: &CallContext) -> StoreResult<()> {
        self.exec(ctx, "migrate", |t| {
            t.schema_ready = true;
            Ok(())
        })
        .await
    }

    async fn drop_all(&self, ctx: &CallContext) -> StoreResult<()> {
        self.exec(ctx, "drop_all", |t| {
            let latency = t.latency;
            *t = Tables {
                latency,
                ..Tables::default()
            };
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CallContext {
        CallContext::background()
    }

    #[tokio::test]
    async fn create_user_twice_is_already_exists() {
        let store = MemoryJobStore::new();
        store.create_user(&ctx(), "u1").await.unwrap();
        let err = store.create_user(&ctx(), "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { ref id } if id == "u1"));
    }

    #[tokio::test]
    async fn file_names_are_unique_across_users() {
        let store = MemoryJobStore::new();
        store
            .set_active_file(&ctx(), "u1", "f1", WriteMode::Create)
            .await
            .unwrap();
        let err = store
            .set_active_file(&ctx(), "u2", "f1", WriteMode::Create)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn invalid_status_text_leaves_status_unchanged() {
        let store = MemoryJobStore::new();
        store.create_validation_record(&ctx(), "f1").await.unwrap();

        let err = store
            .set_validation_status_str(&ctx(), "f1", "done")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidStatus(_)));
        assert_eq!(
            store.validation_status(&ctx(), "f1").await.unwrap(),
            Some(ValidationStatus::New)
        );
        assert_eq!(store.validation_history("f1"), vec![ValidationStatus::New]);
    }

    #[tokio::test]
    async fn invalid_processing_status_text_leaves_status_unchanged() {
        let store = MemoryJobStore::new();
        store.create_processing_record(&ctx(), "f1", "B1").await.unwrap();
        store
            .set_processing_status(&ctx(), "f1", ProcessingStatus::Running)
            .await
            .unwrap();

        for text in ["valid", "RUNNING", ""] {
            let err = store
                .set_processing_status_str(&ctx(), "f1", text)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidStatus(_)), "{:?}", text);
        }
        assert_eq!(
            store.processing_status(&ctx(), "f1").await.unwrap(),
            Some(ProcessingStatus::Running)
        );
        assert_eq!(
            store.processing_history("f1"),
            vec![ProcessingStatus::New, ProcessingStatus::Running]
        );
    }

    #[tokio::test]
    async fn delete_without_file_clears_user_keyed_rows_only() {
        let store = MemoryJobStore::new();
        store.create_user(&ctx(), "u1").await.unwrap();
        store
            .set_product_code(&ctx(), "u1", "code", WriteMode::Create)
            .await
            .unwrap();
        store.create_validation_record(&ctx(), "f1").await.unwrap();

        store.delete_user_data(&ctx(), "u1", None).await.unwrap();

        assert!(!store.has_user("u1"));
        assert_eq!(store.product_code(&ctx(), "u1").await.unwrap(), None);
        assert!(store.has_validation_record("f1"));
    }

    #[tokio::test]
    async fn delete_partial_failure_keeps_later_tables() {
        let store = MemoryJobStore::new();
        store.create_user(&ctx(), "u1").await.unwrap();
        store
            .set_active_file(&ctx(), "u1", "f1", WriteMode::Create)
            .await
            .unwrap();
        store.create_validation_record(&ctx(), "f1").await.unwrap();
        store.fail_deletes_at("validation");

        let err = store.delete_user_data(&ctx(), "u1", Some("f1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Execution(_)));
        assert!(!store.has_user("u1"));
        assert!(store.has_validation_record("f1"));
    }
}
