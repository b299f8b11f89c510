//! PostgreSQL-backed [`JobStore`].

use crate::error::{StoreError, StoreResult};
use crate::executor::SerialExecutor;
use crate::store::JobStore;
use async_trait::async_trait;
use chrono::Utc;
use genoflow_core::{CallContext, DatabaseConfig, ProcessingStatus, ValidationStatus, WriteMode};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const TABLES: [&str; 5] = ["users", "files", "products", "validation", "processing"];

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
    executor: SerialExecutor,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            executor: SerialExecutor::new(),
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.dsn)
            .await
            .map_err(StoreError::Execution)?;
        tracing::info!(max_connections = config.max_connections, "Database pool created");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    async fn update_status(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        query: &'static str,
        entity: &'static str,
        file_name: &str,
        status: &'static str,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let file_name = file_name.to_string();
        self.executor
            .run(ctx, operation, async move {
                let result = sqlx::query(query)
                    .bind(status)
                    .bind(Utc::now())
                    .bind(&file_name)
                    .execute(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, entity, &file_name))?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::NotFound {
                        entity,
                        id: file_name,
                    });
                }
                Ok(())
            })
            .await
    }
}

fn log_outcome<T>(operation: &str, key: &str, result: &StoreResult<T>) {
    match result {
        Ok(_) => tracing::info!(operation, key = %key, "Store operation done"),
        Err(e) if e.is_not_found() => {
            tracing::debug!(operation, key = %key, error = %e, "Store operation found nothing")
        }
        Err(e) => tracing::error!(operation, key = %key, error = %e, "Store operation failed"),
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[tracing::instrument(skip(self, ctx), fields(db.table = "users"))]
    async fn check_user_exists(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let result = self
            .executor
            .run(ctx, "check_user_exists", async move {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
                        .bind(&id)
                        .fetch_one(&pool)
                        .await
                        .map_err(|e| StoreError::from_sqlx(e, "user", &id))?;
                if exists {
                    Ok(())
                } else {
                    Err(StoreError::NotFound { entity: "user", id })
                }
            })
            .await;
        log_outcome("check_user_exists", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "users"))]
    async fn create_user(&self, ctx: &CallContext, user_id: &str) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let result = self
            .executor
            .run(ctx, "create_user", async move {
                sqlx::query("INSERT INTO users (user_id, created_at) VALUES ($1, $2)")
                    .bind(&id)
                    .bind(Utc::now())
                    .execute(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, "user", &id))?;
                Ok(())
            })
            .await;
        log_outcome("create_user", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "files"))]
    async fn active_file(&self, ctx: &CallContext, user_id: &str) -> StoreResult<String> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let result = self
            .executor
            .run(ctx, "active_file", async move {
                sqlx::query_scalar::<_, String>("SELECT file_name FROM files WHERE user_id = $1")
                    .bind(&id)
                    .fetch_one(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, "file", &id))
            })
            .await;
        log_outcome("active_file", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "files"))]
    async fn set_active_file(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: &str,
        mode: WriteMode,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let file = file_name.to_string();
        let result = self
            .executor
            .run(ctx, "set_active_file", async move {
                let query = match mode {
                    WriteMode::Create => {
                        "INSERT INTO files (user_id, file_name, updated_at) VALUES ($1, $2, $3)"
                    }
                    WriteMode::Update => {
                        "UPDATE files SET (file_name, updated_at) = ($2, $3) WHERE user_id = $1"
                    }
                };
                let done = sqlx::query(query)
                    .bind(&id)
                    .bind(&file)
                    .bind(Utc::now())
                    .execute(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, "file", &file))?;
                if mode == WriteMode::Update && done.rows_affected() == 0 {
                    return Err(StoreError::NotFound { entity: "file", id });
                }
                Ok(())
            })
            .await;
        log_outcome("set_active_file", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "validation"))]
    async fn create_validation_record(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let file = file_name.to_string();
        let result = self
            .executor
            .run(ctx, "create_validation_record", async move {
                sqlx::query(
                    "INSERT INTO validation (file_name, status, updated_at) VALUES ($1, $2, $3)",
                )
                .bind(&file)
                .bind(ValidationStatus::New.as_str())
                .bind(Utc::now())
                .execute(&pool)
                .await
                .map_err(|e| StoreError::from_sqlx(e, "validation record", &file))?;
                Ok(())
            })
            .await;
        log_outcome("create_validation_record", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "validation"))]
    async fn set_validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ValidationStatus,
    ) -> StoreResult<()> {
        let result = self
            .update_status(
                ctx,
                "set_validation_status",
                "UPDATE validation SET (status, updated_at) = ($1, $2) WHERE file_name = $3",
                "validation record",
                file_name,
                status.as_str(),
            )
            .await;
        log_outcome("set_validation_status", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "validation"))]
    async fn validation_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ValidationStatus>> {
        let pool = self.pool.clone();
        let file = file_name.to_string();
        let result = self
            .executor
            .run(ctx, "validation_status", async move {
                let raw: Option<String> =
                    sqlx::query_scalar("SELECT status FROM validation WHERE file_name = $1")
                        .bind(&file)
                        .fetch_optional(&pool)
                        .await
                        .map_err(|e| StoreError::from_sqlx(e, "validation record", &file))?;
                raw.map(|s| s.parse().map_err(StoreError::from)).transpose()
            })
            .await;
        log_outcome("validation_status", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "validation"))]
    async fn is_file_valid(&self, ctx: &CallContext, file_name: &str) -> StoreResult<bool> {
        let pool = self.pool.clone();
        let file = file_name.to_string();
        let result = self
            .executor
            .run(ctx, "is_file_valid", async move {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM validation WHERE file_name = $1 AND status = $2)",
                )
                .bind(&file)
                .bind(ValidationStatus::Valid.as_str())
                .fetch_one(&pool)
                .await
                .map_err(|e| StoreError::from_sqlx(e, "validation record", &file))
            })
            .await;
        log_outcome("is_file_valid", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "processing"))]
    async fn processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
    ) -> StoreResult<Option<ProcessingStatus>> {
        let pool = self.pool.clone();
        let file = file_name.to_string();
        let result = self
            .executor
            .run(ctx, "processing_status", async move {
                let raw: Option<String> =
                    sqlx::query_scalar("SELECT status FROM processing WHERE file_name = $1")
                        .bind(&file)
                        .fetch_optional(&pool)
                        .await
                        .map_err(|e| StoreError::from_sqlx(e, "processing record", &file))?;
                raw.map(|s| s.parse().map_err(StoreError::from)).transpose()
            })
            .await;
        log_outcome("processing_status", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "processing"))]
    async fn create_processing_record(
        &self,
        ctx: &CallContext,
        file_name: &str,
        barcode: &str,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let file = file_name.to_string();
        let barcode = barcode.to_string();
        let result = self
            .executor
            .run(ctx, "create_processing_record", async move {
                sqlx::query(
                    "INSERT INTO processing (file_name, barcode, status, updated_at) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(&file)
                .bind(&barcode)
                .bind(ProcessingStatus::New.as_str())
                .bind(Utc::now())
                .execute(&pool)
                .await
                .map_err(|e| StoreError::from_sqlx(e, "processing record", &file))?;
                Ok(())
            })
            .await;
        log_outcome("create_processing_record", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "processing"))]
    async fn set_processing_status(
        &self,
        ctx: &CallContext,
        file_name: &str,
        status: ProcessingStatus,
    ) -> StoreResult<()> {
        let result = self
            .update_status(
                ctx,
                "set_processing_status",
                "UPDATE processing SET (status, updated_at) = ($1, $2) WHERE file_name = $3",
                "processing record",
                file_name,
                status.as_str(),
            )
            .await;
        log_outcome("set_processing_status", file_name, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "products"))]
    async fn product_code(&self, ctx: &CallContext, user_id: &str) -> StoreResult<Option<String>> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let result = self
            .executor
            .run(ctx, "product_code", async move {
                sqlx::query_scalar::<_, String>("SELECT product_code FROM products WHERE user_id = $1")
                    .bind(&id)
                    .fetch_optional(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, "product code", &id))
            })
            .await;
        log_outcome("product_code", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "products"))]
    async fn set_product_code(
        &self,
        ctx: &CallContext,
        user_id: &str,
        code: &str,
        mode: WriteMode,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let code = code.to_string();
        let result = self
            .executor
            .run(ctx, "set_product_code", async move {
                let query = match mode {
                    WriteMode::Create => {
                        "INSERT INTO products (user_id, product_code) VALUES ($1, $2)"
                    }
                    WriteMode::Update => "UPDATE products SET product_code = $2 WHERE user_id = $1",
                };
                let done = sqlx::query(query)
                    .bind(&id)
                    .bind(&code)
                    .execute(&pool)
                    .await
                    .map_err(|e| StoreError::from_sqlx(e, "product code", &id))?;
                if mode == WriteMode::Update && done.rows_affected() == 0 {
                    return Err(StoreError::NotFound {
                        entity: "product code",
                        id,
                    });
                }
                Ok(())
            })
            .await;
        log_outcome("set_product_code", user_id, &result);
        result
    }

    #[tracing::instrument(skip(self, ctx), fields(db.table = "users"))]
    async fn list_user_ids(&self, ctx: &CallContext) -> StoreResult<Vec<String>> {
        let pool = self.pool.clone();
        let result = self
            .executor
            .run(ctx, "list_user_ids", async move {
                sqlx::query_scalar::<_, String>("SELECT user_id FROM users ORDER BY user_id")
                    .fetch_all(&pool)
                    .await
                    .map_err(StoreError::Execution)
            })
            .await;
        log_outcome("list_user_ids", "*", &result);
        result
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn delete_user_data(
        &self,
        ctx: &CallContext,
        user_id: &str,
        file_name: Option<&str>,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = user_id.to_string();
        let file = file_name.map(str::to_string);
        let result = self
            .executor
            .run(ctx, "delete_user_data", async move {
                let mut statements = vec![
                    ("DELETE FROM users WHERE user_id = $1", id.clone()),
                    ("DELETE FROM files WHERE user_id = $1", id.clone()),
                    ("DELETE FROM products WHERE user_id = $1", id),
                ];
                if let Some(file) = file {
                    statements.push(("DELETE FROM validation WHERE file_name = $1", file.clone()));
                    statements.push(("DELETE FROM processing WHERE file_name = $1", file));
                }
                for (query, key) in statements {
                    sqlx::query(query)
                        .bind(key)
                        .execute(&pool)
                        .await
                        .map_err(StoreError::Execution)?;
                }
                Ok(())
            })
            .await;
        log_outcome("delete_user_data", user_id, &result);
        result
    }

    async fn migrate(&self, ctx: &CallContext) -> StoreResult<()> {
        let pool = self.pool.clone();
        let result = self
            .executor
            .run(ctx, "migrate", async move {
                sqlx::migrate!().run(&pool).await?;
                Ok(())
            })
            .await;
        log_outcome("migrate", "schema", &result);
        result
    }

    async fn drop_all(&self, ctx: &CallContext) -> StoreResult<()> {
        let pool = self.pool.clone();
        let result = self
            .executor
            .run(ctx, "drop_all", async move {
                for table in TABLES.iter().chain(std::iter::once(&"_sqlx_migrations")) {
                    let statement = format!("DROP TABLE IF EXISTS {}", table);
                    sqlx::query(&statement)
                        .execute(&pool)
                        .await
                        .map_err(StoreError::Execution)?;
                }
                Ok(())
            })
            .await;
        log_outcome("drop_all", "schema", &result);
        result
    }
}
