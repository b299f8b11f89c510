use crate::app::AppContext;
use crate::command::CliCommand;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use genoflow_core::log_error;
use std::time::Duration;

/// Schema changes run well past the per-query store deadline.
const SCHEMA_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MigrateCommand;

#[async_trait]
impl CliCommand for MigrateCommand {
    fn describe(&self) -> Command {
        Command::new("storage:migrate").about("Create the database tables")
    }

    async fn execute(&self, app: &AppContext, _args: &ArgMatches) -> anyhow::Result<()> {
        let store = app.store().await?;
        let ctx = app.lifecycle().context().with_timeout(SCHEMA_TIMEOUT);
        store.migrate(&ctx).await.map_err(|e| {
            log_error("storage:migrate", &e);
            e
        })?;
        println!("Database migrated");
        Ok(())
    }
}

pub struct ResetCommand;

#[async_trait]
impl CliCommand for ResetCommand {
    fn describe(&self) -> Command {
        Command::new("storage:reset").about("Drop every table, leaving an empty database")
    }

    async fn execute(&self, app: &AppContext, _args: &ArgMatches) -> anyhow::Result<()> {
        let store = app.store().await?;
        let ctx = app.lifecycle().context().with_timeout(SCHEMA_TIMEOUT);
        store.drop_all(&ctx).await.map_err(|e| {
            log_error("storage:reset", &e);
            e
        })?;
        println!("Database reset");
        Ok(())
    }
}
