use super::user_id_arg;
use crate::app::AppContext;
use crate::command::{required, CliCommand};
use crate::table::render_table;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use genoflow_core::{log_error, UserSummary};

const HEADERS: [&str; 5] = ["User ID", "File name", "Valid", "Product code", "Processing status"];

pub(crate) fn summary_table(summaries: &[UserSummary]) -> String {
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.user_id.clone(),
                s.file_name.clone(),
                s.valid.to_string(),
                s.product_code.clone(),
                s.processing_status.clone(),
            ]
        })
        .collect();
    render_table(&HEADERS, &rows)
}

pub struct AllCommand;

#[async_trait]
impl CliCommand for AllCommand {
    fn describe(&self) -> Command {
        Command::new("user:all").about("List every user with its file and statuses")
    }

    async fn execute(&self, app: &AppContext, _args: &ArgMatches) -> anyhow::Result<()> {
        let agent = app.agent().await?;
        let summaries = agent
            .user_summaries(&app.store_context())
            .await
            .map_err(|e| {
                log_error("user:all", &e);
                e
            })?;
        println!("{}", summary_table(&summaries));
        Ok(())
    }
}

pub struct InfoCommand;

#[async_trait]
impl CliCommand for InfoCommand {
    fn describe(&self) -> Command {
        Command::new("user:info")
            .about("Show the file and statuses of one user")
            .arg(user_id_arg())
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let user_id = required(args, "user-id")?;
        let agent = app.agent().await?;
        let summary = agent
            .user_summary(&app.store_context(), user_id)
            .await
            .map_err(|e| {
                log_error("user:info", &e);
                e
            })?;
        println!("{}", summary_table(&[summary]));
        Ok(())
    }
}

pub struct DeleteCommand;

#[async_trait]
impl CliCommand for DeleteCommand {
    fn describe(&self) -> Command {
        Command::new("user:delete")
            .about("Delete a user and every record of its active file")
            .arg(user_id_arg())
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let user_id = required(args, "user-id")?;
        let agent = app.agent().await?;
        agent
            .delete_user(&app.store_context(), user_id)
            .await
            .map_err(|e| {
                log_error("user:delete", &e);
                e
            })?;
        println!("User {} deleted", user_id);
        Ok(())
    }
}

pub struct ResetCommand;

#[async_trait]
impl CliCommand for ResetCommand {
    fn describe(&self) -> Command {
        Command::new("user:reset")
            .about("Set the processing status of a user's file back to new")
            .arg(user_id_arg())
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let user_id = required(args, "user-id")?;
        let agent = app.agent().await?;
        agent
            .reset_processing(&app.store_context(), user_id)
            .await
            .map_err(|e| {
                log_error("user:reset", &e);
                e
            })?;
        println!("Processing status of user {} reset", user_id);
        Ok(())
    }
}
