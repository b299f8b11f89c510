use super::{dry_run_arg, user_id_arg};
use crate::app::AppContext;
use crate::command::{required, CliCommand};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use genoflow_core::log_error;
use genoflow_storage::factory::STAGING_SUBDIR;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Copy `path` into the staging directory under a unique name and return
/// that name.
pub(crate) async fn stage_local_file(mount_dir: &Path, path: &Path) -> anyhow::Result<String> {
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path.display()))?;
    let staged = format!("{}_{}", Uuid::new_v4(), base);
    let staging_dir = mount_dir.join(STAGING_SUBDIR);
    tokio::fs::create_dir_all(&staging_dir).await?;
    tokio::fs::copy(path, staging_dir.join(&staged)).await?;
    Ok(staged)
}

pub struct ValidateCommand;

impl ValidateCommand {
    const NAME: &'static str = "file:validate";
}

#[async_trait]
impl CliCommand for ValidateCommand {
    fn describe(&self) -> Command {
        Command::new(Self::NAME)
            .about("Validate a local genotype file for a user")
            .arg(user_id_arg())
            .arg(
                Arg::new("file-path")
                    .short('f')
                    .long("file-path")
                    .help("Input file path")
                    .value_parser(clap::value_parser!(PathBuf))
                    .required(true),
            )
            .arg(dry_run_arg())
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let user_id = required(args, "user-id")?;
        let path = args
            .get_one::<PathBuf>("file-path")
            .ok_or_else(|| anyhow::anyhow!("missing required argument --file-path"))?;
        let dry_run = args.get_flag("dry-run");
        tracing::info!(cli_command = Self::NAME, user_id = %user_id, "Validation requested");

        let mount_dir = Path::new(&app.config().compute.mount_dir);
        let file_name = stage_local_file(mount_dir, path).await.map_err(|e| {
            tracing::error!(cli_command = Self::NAME, user_id = %user_id, error = %e, "Could not stage input file");
            e
        })?;

        let agent = app.agent().await?;
        let ctx = app
            .lifecycle()
            .context()
            .with_timeout(app.config().deadlines.validation);
        let result = agent
            .validate(&ctx, user_id, &file_name, dry_run, false)
            .await
            .map_err(|e| {
                log_error(Self::NAME, &e);
                e
            })?;

        tracing::info!(
            cli_command = Self::NAME,
            user_id = %user_id,
            file_name = %file_name,
            mode = %result.mode,
            sex = %result.sex,
            passed = result.passed,
            "Validation is complete"
        );
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}

pub struct ProcessCommand;

impl ProcessCommand {
    const NAME: &'static str = "file:process";
}

#[async_trait]
impl CliCommand for ProcessCommand {
    fn describe(&self) -> Command {
        Command::new(Self::NAME)
            .about("Process the active file of a user")
            .arg(user_id_arg())
            .arg(
                Arg::new("barcode")
                    .short('b')
                    .long("barcode")
                    .help("Barcode the artifacts are named after")
                    .required(true),
            )
            .arg(dry_run_arg())
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let user_id = required(args, "user-id")?;
        let barcode = required(args, "barcode")?;
        let dry_run = args.get_flag("dry-run");
        tracing::info!(cli_command = Self::NAME, user_id = %user_id, barcode = %barcode, "Processing requested");

        let agent = app.agent().await?;
        let ctx = app
            .lifecycle()
            .context()
            .with_timeout(app.config().deadlines.processing);
        agent
            .process(&ctx, user_id, barcode, dry_run, false)
            .await
            .map_err(|e| {
                log_error(Self::NAME, &e);
                e
            })?;

        tracing::info!(cli_command = Self::NAME, user_id = %user_id, "Processing is complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, VCF_PASSED};
    use genoflow_core::{ProcessingStatus as P, ValidationStatus as V};
    use genoflow_processing::{ComputeTask, Script};
    use tempfile::TempDir;

    #[tokio::test]
    async fn staged_copy_gets_a_unique_prefix() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("sample.vcf");
        tokio::fs::write(&input, b"##fileformat=VCFv4.2\n").await.unwrap();
        let mount = dir.path().join("mnt");

        let first = stage_local_file(&mount, &input).await.unwrap();
        let second = stage_local_file(&mount, &input).await.unwrap();

        assert_ne!(first, second);
        assert!(first.ends_with("_sample.vcf"));
        let copied = tokio::fs::read(mount.join(STAGING_SUBDIR).join(&first))
            .await
            .unwrap();
        assert_eq!(copied, b"##fileformat=VCFv4.2\n");
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = stage_local_file(dir.path(), &dir.path().join("absent.vcf")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn validate_stages_input_and_registers_user() {
        let h = harness().await;
        let inputs = TempDir::new().unwrap();
        let input = inputs.path().join("sample.vcf");
        tokio::fs::write(&input, b"data").await.unwrap();
        h.executor.push(Script::Stdout(VCF_PASSED.into()));

        h.run(
            &ValidateCommand,
            &["file:validate", "-u", "u1", "-f", input.to_str().unwrap()],
        )
        .await
        .unwrap();

        assert!(h.store.has_user("u1"));
        let calls = h.executor.calls();
        assert_eq!(calls.len(), 1);
        let ComputeTask::Validate { input } = &calls[0] else {
            panic!("expected a validate call, got {:?}", calls[0]);
        };
        assert!(input.ends_with("_sample.vcf"));
        let staged = input.rsplit('/').next().unwrap();
        assert_eq!(
            h.store.validation_history(staged),
            vec![V::New, V::Running, V::Valid]
        );
    }

    #[tokio::test]
    async fn dry_run_validation_writes_nothing() {
        let h = harness().await;
        let inputs = TempDir::new().unwrap();
        let input = inputs.path().join("sample.vcf");
        tokio::fs::write(&input, b"data").await.unwrap();
        h.executor.push(Script::Stdout(VCF_PASSED.into()));

        h.run(
            &ValidateCommand,
            &["file:validate", "-u", "u1", "-f", input.to_str().unwrap(), "--dry-run"],
        )
        .await
        .unwrap();

        assert!(!h.store.has_user("u1"));
    }

    #[tokio::test]
    async fn process_runs_for_the_active_file() {
        let h = harness().await;
        h.validated("u1", "f1").await;
        h.executor.push(Script::Succeed);

        h.run(&ProcessCommand, &["file:process", "-u", "u1", "-b", "B1"])
            .await
            .unwrap();

        assert_eq!(
            h.store.processing_history("f1"),
            vec![P::New, P::Running, P::Done]
        );
    }
}
