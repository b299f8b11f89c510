//! Static command registry.

use crate::app::AppContext;
use crate::commands::{file, http, messenger, storage, user};
use anyhow::anyhow;
use async_trait::async_trait;
use clap::{ArgMatches, Command};

#[async_trait]
pub trait CliCommand: Send + Sync {
    /// Clap definition; its name is the command's registry key.
    fn describe(&self) -> Command;

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()>;

    fn name(&self) -> String {
        self.describe().get_name().to_string()
    }
}

/// Every command the binary knows, in help order.
pub fn registry() -> Vec<Box<dyn CliCommand>> {
    vec![
        Box::new(file::ValidateCommand),
        Box::new(file::ProcessCommand),
        Box::new(user::AllCommand),
        Box::new(user::InfoCommand),
        Box::new(user::DeleteCommand),
        Box::new(user::ResetCommand),
        Box::new(storage::MigrateCommand),
        Box::new(storage::ResetCommand),
        Box::new(messenger::ConsumeCommand),
        Box::new(messenger::CreateCommand),
        Box::new(http::ServeCommand),
    ]
}

pub fn root_command(registry: &[Box<dyn CliCommand>]) -> Command {
    registry.iter().fold(
        Command::new("genoflow")
            .about("Genotype file validation and processing pipeline")
            .version(env!("CARGO_PKG_VERSION"))
            .subcommand_required(true)
            .arg_required_else_help(true),
        |root, command| root.subcommand(command.describe()),
    )
}

pub fn find<'a>(registry: &'a [Box<dyn CliCommand>], name: &str) -> Option<&'a dyn CliCommand> {
    registry
        .iter()
        .find(|command| command.name() == name)
        .map(|command| command.as_ref())
}

/// A string argument clap has already enforced as required.
pub(crate) fn required<'a>(args: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing required argument --{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let registry = registry();
        let names: HashSet<String> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), registry.len());
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn definitions_are_consistent() {
        root_command(&registry()).debug_assert();
    }

    #[test]
    fn parses_into_a_registered_command() {
        let registry = registry();
        let matches = root_command(&registry)
            .try_get_matches_from(["genoflow", "file:process", "-u", "u1", "-b", "B1"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();

        assert!(find(&registry, name).is_some());
        assert_eq!(required(args, "user-id").unwrap(), "u1");
        assert_eq!(required(args, "barcode").unwrap(), "B1");
        assert!(!args.get_flag("dry-run"));
    }

    #[test]
    fn missing_required_flag_is_rejected() {
        let err = root_command(&registry())
            .try_get_matches_from(["genoflow", "user:info"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(root_command(&registry())
            .try_get_matches_from(["genoflow", "file:delete"])
            .is_err());
        assert!(find(&registry(), "file:delete").is_none());
    }
}
