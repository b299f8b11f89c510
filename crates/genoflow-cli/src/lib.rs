//! The `genoflow` command line.
//!
//! Commands are listed explicitly in [`command::registry`]; each one
//! describes its clap definition and executes against a shared
//! [`AppContext`] that opens database, bus and storage connections lazily.

pub mod app;
pub mod command;
pub mod commands;
pub mod table;

pub use app::AppContext;
pub use command::{find, registry, root_command, CliCommand};
#[cfg(test)]
mod test_support;
