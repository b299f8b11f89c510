//! Command implementations, grouped by the prefix of their name.

pub mod file;
pub mod http;
pub mod messenger;
pub mod storage;
pub mod user;

use clap::{Arg, ArgAction};

fn user_id_arg() -> Arg {
    Arg::new("user-id")
        .short('u')
        .long("user-id")
        .help("User identifier")
        .required(true)
}

fn dry_run_arg() -> Arg {
    Arg::new("dry-run")
        .long("dry-run")
        .help("Run the executable without touching the database")
        .action(ArgAction::SetTrue)
}
