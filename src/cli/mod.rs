//! Command-line interface definitions for the `fleetssh` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{ArgAction, Parser};

/// Top-level CLI for the `fleetssh` binary.
#[derive(Debug, Parser)]
#[command(
    name = "fleetssh",
    version,
    about = "Discover hosts, filter them and run a command on each over SSH",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG`
    /// takes precedence when set.
    #[arg(short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Discoverer expression, e.g. `(aws-ec2-tag eu-west-1)`.
    #[arg(short = 'd', long, value_name = "EXPR")]
    pub(crate) discoverer: Option<String>,
    /// Filter expression, e.g. `(list (ec2-instance-id eu-west-1))`.
    #[arg(short = 'f', long, value_name = "EXPR")]
    pub(crate) filter: Option<String>,
    /// Executor expression, e.g. `(ssh-exec-parallel)`.
    #[arg(short = 'e', long, value_name = "EXPR")]
    pub(crate) executor: Option<String>,
    /// Print every discoverer, filter and executor name, then exit.
    #[arg(long, conflicts_with_all = ["query", "command"])]
    pub(crate) list_nodes: bool,
    /// Query handed to the discoverer, e.g. `web-1,root@web-2`.
    #[arg(required_unless_present = "list_nodes", value_name = "QUERY")]
    pub(crate) query: Option<String>,
    /// Command to run on the targets; omit it to log in interactively.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub(crate) command: Vec<String>,
}
