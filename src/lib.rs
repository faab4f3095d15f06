//! Core library for the fleetssh remote execution tool.
//!
//! A run is a three-stage pipeline, each stage described by a small
//! parenthesised expression: a [`Discoverer`] turns the user's query into
//! targets, a [`Filter`] rewrites that list (for example resolving EC2
//! instance ids) and an [`Executor`] decides how the command reaches the
//! targets. Expressions are compiled into closed node trees by
//! [`compile::compile`] and driven by [`RunOrchestrator`].

pub mod aws;
pub mod compile;
pub mod config;
pub mod discover;
pub mod executor;
pub mod expr;
pub mod filter;
pub mod rewrite;
pub mod run;
pub mod runner;
pub mod target;
pub mod test_support;

pub use aws::{AwsCli, AwsError};
pub use compile::{CompileError, NodeKind};
pub use config::{ConfigError, FleetConfig};
pub use discover::{DiscoverError, Discoverer};
pub use executor::{ExecError, Executor, External, FanOut};
pub use expr::{Form, ParseError};
pub use filter::Filter;
pub use rewrite::{RewriteError, RewriteRule, Rewriter};
pub use run::{Pipeline, RunError, RunOrchestrator, RunSummary};
pub use runner::{
    CommandOutput, CommandRunner, Job, JobOutcome, JobRunner, ProcessCommandRunner,
    ProcessJobRunner, RunnerError,
};
pub use target::{Target, TargetError};
