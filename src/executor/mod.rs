//! Executor nodes: decide how a command reaches the target set.
//!
//! An [`Executor`] tree is compiled once from an expression such as
//! `(if-command (ssh-exec) (if-one-target (ssh-login) (tmux-cssh)))` and is
//! immutable afterwards. Inner nodes branch on the command and target count
//! or guard the command's presence; [`External`] leaves turn the targets and
//! command into jobs for a [`JobRunner`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use crate::compile::{self, ArgSchema, Args, Arity, CompileError, Entry, NodeKind, Slot};
use crate::rewrite::{RewriteRule, Rewriter};
use crate::runner::{JobOutcome, JobRunner, RunnerError};
use crate::target::Target;

mod external;

pub use external::{External, FanOut};

/// Shorthand forms expanded before construction, in application order.
pub const EXECUTOR_MACROS: &[RewriteRule] = &[
    RewriteRule::new("(if-args)", "(if-command)"),
    RewriteRule::new(
        "(ssh-login)",
        "(assert-no-command (external-sequential-interactive ssh))",
    ),
    RewriteRule::new("(ssh-exec)", "(ssh-exec-sequential)"),
    RewriteRule::new(
        "(ssh-exec-sequential)",
        "(assert-command (external-sequential ssh))",
    ),
    RewriteRule::new(
        "(ssh-exec-parallel)",
        "(assert-command (external-parallel ssh))",
    ),
    RewriteRule::new(
        "(csshx)",
        "(assert-no-command (external-interactive csshx))",
    ),
    RewriteRule::new(
        "(tmux-cssh)",
        "(assert-no-command (external-interactive tmux-cssh))",
    ),
];

const ONE_CHILD: ArgSchema = ArgSchema::new(Arity::Exactly(1), Slot::Node);
const TWO_CHILDREN: ArgSchema = ArgSchema::new(Arity::Exactly(2), Slot::Node);
const PROGRAM_PREFIX: ArgSchema = ArgSchema::new(Arity::AtLeast(1), Slot::Literal);

static REGISTRY: &[Entry<Executor>] = &[
    Entry::new("assert-command", ONE_CHILD, make_assert_command),
    Entry::new("assert-no-command", ONE_CHILD, make_assert_no_command),
    Entry::new("external", PROGRAM_PREFIX, make_external),
    Entry::new("external-interactive", PROGRAM_PREFIX, make_external),
    Entry::new("external-sequential", PROGRAM_PREFIX, make_external),
    Entry::new("external-sequential-interactive", PROGRAM_PREFIX, make_external),
    Entry::new("external-parallel", PROGRAM_PREFIX, make_external),
    Entry::new("if-command", TWO_CHILDREN, make_if_command),
    Entry::new("if-one-target", TWO_CHILDREN, make_if_one_target),
    Entry::new("noop", ArgSchema::NONE, make_noop),
];

/// Errors raised while executing a tree.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// An `assert-command` guard saw no command.
    #[error("{node} requires a command, but none was given")]
    CommandRequired {
        /// Rendering of the guarding node.
        node: String,
    },
    /// An `assert-no-command` guard saw a command.
    #[error("{node} must be invoked without a command, got {command:?}")]
    CommandForbidden {
        /// Rendering of the guarding node.
        node: String,
        /// Command that was supplied.
        command: Vec<String>,
    },
    /// A job could not be started.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Future returned by [`Executor::exec`].
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<JobOutcome>, ExecError>> + Send + 'a>>;

/// Executor node tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Executor {
    /// Fails unless the command's presence matches `require`, then delegates.
    AssertCommand {
        /// `true` demands a command, `false` forbids one.
        require: bool,
        /// Executor run when the guard passes.
        inner: Box<Executor>,
    },
    /// Branches on whether a command was supplied.
    IfCommand {
        /// Branch taken for a non-empty command.
        with_command: Box<Executor>,
        /// Branch taken for an empty command.
        without_command: Box<Executor>,
    },
    /// Branches on whether exactly one target is present.
    IfOneTarget {
        /// Branch taken for exactly one target.
        one: Box<Executor>,
        /// Branch taken for any other count.
        more: Box<Executor>,
    },
    /// Dispatches jobs to the runner.
    External(External),
    /// Does nothing.
    Noop,
}

impl Executor {
    /// Compiles an executor expression, expanding executor macros.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the expression is malformed or names an
    /// unknown node or passes it the wrong arguments.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        compile::compile(source)
    }

    /// Executes `command` against `targets`, returning one outcome per job.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] when a command guard fails or a job cannot be
    /// started.
    pub fn exec<'a>(
        &'a self,
        targets: &'a [Target],
        command: &'a [String],
        runner: &'a dyn JobRunner,
    ) -> ExecFuture<'a> {
        Box::pin(async move {
            match self {
                Self::AssertCommand { require, inner } => {
                    if *require && command.is_empty() {
                        return Err(ExecError::CommandRequired {
                            node: self.to_string(),
                        });
                    }
                    if !*require && !command.is_empty() {
                        return Err(ExecError::CommandForbidden {
                            node: self.to_string(),
                            command: command.to_vec(),
                        });
                    }
                    inner.exec(targets, command, runner).await
                }
                Self::IfCommand {
                    with_command,
                    without_command,
                } => {
                    let branch = if command.is_empty() {
                        debug!(node = %self, branch = %without_command, "got no command");
                        without_command
                    } else {
                        debug!(node = %self, branch = %with_command, "got a command");
                        with_command
                    };
                    branch.exec(targets, command, runner).await
                }
                Self::IfOneTarget { one, more } => {
                    let branch = if targets.len() == 1 {
                        debug!(node = %self, branch = %one, "got one target");
                        one
                    } else {
                        debug!(node = %self, branch = %more, targets = targets.len(), "got more than one target");
                        more
                    };
                    branch.exec(targets, command, runner).await
                }
                Self::External(external) => external.exec(targets, command, runner).await,
                Self::Noop => {
                    debug!("noop executor, nothing to run");
                    Ok(Vec::new())
                }
            }
        })
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssertCommand {
                require: true,
                inner,
            } => write!(f, "<assert-command {inner}>"),
            Self::AssertCommand {
                require: false,
                inner,
            } => write!(f, "<assert-no-command {inner}>"),
            Self::IfCommand {
                with_command,
                without_command,
            } => write!(f, "<if-command {with_command} {without_command}>"),
            Self::IfOneTarget { one, more } => write!(f, "<if-one-target {one} {more}>"),
            Self::External(external) => fmt::Display::fmt(external, f),
            Self::Noop => f.write_str("<noop>"),
        }
    }
}

impl NodeKind for Executor {
    const KIND: &'static str = "executor";

    fn registry() -> &'static [Entry<Self>] {
        REGISTRY
    }

    fn rewriter() -> Rewriter {
        Rewriter::new(EXECUTOR_MACROS)
    }
}

fn make_assert_command(name: &'static str, args: Args<Executor>) -> Result<Executor, CompileError> {
    Ok(Executor::AssertCommand {
        require: true,
        inner: Box::new(args.into_single(name)?),
    })
}

fn make_assert_no_command(
    name: &'static str,
    args: Args<Executor>,
) -> Result<Executor, CompileError> {
    Ok(Executor::AssertCommand {
        require: false,
        inner: Box::new(args.into_single(name)?),
    })
}

fn make_if_command(name: &'static str, args: Args<Executor>) -> Result<Executor, CompileError> {
    let (with_command, without_command) = args.into_pair(name)?;
    Ok(Executor::IfCommand {
        with_command: Box::new(with_command),
        without_command: Box::new(without_command),
    })
}

fn make_if_one_target(name: &'static str, args: Args<Executor>) -> Result<Executor, CompileError> {
    let (one, more) = args.into_pair(name)?;
    Ok(Executor::IfOneTarget {
        one: Box::new(one),
        more: Box::new(more),
    })
}

fn make_external(name: &'static str, args: Args<Executor>) -> Result<Executor, CompileError> {
    let (fan_out, interactive) = match name {
        "external" => (FanOut::SingleRun, false),
        "external-interactive" => (FanOut::SingleRun, true),
        "external-sequential" => (FanOut::Sequential, false),
        "external-sequential-interactive" => (FanOut::Sequential, true),
        "external-parallel" => (FanOut::Parallel, false),
        other => {
            return Err(CompileError::Internal(format!(
                "{other} is not an external executor"
            )));
        }
    };
    External::new(args.into_literals(name)?, fan_out, interactive).map(Executor::External)
}

fn make_noop(_name: &'static str, _args: Args<Executor>) -> Result<Executor, CompileError> {
    Ok(Executor::Noop)
}
