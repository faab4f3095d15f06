//! Process-runner boundary used by executors and provider lookups.
//!
//! Two seams live here. [`JobRunner`] launches the user-facing invocations
//! built by `external` executors, one at a time or as a concurrent batch,
//! either attached to the controlling terminal or with captured output.
//! [`CommandRunner`] runs short helper commands (the `aws` CLI) and hands
//! their captured output back for parsing.

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::process::Stdio;

use shell_escape::unix::escape;
use thiserror::Error;
use tracing::{debug, warn};

mod types;

pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner};

/// Errors raised when a process cannot be run at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a job carries no program to run.
    #[error("job {label:?} has an empty argument vector")]
    EmptyArgv {
        /// Label of the offending job.
        label: String,
    },
    /// Raised when a parallel task dies before reporting an outcome.
    #[error("task for {label:?} did not complete: {message}")]
    Join {
        /// Label of the lost job.
        label: String,
        /// Runtime error string.
        message: String,
    },
}

/// One process invocation requested by an executor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Attach to the controlling terminal instead of capturing output.
    pub interactive: bool,
    /// Display label, usually the rendered target(s).
    pub label: String,
}

impl Job {
    /// Renders the argument vector as a shell-quoted command line.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.argv
            .iter()
            .map(|arg| escape(arg.as_str().into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of one finished job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobOutcome {
    /// Label of the job that produced this outcome.
    pub label: String,
    /// Exit code, absent when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output; empty for interactive jobs.
    pub stdout: String,
    /// Captured standard error; empty for interactive jobs.
    pub stderr: String,
}

impl JobOutcome {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Future returned by [`JobRunner`] operations.
pub type RunnerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Launches executor jobs. Implementations must tolerate concurrent use.
pub trait JobRunner: Send + Sync {
    /// Runs one job to completion.
    fn run<'a>(&'a self, job: &'a Job) -> RunnerFuture<'a, Result<JobOutcome, RunnerError>>;

    /// Launches every job concurrently and waits for all of them. Results are
    /// returned in job order; a failing job does not cancel its siblings.
    fn run_parallel(&self, jobs: Vec<Job>)
    -> RunnerFuture<'_, Vec<Result<JobOutcome, RunnerError>>>;
}

/// Job runner backed by `tokio::process`.
#[derive(Clone, Debug, Default)]
pub struct ProcessJobRunner;

impl JobRunner for ProcessJobRunner {
    fn run<'a>(&'a self, job: &'a Job) -> RunnerFuture<'a, Result<JobOutcome, RunnerError>> {
        Box::pin(run_job(job.clone()))
    }

    fn run_parallel(
        &self,
        jobs: Vec<Job>,
    ) -> RunnerFuture<'_, Vec<Result<JobOutcome, RunnerError>>> {
        Box::pin(async move {
            let mut handles = Vec::with_capacity(jobs.len());
            for job in jobs {
                let label = job.label.clone();
                handles.push((label, tokio::spawn(run_job(job))));
            }

            let mut results = Vec::with_capacity(handles.len());
            for (label, handle) in handles {
                results.push(handle.await.unwrap_or_else(|err| {
                    Err(RunnerError::Join {
                        label,
                        message: err.to_string(),
                    })
                }));
            }
            results
        })
    }
}

async fn run_job(job: Job) -> Result<JobOutcome, RunnerError> {
    let Some((program, args)) = job.argv.split_first() else {
        return Err(RunnerError::EmptyArgv { label: job.label });
    };
    debug!(label = %job.label, command = %job.command_line(), interactive = job.interactive, "starting job");

    let spawn_error = |err: io::Error| RunnerError::Spawn {
        program: program.clone(),
        message: err.to_string(),
    };
    let mut command = tokio::process::Command::new(program);
    command.args(args);

    let outcome = if job.interactive {
        let status = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(spawn_error)?;
        JobOutcome {
            label: job.label.clone(),
            code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
        }
    } else {
        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;
        let outcome = JobOutcome {
            label: job.label.clone(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        echo_labelled(&outcome);
        outcome
    };

    if !outcome.is_success() {
        warn!(label = %outcome.label, code = ?outcome.code, "job exited unsuccessfully");
    }
    Ok(outcome)
}

/// Replays captured output line by line, prefixed with the job label.
fn echo_labelled(outcome: &JobOutcome) {
    let mut stdout = io::stdout().lock();
    for line in outcome.stdout.lines() {
        writeln!(stdout, "{}: {line}", outcome.label).ok();
    }
    let mut stderr = io::stderr().lock();
    for line in outcome.stderr.lines() {
        writeln!(stderr, "{}: {line}", outcome.label).ok();
    }
}
