//! Terminal executor that dispatches jobs to the process runner.

use std::fmt;

use tracing::{info, warn};

use super::ExecError;
use crate::compile::CompileError;
use crate::runner::{Job, JobOutcome, JobRunner};
use crate::target::{Target, render_all};

/// Strategy for mapping one command over the target set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FanOut {
    /// One invocation receiving every target.
    SingleRun,
    /// One invocation per target, each finishing before the next starts.
    Sequential,
    /// One invocation per target, all launched at once.
    Parallel,
}

/// Runs a fixed program prefix against the targets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct External {
    prefix: Vec<String>,
    fan_out: FanOut,
    interactive: bool,
}

impl External {
    /// Creates the node from its literal argument prefix (program first).
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Argument`] when `prefix` is empty or the
    /// program name is blank.
    pub fn new(
        prefix: Vec<String>,
        fan_out: FanOut,
        interactive: bool,
    ) -> Result<Self, CompileError> {
        let node = Self {
            prefix,
            fan_out,
            interactive,
        };
        match node.prefix.first() {
            None => Err(CompileError::Argument {
                node: node.name(),
                expected: String::from("at least 1 literal argument"),
            }),
            Some(program) if program.trim().is_empty() => Err(CompileError::Argument {
                node: node.name(),
                expected: String::from("a non-blank program name"),
            }),
            Some(_) => Ok(node),
        }
    }

    /// Registered name of this configuration, e.g. `external-sequential`.
    #[must_use]
    pub fn name(&self) -> String {
        let mut name = String::from("external");
        match self.fan_out {
            FanOut::SingleRun => {}
            FanOut::Sequential => name.push_str("-sequential"),
            FanOut::Parallel => name.push_str("-parallel"),
        }
        if self.interactive {
            name.push_str("-interactive");
        }
        name
    }

    /// Fan-out strategy.
    #[must_use]
    pub const fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    /// Builds the jobs this node would run, without running them.
    #[must_use]
    pub fn jobs(&self, targets: &[Target], command: &[String]) -> Vec<Job> {
        match self.fan_out {
            FanOut::SingleRun => {
                let rendered = render_all(targets);
                let label = rendered.join(" ");
                vec![self.job(label, rendered, command)]
            }
            FanOut::Sequential | FanOut::Parallel => targets
                .iter()
                .map(|target| {
                    let rendered = target.to_string();
                    self.job(rendered.clone(), vec![rendered], command)
                })
                .collect(),
        }
    }

    fn job(&self, label: String, targets: Vec<String>, command: &[String]) -> Job {
        let mut argv = self.prefix.clone();
        argv.extend(targets);
        argv.extend(command.iter().cloned());
        Job {
            argv,
            interactive: self.interactive,
            label,
        }
    }

    /// Runs the jobs according to the fan-out strategy.
    ///
    /// Non-zero exits are reported in the returned outcomes and never stop
    /// later targets.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Runner`] when a job cannot be started. In parallel
    /// mode the error is returned only after every sibling has finished.
    pub async fn exec(
        &self,
        targets: &[Target],
        command: &[String],
        runner: &dyn JobRunner,
    ) -> Result<Vec<JobOutcome>, ExecError> {
        let jobs = self.jobs(targets, command);
        match self.fan_out {
            FanOut::SingleRun | FanOut::Sequential => {
                let mut outcomes = Vec::with_capacity(jobs.len());
                for job in &jobs {
                    let outcome = runner.run(job).await?;
                    if !outcome.is_success() {
                        warn!(node = %self, label = %outcome.label, code = ?outcome.code, "invocation failed");
                    }
                    outcomes.push(outcome);
                }
                Ok(outcomes)
            }
            FanOut::Parallel => {
                info!(command = ?command, targets = ?render_all(targets), "executing in parallel");
                let results = runner.run_parallel(jobs).await;
                let mut outcomes = Vec::with_capacity(results.len());
                let mut first_error = None;
                for result in results {
                    match result {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(err) => {
                            warn!(node = %self, error = %err, "parallel invocation failed to start");
                            first_error.get_or_insert(err);
                        }
                    }
                }
                match first_error {
                    Some(err) => Err(err.into()),
                    None => Ok(outcomes),
                }
            }
        }
    }
}

impl fmt::Display for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.name(), self.prefix.join(" "))
    }
}
