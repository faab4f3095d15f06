//! Orchestrates one invocation: discover, filter, execute.
//!
//! All three node trees are compiled up front, so a configuration error is
//! reported before any lookup or process is started.

use thiserror::Error;
use tracing::{debug, info};

use crate::aws::AwsCli;
use crate::compile::{CompileError, NodeKind};
use crate::config::FleetConfig;
use crate::discover::{DiscoverError, Discoverer};
use crate::executor::{ExecError, Executor};
use crate::filter::Filter;
use crate::runner::{CommandRunner, JobOutcome, JobRunner};
use crate::target::render_all;

/// Errors surfaced while performing a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Raised when one of the configured expressions does not compile.
    #[error("invalid {stage} expression: {source}")]
    Compile {
        /// Node kind whose expression failed.
        stage: &'static str,
        /// Underlying construction error.
        #[source]
        source: CompileError,
    },
    /// Raised when the query cannot be turned into targets.
    #[error("discovery failed: {0}")]
    Discover(#[from] DiscoverError),
    /// Raised when discovery and filtering leave nothing to run against.
    #[error("no targets matched {query:?}")]
    NoTargets {
        /// Query given by the user.
        query: String,
    },
    /// Raised when the executor aborts.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Compiled discoverer, filter and executor trees.
#[derive(Clone, Debug)]
pub struct Pipeline {
    /// Turns the query into targets.
    pub discoverer: Discoverer,
    /// Rewrites the target list.
    pub filter: Filter,
    /// Runs the command.
    pub executor: Executor,
}

impl Pipeline {
    /// Compiles the expressions held by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Compile`] naming the first expression that fails.
    pub fn from_config(config: &FleetConfig) -> Result<Self, RunError> {
        Ok(Self {
            discoverer: compile_stage(&config.discoverer)?,
            filter: compile_stage(&config.filter)?,
            executor: compile_stage(&config.executor)?,
        })
    }
}

fn compile_stage<N: NodeKind>(source: &str) -> Result<N, RunError> {
    crate::compile::compile(source).map_err(|source| RunError::Compile {
        stage: N::KIND,
        source,
    })
}

/// Outcomes of every job started by a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// Outcomes in the order jobs were submitted.
    pub outcomes: Vec<JobOutcome>,
}

impl RunSummary {
    /// Outcomes that did not exit with status zero.
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    /// Process exit code for the run: zero when every job succeeded,
    /// otherwise the first failing job's code, or 1 when it had none.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.failures()
            .next()
            .map_or(0, |outcome| outcome.code.unwrap_or(1))
    }
}

/// Executes the pipeline with the provided lookup and job runners.
#[derive(Debug)]
pub struct RunOrchestrator<R: CommandRunner, J: JobRunner> {
    pipeline: Pipeline,
    aws: AwsCli<R>,
    jobs: J,
}

impl<R: CommandRunner, J: JobRunner> RunOrchestrator<R, J> {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(pipeline: Pipeline, aws: AwsCli<R>, jobs: J) -> Self {
        Self {
            pipeline,
            aws,
            jobs,
        }
    }

    /// Compiled trees used by this orchestrator.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs `command` against the targets found for `query`.
    ///
    /// Failed jobs are reported in the summary rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when discovery fails, no targets remain, or the
    /// executor refuses the command or cannot start a job.
    pub async fn execute(&self, query: &str, command: &[String]) -> Result<RunSummary, RunError> {
        let discovered = self.pipeline.discoverer.discover(query, &self.aws)?;
        debug!(discoverer = %self.pipeline.discoverer, targets = ?render_all(&discovered), "discovered targets");

        let targets = self.pipeline.filter.apply(discovered, &self.aws);
        info!(filter = %self.pipeline.filter, targets = ?render_all(&targets), "targets after filtering");
        if targets.is_empty() {
            return Err(RunError::NoTargets {
                query: query.to_owned(),
            });
        }

        let outcomes = self
            .pipeline
            .executor
            .exec(&targets, command, &self.jobs)
            .await?;
        Ok(RunSummary { outcomes })
    }
}
