//! Thin wrapper around the `aws` CLI used by cloud-backed filters and
//! discoverers.
//!
//! Lookups shell out through a [`CommandRunner`] and parse the JSON output.
//! Callers treat every [`AwsError`] as a resolution failure: it is logged and
//! the pipeline carries on with whatever it already has.

use std::ffi::OsString;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::runner::{CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError};

mod types;

pub use types::{DescribeInstances, Instance, Reservation, Tag};

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Errors raised by AWS CLI lookups.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AwsError {
    /// Raised when the CLI cannot be started.
    #[error(transparent)]
    Runner(#[from] RunnerError),
    /// Raised when the CLI exits unsuccessfully.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `aws`).
        program: String,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse describe-instances output: {message}")]
    Parse {
        /// Parser error message.
        message: String,
    },
}

/// Runs `aws ec2` queries through a command runner.
#[derive(Clone, Debug)]
pub struct AwsCli<R: CommandRunner> {
    bin: String,
    runner: R,
}

impl AwsCli<ProcessCommandRunner> {
    /// Creates a wrapper that spawns real processes.
    #[must_use]
    pub fn with_process_runner(bin: impl Into<String>) -> Self {
        Self::new(bin, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> AwsCli<R> {
    /// Creates a wrapper around `bin` using the given runner.
    #[must_use]
    pub fn new(bin: impl Into<String>, runner: R) -> Self {
        Self {
            bin: bin.into(),
            runner,
        }
    }

    /// Binary invoked for every query.
    #[must_use]
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Runs `aws ec2 describe-instances <args> --output json`.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError`] when the CLI cannot be run, exits unsuccessfully
    /// or prints something other than the expected JSON.
    pub fn describe_instances(&self, args: &[OsString]) -> Result<DescribeInstances, AwsError> {
        let mut argv = vec![OsString::from("ec2"), OsString::from("describe-instances")];
        argv.extend(args.iter().cloned());
        argv.push(OsString::from("--output"));
        argv.push(OsString::from("json"));

        let output = self.runner.run(&self.bin, &argv)?;
        let stdout = self.check_output(output)?;
        debug!(response = %stdout.trim(), "response from describe-instances");
        serde_json::from_str(&stdout).map_err(|err| AwsError::Parse {
            message: err.to_string(),
        })
    }

    /// Looks up the public address of instance `id` in `region`.
    ///
    /// Any failure, including an empty reservation list or a missing
    /// address, is logged and reported as `None`.
    #[must_use]
    pub fn resolve(&self, id: &str, region: &str) -> Option<String> {
        info!(instance = id, region, "looking up EC2 instance");
        let args = [
            OsString::from("--instance-ids"),
            OsString::from(id),
            OsString::from("--region"),
            OsString::from(region),
        ];
        let response = match self.describe_instances(&args) {
            Ok(response) => response,
            Err(err) => {
                warn!(instance = id, region, error = %err, "EC2 instance lookup failed");
                return None;
            }
        };
        let address = response
            .reservations
            .first()
            .and_then(|reservation| reservation.instances.first())
            .and_then(|instance| instance.public_ip_address.clone());
        if address.is_none() {
            warn!(
                instance = id,
                region, "EC2 instance lookup returned no public address"
            );
        }
        address
    }

    fn check_output(&self, output: CommandOutput) -> Result<String, AwsError> {
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(AwsError::CommandFailure {
            program: self.bin.clone(),
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }
}
