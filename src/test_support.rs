//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};

use crate::runner::{
    CommandOutput, CommandRunner, Job, JobOutcome, JobRunner, RunnerError, RunnerFuture,
};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic `aws` lookups without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful response carrying `stdout`.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RunnerError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

#[derive(Debug, Default)]
struct Recording {
    jobs: Vec<Job>,
    parallel_batches: Vec<Vec<String>>,
    exit_codes: HashMap<String, Option<i32>>,
    unspawnable: HashSet<String>,
}

/// Job runner that records every job instead of starting processes.
///
/// Jobs succeed unless an exit code was scripted for their label with
/// [`RecordingJobRunner::exit_with`]. Clones share one recording.
#[derive(Clone, Debug, Default)]
pub struct RecordingJobRunner {
    state: Arc<StdMutex<Recording>>,
}

impl RecordingJobRunner {
    /// Creates a runner with an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StdMutexGuard<'_, Recording> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes jobs labelled `label` finish with `code`.
    pub fn exit_with(&self, label: &str, code: Option<i32>) {
        self.state().exit_codes.insert(label.to_owned(), code);
    }

    /// Makes jobs labelled `label` fail to start.
    pub fn fail_to_spawn(&self, label: &str) {
        self.state().unspawnable.insert(label.to_owned());
    }

    /// Every job seen so far, in submission order.
    #[must_use]
    pub fn jobs(&self) -> Vec<Job> {
        self.state().jobs.clone()
    }

    /// Argument vectors of every job seen so far.
    #[must_use]
    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.state().jobs.iter().map(|job| job.argv.clone()).collect()
    }

    /// Labels of each batch passed to [`JobRunner::run_parallel`].
    #[must_use]
    pub fn parallel_batches(&self) -> Vec<Vec<String>> {
        self.state().parallel_batches.clone()
    }

    fn record(&self, job: &Job) -> Result<JobOutcome, RunnerError> {
        let mut state = self.state();
        state.jobs.push(job.clone());
        if state.unspawnable.contains(&job.label) {
            return Err(RunnerError::Spawn {
                program: job.argv.first().cloned().unwrap_or_default(),
                message: String::from("simulated spawn failure"),
            });
        }
        let code = state.exit_codes.get(&job.label).copied().unwrap_or(Some(0));
        Ok(JobOutcome {
            label: job.label.clone(),
            code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

impl JobRunner for RecordingJobRunner {
    fn run<'a>(&'a self, job: &'a Job) -> RunnerFuture<'a, Result<JobOutcome, RunnerError>> {
        let result = self.record(job);
        Box::pin(async move { result })
    }

    fn run_parallel(
        &self,
        jobs: Vec<Job>,
    ) -> RunnerFuture<'_, Vec<Result<JobOutcome, RunnerError>>> {
        self.state()
            .parallel_batches
            .push(jobs.iter().map(|job| job.label.clone()).collect());
        let results = jobs.iter().map(|job| self.record(job)).collect();
        Box::pin(async move { results })
    }
}

/// Builds one instance entry for [`describe_instances_json`].
#[must_use]
pub fn instance_json(id: &str, public_ip: Option<&str>, tags: &[(&str, &str)]) -> Value {
    let tags: Vec<Value> = tags
        .iter()
        .map(|(key, value)| json!({ "Key": key, "Value": value }))
        .collect();
    let mut instance = json!({ "InstanceId": id, "Tags": tags });
    if let (Some(ip), Some(object)) = (public_ip, instance.as_object_mut()) {
        object.insert(String::from("PublicIpAddress"), json!(ip));
    }
    instance
}

/// Produces a payload shaped like `aws ec2 describe-instances --output json`,
/// one reservation per inner vector.
#[must_use]
pub fn describe_instances_json(reservations: Vec<Vec<Value>>) -> String {
    let reservations: Vec<Value> = reservations
        .into_iter()
        .map(|instances| json!({ "Instances": instances }))
        .collect();
    json!({ "Reservations": reservations }).to_string()
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }

    /// Removes variables for the guard's lifetime while holding the mutex.
    pub async fn remove_vars(keys: &[&str]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::remove_var(key) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
