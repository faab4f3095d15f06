//! Behavioural tests for running commands through the CLI.
//!
//! These use local programs such as `echo` and `sh` as the executor's
//! program prefix so no SSH connection is attempted.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use predicates::str::contains;

const CONFIG_VARS: [&str; 5] = [
    "FLEETSSH_DISCOVERER",
    "FLEETSSH_FILTER",
    "FLEETSSH_EXECUTOR",
    "FLEETSSH_AWS_BIN",
    "FLEETSSH_CONFIG_PATH",
];

fn fleetssh() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("fleetssh");
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn sequential_executor_labels_each_target() {
    let mut cmd = fleetssh();
    cmd.args(["-e", "(external-sequential echo)", "web-1,root@web-2", "hi"]);

    cmd.assert()
        .success()
        .stdout(contains("web-1: web-1 hi"))
        .stdout(contains("root@web-2: root@web-2 hi"));
}

#[test]
fn single_run_executor_passes_all_targets_at_once() {
    let mut cmd = fleetssh();
    cmd.args(["-e", "(external echo)", "a,b,c", "uptime"]);

    cmd.assert().success().stdout(contains("a b c: a b c uptime"));
}

#[test]
fn failing_job_sets_the_exit_code() {
    let mut cmd = fleetssh();
    cmd.args(["-e", r#"(external sh -c "exit 3")"#, "a,b", "ignored"]);

    cmd.assert().code(3);
}

#[test]
fn parallel_failures_do_not_stop_siblings() {
    let mut cmd = fleetssh();
    cmd.args([
        "-e",
        r#"(external-parallel sh -c "echo ran $0; test $0 != bad")"#,
        "good,bad,other",
    ]);

    cmd.assert()
        .code(1)
        .stdout(contains("good: ran good"))
        .stdout(contains("bad: ran bad"))
        .stdout(contains("other: ran other"));
}

#[test]
fn unknown_executor_is_rejected_before_running() {
    let mut cmd = fleetssh();
    cmd.args(["-e", "(if-command (telnet) (noop))", "a", "ls"]);

    cmd.assert()
        .code(1)
        .stderr(contains("executor \"telnet\" is not known"));
}

#[test]
fn login_executor_refuses_a_command() {
    let mut cmd = fleetssh();
    cmd.args(["-e", "(ssh-login)", "a", "ls"]);

    cmd.assert()
        .code(1)
        .stderr(contains("must be invoked without a command"));
}

#[test]
fn default_executor_requires_targets() {
    let mut cmd = fleetssh();
    cmd.args([" , ", "ls"]);

    cmd.assert()
        .code(1)
        .stderr(contains("no targets matched"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn executor_can_come_from_the_environment() {
    let mut cmd = fleetssh();
    cmd.env("FLEETSSH_EXECUTOR", "(external-sequential echo)");
    cmd.args(["db-1", "hello"]);

    cmd.assert().success().stdout(contains("db-1: db-1 hello"));
}
