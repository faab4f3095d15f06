//! End-to-end pipeline behaviour using the scripted test doubles.

use fleetssh::test_support::{
    RecordingJobRunner, ScriptedRunner, describe_instances_json, instance_json,
};
use fleetssh::{
    AwsCli, ExecError, FleetConfig, Pipeline, RunError, RunOrchestrator, Target,
};
use rstest::{fixture, rstest};

struct Harness {
    aws: ScriptedRunner,
    jobs: RecordingJobRunner,
}

#[fixture]
fn harness() -> Harness {
    Harness {
        aws: ScriptedRunner::new(),
        jobs: RecordingJobRunner::new(),
    }
}

fn orchestrator(
    harness: &Harness,
    discoverer: &str,
    filter: &str,
    executor: &str,
) -> RunOrchestrator<ScriptedRunner, RecordingJobRunner> {
    let config = FleetConfig {
        discoverer: discoverer.to_owned(),
        filter: filter.to_owned(),
        executor: executor.to_owned(),
        ..FleetConfig::default()
    };
    RunOrchestrator::new(
        Pipeline::from_config(&config).expect("pipeline compiles"),
        AwsCli::new("aws", harness.aws.clone()),
        harness.jobs.clone(),
    )
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

#[rstest]
#[tokio::test]
async fn tag_search_then_id_lookup_then_parallel_exec(harness: Harness) {
    harness.aws.push_stdout(describe_instances_json(vec![vec![
        instance_json("i-0aaaaaaaaaaaaaaaa", None, &[("role", "db")]),
        instance_json("i-0bbbbbbbbbbbbbbbb", Some("203.0.113.2"), &[("role", "db")]),
        instance_json("i-0cccccccccccccccc", Some("203.0.113.3"), &[("role", "web")]),
    ]]));
    harness.aws.push_stdout(describe_instances_json(vec![vec![instance_json(
        "i-0aaaaaaaaaaaaaaaa",
        Some("203.0.113.1"),
        &[],
    )]]));
    let run = orchestrator(
        &harness,
        "(aws-ec2-tag eu-west-1)",
        "(list (ec2-instance-id eu-west-1))",
        "(ssh-exec-parallel)",
    );

    let summary = run
        .execute("role=db", &words(&["uptime"]))
        .await
        .expect("run completes");

    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        harness.jobs.parallel_batches(),
        vec![words(&["203.0.113.1", "203.0.113.2"])]
    );
    assert_eq!(
        harness.jobs.argvs(),
        vec![
            words(&["ssh", "203.0.113.1", "uptime"]),
            words(&["ssh", "203.0.113.2", "uptime"]),
        ]
    );
    assert_eq!(harness.aws.invocations().len(), 2);
}

#[rstest]
#[tokio::test]
async fn default_executor_with_one_target_logs_in(harness: Harness) {
    let run = orchestrator(
        &harness,
        "(comma-separated)",
        "(id)",
        &FleetConfig::default().executor,
    );

    run.execute("root@web-1", &[]).await.expect("run completes");

    let jobs = harness.jobs.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].argv, words(&["ssh", "root@web-1"]));
    assert!(jobs[0].interactive);
}

#[rstest]
#[tokio::test]
async fn default_executor_with_several_targets_opens_tmux_cssh(harness: Harness) {
    let run = orchestrator(
        &harness,
        "(comma-separated)",
        "(id)",
        &FleetConfig::default().executor,
    );

    run.execute("root@a,b", &[]).await.expect("run completes");

    assert_eq!(harness.jobs.argvs(), vec![words(&["tmux-cssh", "root@a", "b"])]);
}

#[rstest]
#[tokio::test]
async fn default_executor_with_command_runs_sequential_ssh(harness: Harness) {
    harness.jobs.exit_with("b", Some(255));
    let run = orchestrator(
        &harness,
        "(comma-separated)",
        "(id)",
        &FleetConfig::default().executor,
    );

    let summary = run
        .execute("a,b,c", &words(&["hostname"]))
        .await
        .expect("run completes");

    assert_eq!(harness.jobs.jobs().len(), 3, "a failure does not stop later targets");
    assert!(harness.jobs.parallel_batches().is_empty());
    assert_eq!(summary.exit_code(), 255);
    assert_eq!(summary.failures().count(), 1);
}

#[rstest]
#[tokio::test]
async fn failed_lookup_keeps_the_original_host(harness: Harness) {
    harness.aws.push_failure(255);
    let run = orchestrator(
        &harness,
        "(comma-separated)",
        "(ec2-instance-id us-east-1)",
        "(external-sequential ssh)",
    );

    run.execute("ubuntu@i-deadbeef", &words(&["id"]))
        .await
        .expect("lookup failures are not fatal");

    let expected: Target = "ubuntu@i-deadbeef".parse().expect("valid target");
    assert_eq!(
        harness.jobs.argvs(),
        vec![words(&["ssh", &expected.to_string(), "id"])]
    );
}

#[rstest]
#[tokio::test]
async fn assertion_failure_aborts_before_any_job(harness: Harness) {
    let run = orchestrator(&harness, "(comma-separated)", "(id)", "(ssh-exec)");

    let err = run.execute("a,b", &[]).await.expect_err("command required");

    assert!(matches!(err, RunError::Exec(ExecError::CommandRequired { .. })));
    assert!(harness.jobs.jobs().is_empty());
}

#[rstest]
#[tokio::test]
async fn unmatched_tag_search_reports_no_targets(harness: Harness) {
    harness.aws.push_stdout(describe_instances_json(vec![vec![instance_json(
        "i-11111111",
        Some("203.0.113.9"),
        &[("env", "stage")],
    )]]));
    let run = orchestrator(&harness, "(aws-ec2-tag eu-west-1)", "(id)", "(noop)");

    let err = run
        .execute("env=prod", &[])
        .await
        .expect_err("nothing matched");

    assert!(matches!(err, RunError::NoTargets { ref query } if query == "env=prod"));
}
