//! Tests for filter construction and application.

use super::*;
use crate::test_support::{ScriptedRunner, describe_instances_json, instance_json};
use rstest::{fixture, rstest};

#[fixture]
fn runner() -> ScriptedRunner {
    ScriptedRunner::new()
}

fn targets(names: &[&str]) -> Vec<Target> {
    names
        .iter()
        .map(|name| name.parse().expect("valid target"))
        .collect()
}

fn address_response(address: &str) -> String {
    describe_instances_json(vec![vec![instance_json("i-deadbeef", Some(address), &[])]])
}

#[rstest]
fn id_returns_input_unchanged(runner: ScriptedRunner) {
    let filter = Filter::compile("(id)").expect("compiles");
    let aws = AwsCli::new("aws", runner.clone());
    let input = targets(&["root@a", "b", "a"]);

    assert_eq!(filter.apply(input.clone(), &aws), input);
    assert!(runner.invocations().is_empty());
}

#[rstest]
fn empty_list_is_identity(runner: ScriptedRunner) {
    let filter = Filter::compile("(list)").expect("compiles");
    let input = targets(&["a", "b"]);
    assert_eq!(filter.apply(input.clone(), &AwsCli::new("aws", runner)), input);
}

#[rstest]
#[case("i-deadbeef-extra", Some("i-deadbeef"))]
#[case("web-i-0123456789abcdef0.internal", Some("i-0123456789abcdef0"))]
#[case("i-DEADBEEF", None)]
#[case("i-dead", None)]
#[case("db-1.example.com", None)]
fn instance_id_extraction(#[case] host: &str, #[case] expected: Option<&str>) {
    let lookup = Ec2InstanceIdLookup::new("eu-west-1").expect("valid region");
    assert_eq!(lookup.instance_id(host), expected);
}

#[rstest]
fn lookup_rewrites_matching_hosts_and_keeps_principal(runner: ScriptedRunner) {
    runner.push_stdout(address_response("203.0.113.10"));
    let filter = Filter::compile("(ec2-instance-id eu-west-1)").expect("compiles");
    let aws = AwsCli::new("aws", runner.clone());

    let result = filter.apply(targets(&["admin@i-deadbeef-extra", "db-1"]), &aws);

    assert_eq!(result, targets(&["admin@203.0.113.10", "db-1"]));
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1, "only hosts with an id are looked up");
    assert!(
        invocations[0]
            .command_string()
            .contains("--instance-ids i-deadbeef --region eu-west-1")
    );
}

#[rstest]
fn failed_lookup_keeps_host_and_continues(runner: ScriptedRunner) {
    runner.push_failure(255);
    runner.push_stdout(address_response("198.51.100.4"));
    let filter = Filter::compile("(ec2-instance-id us-east-1)").expect("compiles");

    let result = filter.apply(
        targets(&["i-deadbeef-a", "i-cafebabe-b"]),
        &AwsCli::new("aws", runner),
    );

    assert_eq!(result, targets(&["i-deadbeef-a", "198.51.100.4"]));
}

#[rstest]
fn list_applies_children_in_order(runner: ScriptedRunner) {
    runner.push_stdout(address_response("203.0.113.1"));
    let filter =
        Filter::compile("(list (id) (ec2-instance-id eu-central-1) (id))").expect("compiles");

    let result = filter.apply(targets(&["i-deadbeef"]), &AwsCli::new("aws", runner));

    assert_eq!(result, targets(&["203.0.113.1"]));
    assert_eq!(
        filter.to_string(),
        "<list <id> <ec2-instance-id eu-central-1> <id>>"
    );
}

#[rstest]
#[case::missing_region("(ec2-instance-id)", "ec2-instance-id")]
#[case::two_regions("(ec2-instance-id a b)", "ec2-instance-id")]
#[case::blank_region(r#"(ec2-instance-id "")"#, "ec2-instance-id")]
#[case::id_with_argument("(id x)", "id")]
#[case::list_with_literal("(list id)", "list")]
fn argument_mismatches_are_rejected(#[case] source: &str, #[case] node: &str) {
    let err = Filter::compile(source).expect_err("bad arguments");
    assert!(
        matches!(err, CompileError::Argument { node: ref got, .. } if got == node),
        "unexpected error: {err}"
    );
}

#[rstest]
fn unknown_filter_is_rejected() {
    let err = Filter::compile("(list (dedupe))").expect_err("unknown filter");
    assert_eq!(
        err,
        CompileError::UnknownNode {
            kind: "filter",
            name: String::from("dedupe"),
        }
    );
}

#[rstest]
fn executor_macros_are_not_filters() {
    assert!(Filter::compile("(ssh-login)").is_err());
    assert_eq!(Filter::names(), vec!["ec2-instance-id", "id", "list"]);
}

#[rstest]
fn instance_id_lookup_keeps_its_region() {
    let Filter::Ec2InstanceId(lookup) =
        Filter::compile("(ec2-instance-id eu-central-1)").expect("compiles")
    else {
        panic!("expected an instance id lookup");
    };
    assert_eq!(lookup.region(), "eu-central-1");
}
