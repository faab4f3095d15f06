//! Tests for layered configuration loading and validation.

use fleetssh::config::{DEFAULT_DISCOVERER, DEFAULT_EXECUTOR, DEFAULT_FILTER};
use fleetssh::test_support::EnvGuard;
use fleetssh::{ConfigError, FleetConfig};
use rstest::rstest;
use tempfile::TempDir;

#[rstest]
#[tokio::test]
async fn defaults_apply_without_sources() {
    let _guard = EnvGuard::remove_vars(&[
        "FLEETSSH_DISCOVERER",
        "FLEETSSH_FILTER",
        "FLEETSSH_EXECUTOR",
        "FLEETSSH_AWS_BIN",
        "FLEETSSH_CONFIG_PATH",
    ])
    .await;

    let config = FleetConfig::load_without_cli_args().expect("defaults load");

    assert_eq!(config.discoverer, DEFAULT_DISCOVERER);
    assert_eq!(config.filter, DEFAULT_FILTER);
    assert_eq!(config.executor, DEFAULT_EXECUTOR);
    assert_eq!(config.aws_bin, "aws");
}

#[rstest]
#[tokio::test]
async fn environment_overrides_defaults() {
    let _guard = EnvGuard::set_vars(&[
        ("FLEETSSH_EXECUTOR", "(ssh-exec-parallel)"),
        ("FLEETSSH_AWS_BIN", "/opt/aws/bin/aws"),
    ])
    .await;

    let config = FleetConfig::load_without_cli_args().expect("environment loads");

    assert_eq!(config.executor, "(ssh-exec-parallel)");
    assert_eq!(config.aws_bin, "/opt/aws/bin/aws");
    assert_eq!(config.filter, DEFAULT_FILTER);
}

#[rstest]
#[tokio::test]
async fn explicit_config_file_is_read() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("fleetssh.toml");
    std::fs::write(
        &path,
        "filter = \"(list (ec2-instance-id eu-west-1))\"\nexecutor = \"(csshx)\"\n",
    )
    .expect("config written");
    let path_text = path.to_str().expect("utf8 temp path");
    let _guard = EnvGuard::set_vars(&[("FLEETSSH_CONFIG_PATH", path_text)]).await;

    let config = FleetConfig::load_without_cli_args().expect("file loads");

    assert_eq!(config.filter, "(list (ec2-instance-id eu-west-1))");
    assert_eq!(config.executor, "(csshx)");
    assert_eq!(config.discoverer, DEFAULT_DISCOVERER);
}

#[rstest]
#[case::discoverer(FleetConfig { discoverer: String::new(), ..FleetConfig::default() }, "FLEETSSH_DISCOVERER")]
#[case::filter(FleetConfig { filter: String::from("  "), ..FleetConfig::default() }, "FLEETSSH_FILTER")]
#[case::executor(FleetConfig { executor: String::new(), ..FleetConfig::default() }, "FLEETSSH_EXECUTOR")]
#[case::aws_bin(FleetConfig { aws_bin: String::from("\t"), ..FleetConfig::default() }, "FLEETSSH_AWS_BIN")]
fn blank_fields_produce_actionable_errors(#[case] config: FleetConfig, #[case] env_var: &str) {
    let error = config.validate().expect_err("blank value rejected");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(message.contains(env_var), "error should mention {env_var}: {message}");
    assert!(
        message.contains("fleetssh.toml"),
        "error should mention the config file: {message}"
    );
}

#[rstest]
fn default_configuration_is_valid() {
    assert!(FleetConfig::default().validate().is_ok());
}
