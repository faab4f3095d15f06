//! Configuration loading via `ortho-config`.
//!
//! [`FleetConfig`] holds the three pipeline expressions and the `aws` binary.
//! Values merge defaults, configuration files (`fleetssh.toml`,
//! `.fleetssh.toml` or the file named by `FLEETSSH_CONFIG_PATH`) and
//! `FLEETSSH_*` environment variables. Command-line flags are applied on top
//! by the binary.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::aws::DEFAULT_AWS_BIN;

/// Discoverer used when none is configured.
pub const DEFAULT_DISCOVERER: &str = "(comma-separated)";

/// Filter used when none is configured.
pub const DEFAULT_FILTER: &str = "(id)";

/// Executor used when none is configured: run the command over SSH when one
/// is given, otherwise log in to a single target or open a cluster session.
pub const DEFAULT_EXECUTOR: &str = "(if-command (ssh-exec) (if-one-target (ssh-login) (tmux-cssh)))";

/// Pipeline settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "FLEETSSH",
    discovery(
        app_name = "fleetssh",
        env_var = "FLEETSSH_CONFIG_PATH",
        config_file_name = "fleetssh.toml",
        dotfile_name = ".fleetssh.toml",
        project_file_name = "fleetssh.toml"
    )
)]
pub struct FleetConfig {
    /// Discoverer expression turning the query into targets.
    #[ortho_config(default = DEFAULT_DISCOVERER.to_owned())]
    pub discoverer: String,
    /// Filter expression applied to the discovered targets.
    #[ortho_config(default = DEFAULT_FILTER.to_owned())]
    pub filter: String,
    /// Executor expression deciding how the command is run.
    #[ortho_config(default = DEFAULT_EXECUTOR.to_owned())]
    pub executor: String,
    /// Path to the `aws` executable used by cloud lookups.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            discoverer: DEFAULT_DISCOVERER.to_owned(),
            filter: DEFAULT_FILTER.to_owned(),
            executor: DEFAULT_EXECUTOR.to_owned(),
            aws_bin: DEFAULT_AWS_BIN.to_owned(),
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl FleetConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to fleetssh.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("fleetssh")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Rejects blank values. Error messages name the environment variable
    /// and configuration key that supply each field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.discoverer,
            &FieldMetadata::new("discoverer expression", "FLEETSSH_DISCOVERER", "discoverer"),
        )?;
        Self::require_field(
            &self.filter,
            &FieldMetadata::new("filter expression", "FLEETSSH_FILTER", "filter"),
        )?;
        Self::require_field(
            &self.executor,
            &FieldMetadata::new("executor expression", "FLEETSSH_EXECUTOR", "executor"),
        )?;
        Self::require_field(
            &self.aws_bin,
            &FieldMetadata::new("aws CLI path", "FLEETSSH_AWS_BIN", "aws_bin"),
        )?;
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
