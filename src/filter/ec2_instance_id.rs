//! Rewrites hosts containing an EC2 instance id to the instance's public
//! address.

use std::fmt;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::aws::AwsCli;
use crate::compile::CompileError;
use crate::runner::CommandRunner;
use crate::target::Target;

/// Matches both the 8- and the 17-hex-digit instance id forms.
pub const INSTANCE_ID_PATTERN: &str = r"i-[0-9a-f]{8}(?:[0-9a-f]{9})?";

/// Per-target instance id lookup in one region.
#[derive(Clone, Debug)]
pub struct Ec2InstanceIdLookup {
    region: String,
    id_pattern: Regex,
}

impl Ec2InstanceIdLookup {
    /// Creates a lookup for `region`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Argument`] when `region` is blank.
    pub fn new(region: impl Into<String>) -> Result<Self, CompileError> {
        let region = region.into();
        if region.trim().is_empty() {
            return Err(CompileError::Argument {
                node: String::from("ec2-instance-id"),
                expected: String::from("a non-empty region name"),
            });
        }
        let id_pattern =
            Regex::new(INSTANCE_ID_PATTERN).map_err(|err| CompileError::Internal(err.to_string()))?;
        Ok(Self { region, id_pattern })
    }

    /// Region queried by the lookup.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// First instance id embedded in `host`, if any.
    #[must_use]
    pub fn instance_id<'h>(&self, host: &'h str) -> Option<&'h str> {
        self.id_pattern.find(host).map(|found| found.as_str())
    }

    /// Resolves every target carrying an instance id, in order.
    ///
    /// Targets without an id, or whose lookup fails, are returned unchanged.
    pub fn apply<R: CommandRunner>(&self, targets: Vec<Target>, aws: &AwsCli<R>) -> Vec<Target> {
        targets
            .into_iter()
            .map(|target| self.resolve_one(target, aws))
            .collect()
    }

    fn resolve_one<R: CommandRunner>(&self, target: Target, aws: &AwsCli<R>) -> Target {
        let Some(id) = self.instance_id(target.host()) else {
            debug!(target = %target, region = %self.region, "no EC2 instance id, skipping lookup");
            return target;
        };
        let Some(address) = aws.resolve(id, &self.region) else {
            info!(target = %target, instance = id, "keeping original host");
            return target;
        };
        match target.with_host(address) {
            Ok(resolved) => {
                info!(from = %target, to = %resolved, "resolved EC2 instance");
                resolved
            }
            Err(err) => {
                warn!(target = %target, error = %err, "EC2 lookup returned an unusable address");
                target
            }
        }
    }
}

impl fmt::Display for Ec2InstanceIdLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ec2-instance-id {}>", self.region)
    }
}
