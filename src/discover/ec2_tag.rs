//! EC2 tag search discoverer.
//!
//! Queries look like `env=prod:role=db`. A query without `=` is a shorthand
//! for `Name=<query>`. The API request filters on tag keys and tag values
//! independently, so results are narrowed afterwards by
//! [`matches_all_tags`].

use std::ffi::OsString;
use std::fmt;

use tracing::{debug, info, warn};

use super::DiscoverError;
use crate::aws::{AwsCli, Instance, Tag};
use crate::compile::CompileError;
use crate::runner::CommandRunner;
use crate::target::Target;

/// One `key=value` requirement from a query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagClause {
    /// Tag key that must be present.
    pub key: String,
    /// Value the tag must carry.
    pub value: String,
}

/// Splits a tag query into clauses.
///
/// # Errors
///
/// Returns [`DiscoverError::MalformedQuery`] when a clause of a multi-clause
/// query lacks `=`.
pub fn parse_query(query: &str) -> Result<Vec<TagClause>, DiscoverError> {
    if !query.contains('=') {
        return Ok(vec![TagClause {
            key: String::from("Name"),
            value: query.to_owned(),
        }]);
    }
    query
        .split(':')
        .map(|clause| {
            clause
                .split_once('=')
                .map(|(key, value)| TagClause {
                    key: key.to_owned(),
                    value: value.to_owned(),
                })
                .ok_or_else(|| DiscoverError::MalformedQuery {
                    clause: clause.to_owned(),
                })
        })
        .collect()
}

/// Returns `true` when `tags` carries every clause's key with exactly that
/// value. Extra tags are ignored.
#[must_use]
pub fn matches_all_tags(tags: &[Tag], clauses: &[TagClause]) -> bool {
    clauses.iter().all(|clause| {
        tags.iter()
            .any(|tag| tag.key == clause.key && tag.value == clause.value)
    })
}

/// Tag search in one region.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ec2TagSearch {
    region: String,
}

impl Ec2TagSearch {
    /// Creates a search scoped to `region`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Argument`] when `region` is blank.
    pub fn new(region: impl Into<String>) -> Result<Self, CompileError> {
        let region = region.into();
        if region.trim().is_empty() {
            return Err(CompileError::Argument {
                node: String::from("aws-ec2-tag"),
                expected: String::from("a non-empty region name"),
            });
        }
        Ok(Self { region })
    }

    /// Region searched.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Arguments passed to `describe-instances` for `clauses`.
    #[must_use]
    pub fn request_args(&self, clauses: &[TagClause]) -> Vec<OsString> {
        let keys: Vec<&str> = clauses.iter().map(|clause| clause.key.as_str()).collect();
        let values: Vec<&str> = clauses.iter().map(|clause| clause.value.as_str()).collect();
        vec![
            OsString::from("--region"),
            OsString::from(&self.region),
            OsString::from("--filters"),
            OsString::from(format!("Name=tag-key,Values={}", keys.join(","))),
            OsString::from(format!("Name=tag-value,Values={}", values.join(","))),
        ]
    }

    /// Finds instances matching `query`.
    ///
    /// An API failure is logged and yields no targets.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoverError::MalformedQuery`] for an unparsable query.
    pub fn search<R: CommandRunner>(
        &self,
        query: &str,
        aws: &AwsCli<R>,
    ) -> Result<Vec<Target>, DiscoverError> {
        let clauses = parse_query(query)?;
        let response = match aws.describe_instances(&self.request_args(&clauses)) {
            Ok(response) => response,
            Err(err) => {
                warn!(region = %self.region, query, error = %err, "EC2 tag search failed");
                return Ok(Vec::new());
            }
        };

        let targets: Vec<Target> = response
            .instances()
            .filter(|instance| matches_all_tags(&instance.tags, &clauses))
            .filter_map(to_target)
            .collect();
        info!(region = %self.region, query, found = targets.len(), "EC2 tag search finished");
        Ok(targets)
    }
}

fn to_target(instance: &Instance) -> Option<Target> {
    let host = instance
        .public_ip_address
        .clone()
        .unwrap_or_else(|| instance.instance_id.clone());
    match Target::host_only(host) {
        Ok(target) => Some(target),
        Err(err) => {
            debug!(error = %err, "skipping instance without id or address");
            None
        }
    }
}

impl fmt::Display for Ec2TagSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<aws-ec2-tag {}>", self.region)
    }
}
