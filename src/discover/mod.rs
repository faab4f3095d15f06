//! Discoverer nodes: turn the user's query into the initial target list.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::aws::AwsCli;
use crate::compile::{self, ArgSchema, Args, Arity, CompileError, Entry, NodeKind, Slot};
use crate::rewrite::Rewriter;
use crate::runner::CommandRunner;
use crate::target::{Target, TargetError};

mod ec2_tag;

pub use ec2_tag::{Ec2TagSearch, TagClause, matches_all_tags, parse_query};

static REGISTRY: &[Entry<Discoverer>] = &[
    Entry::new(
        "aws-ec2-tag",
        ArgSchema::new(Arity::Exactly(1), Slot::Literal),
        make_aws_ec2_tag,
    ),
    Entry::new("comma-separated", ArgSchema::NONE, make_comma_separated),
    Entry::new(
        "first-matching",
        ArgSchema::new(Arity::AtLeast(1), Slot::Node),
        make_first_matching,
    ),
];

/// Errors raised while discovering targets.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DiscoverError {
    /// A query item is not a valid target.
    #[error(transparent)]
    Target(#[from] TargetError),
    /// A tag query clause lacks `=`.
    #[error("tag query clause {clause:?} must look like key=value")]
    MalformedQuery {
        /// Offending clause.
        clause: String,
    },
}

/// Discoverer node tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Discoverer {
    /// Treats the query as a comma-separated list of targets.
    CommaSeparated,
    /// Returns the first non-empty result among its children.
    FirstMatching(Vec<Discoverer>),
    /// Searches EC2 instances by tag.
    AwsEc2Tag(Ec2TagSearch),
}

impl Discoverer {
    /// Compiles a discoverer expression.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the expression does not describe a valid
    /// discoverer tree.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        compile::compile(source)
    }

    /// Produces the ordered target list for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoverError`] when the query itself is malformed. Provider
    /// failures are logged and produce an empty list instead.
    pub fn discover<R: CommandRunner>(
        &self,
        query: &str,
        aws: &AwsCli<R>,
    ) -> Result<Vec<Target>, DiscoverError> {
        match self {
            Self::CommaSeparated => query
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| item.parse::<Target>().map_err(DiscoverError::from))
                .collect(),
            Self::FirstMatching(children) => {
                for child in children {
                    let found = child.discover(query, aws)?;
                    if !found.is_empty() {
                        debug!(discoverer = %child, found = found.len(), "first match");
                        return Ok(found);
                    }
                    debug!(discoverer = %child, "no targets, trying next");
                }
                Ok(Vec::new())
            }
            Self::AwsEc2Tag(search) => search.search(query, aws),
        }
    }
}

impl fmt::Display for Discoverer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommaSeparated => f.write_str("<comma-separated>"),
            Self::FirstMatching(children) => {
                f.write_str("<first-matching")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                f.write_str(">")
            }
            Self::AwsEc2Tag(search) => fmt::Display::fmt(search, f),
        }
    }
}

impl NodeKind for Discoverer {
    const KIND: &'static str = "discoverer";

    fn registry() -> &'static [Entry<Self>] {
        REGISTRY
    }

    fn rewriter() -> Rewriter {
        Rewriter::empty()
    }
}

fn make_comma_separated(
    _name: &'static str,
    _args: Args<Discoverer>,
) -> Result<Discoverer, CompileError> {
    Ok(Discoverer::CommaSeparated)
}

fn make_first_matching(
    name: &'static str,
    args: Args<Discoverer>,
) -> Result<Discoverer, CompileError> {
    args.into_nodes(name).map(Discoverer::FirstMatching)
}

fn make_aws_ec2_tag(name: &'static str, args: Args<Discoverer>) -> Result<Discoverer, CompileError> {
    let region = args.into_literals(name)?.into_iter().next().unwrap_or_default();
    Ec2TagSearch::new(region).map(Discoverer::AwsEc2Tag)
}
