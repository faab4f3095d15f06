//! Filter nodes: transform the discovered target list before execution.
//!
//! Filters never fail at run time. Lookups that cannot be completed leave the
//! affected target untouched and are reported through the log.

use std::fmt;

use tracing::info;

use crate::aws::AwsCli;
use crate::compile::{self, ArgSchema, Args, Arity, CompileError, Entry, NodeKind, Slot};
use crate::rewrite::Rewriter;
use crate::runner::CommandRunner;
use crate::target::{Target, render_all};

mod ec2_instance_id;

pub use ec2_instance_id::{Ec2InstanceIdLookup, INSTANCE_ID_PATTERN};

static REGISTRY: &[Entry<Filter>] = &[
    Entry::new(
        "ec2-instance-id",
        ArgSchema::new(Arity::Exactly(1), Slot::Literal),
        make_ec2_instance_id,
    ),
    Entry::new("id", ArgSchema::NONE, make_id),
    Entry::new("list", ArgSchema::new(Arity::AtLeast(0), Slot::Node), make_list),
];

/// Filter node tree.
#[derive(Clone, Debug)]
pub enum Filter {
    /// Returns its input unchanged.
    Id,
    /// Applies children in order, feeding each the previous output.
    List(Vec<Filter>),
    /// Resolves EC2 instance ids to public addresses.
    Ec2InstanceId(Ec2InstanceIdLookup),
}

impl Filter {
    /// Compiles a filter expression.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when the expression is malformed or does not
    /// describe a valid filter tree.
    pub fn compile(source: &str) -> Result<Self, CompileError> {
        compile::compile(source)
    }

    /// Applies the filter, consuming and returning the target list.
    pub fn apply<R: CommandRunner>(&self, targets: Vec<Target>, aws: &AwsCli<R>) -> Vec<Target> {
        match self {
            Self::Id => targets,
            Self::List(children) => children.iter().fold(targets, |current, child| {
                let next = child.apply(current, aws);
                info!(filter = %child, targets = ?render_all(&next), "targets after filter");
                next
            }),
            Self::Ec2InstanceId(lookup) => lookup.apply(targets, aws),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("<id>"),
            Self::List(children) => {
                f.write_str("<list")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                f.write_str(">")
            }
            Self::Ec2InstanceId(lookup) => fmt::Display::fmt(lookup, f),
        }
    }
}

impl NodeKind for Filter {
    const KIND: &'static str = "filter";

    fn registry() -> &'static [Entry<Self>] {
        REGISTRY
    }

    fn rewriter() -> Rewriter {
        Rewriter::empty()
    }
}

fn make_id(_name: &'static str, _args: Args<Filter>) -> Result<Filter, CompileError> {
    Ok(Filter::Id)
}

fn make_list(name: &'static str, args: Args<Filter>) -> Result<Filter, CompileError> {
    args.into_nodes(name).map(Filter::List)
}

fn make_ec2_instance_id(name: &'static str, args: Args<Filter>) -> Result<Filter, CompileError> {
    let mut literals = args.into_literals(name)?.into_iter();
    let region = literals.next().unwrap_or_default();
    Ec2InstanceIdLookup::new(region).map(Filter::Ec2InstanceId)
}

#[cfg(test)]
mod tests;
