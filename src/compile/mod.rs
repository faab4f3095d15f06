//! Builds node trees from expression text.
//!
//! Each node kind (executors, filters, discoverers) is a closed enum that
//! implements [`NodeKind`]: it exposes an ordered macro table and a registry
//! of [`Entry`] values mapping a head symbol to an argument schema and a
//! constructor. [`compile`] expands macros over the whole text, parses it and
//! hands the root form to [`build`], which validates every node's arguments
//! against its [`ArgSchema`] before constructing it. Nested forms are built
//! recursively as the same kind, so the kinds never mix within one tree.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::expr::{self, Form, ParseError};
use crate::rewrite::{MAX_REWRITE_PASSES, RewriteError, Rewriter};

/// Errors raised while turning configuration text into a node tree.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CompileError {
    /// The expression text is not well formed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The macro table did not converge.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
    /// The head symbol names neither a macro nor a registered node.
    #[error("{kind} \"{name}\" is not known")]
    UnknownNode {
        /// Node kind being built.
        kind: &'static str,
        /// Head symbol found in the form.
        name: String,
    },
    /// A node received arguments of the wrong arity or shape.
    #[error("{node} expects {expected}")]
    Argument {
        /// Name of the node being built.
        node: String,
        /// Human-readable description of the expected arguments.
        expected: String,
    },
    /// A bare atom appeared where a node form was required.
    #[error("expected a parenthesised {kind} form, found {form}")]
    NotAList {
        /// Node kind being built.
        kind: &'static str,
        /// Rendering of the offending form.
        form: String,
    },
    /// The form `()` appeared where a node was required.
    #[error("empty form cannot be built as a {kind}")]
    EmptyForm {
        /// Node kind being built.
        kind: &'static str,
    },
    /// The first element of a form is itself a list.
    #[error("{kind} form {form} must start with a name")]
    HeadNotSymbol {
        /// Node kind being built.
        kind: &'static str,
        /// Rendering of the offending form.
        form: String,
    },
    /// A node could not be initialised for a reason other than its input.
    #[error("internal error: {0}")]
    Internal(String),
}

/// How many arguments a node accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    /// Exactly this many arguments.
    Exactly(usize),
    /// This many arguments or more.
    AtLeast(usize),
}

impl Arity {
    const fn admits(self, count: usize) -> bool {
        match self {
            Self::Exactly(expected) => count == expected,
            Self::AtLeast(minimum) => count >= minimum,
        }
    }
}

/// What every argument slot of a node holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Slot {
    /// Atoms taken as literal strings.
    Literal,
    /// Nested forms built as nodes of the same kind.
    Node,
}

/// Argument schema of one node variant.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArgSchema {
    /// Accepted argument count.
    pub arity: Arity,
    /// Shape of every argument.
    pub slot: Slot,
}

impl ArgSchema {
    /// A node taking no arguments.
    pub const NONE: Self = Self::new(Arity::Exactly(0), Slot::Literal);

    /// Creates a schema.
    #[must_use]
    pub const fn new(arity: Arity, slot: Slot) -> Self {
        Self { arity, slot }
    }

    fn resolve<N: NodeKind>(
        self,
        node: &str,
        raw: Vec<Form>,
        rewriter: &Rewriter,
    ) -> Result<Args<N>, CompileError> {
        if !self.arity.admits(raw.len()) {
            return Err(self.mismatch(node));
        }
        match self.slot {
            Slot::Literal => raw
                .into_iter()
                .map(|form| match form {
                    Form::Atom(value) => Ok(value),
                    Form::List(_) => Err(self.mismatch(node)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Args::Literals),
            Slot::Node => raw
                .into_iter()
                .map(|form| match form {
                    Form::List(_) => build::<N>(form, rewriter),
                    Form::Atom(_) => Err(self.mismatch(node)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Args::Nodes),
        }
    }

    fn mismatch(self, node: &str) -> CompileError {
        CompileError::Argument {
            node: node.to_owned(),
            expected: self.to_string(),
        }
    }
}

impl fmt::Display for ArgSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (qualifier, count) = match self.arity {
            Arity::Exactly(0) => return f.write_str("no arguments"),
            Arity::Exactly(count) => ("exactly", count),
            Arity::AtLeast(count) => ("at least", count),
        };
        let noun = match (self.slot, count) {
            (Slot::Literal, 1) => "literal argument",
            (Slot::Literal, _) => "literal arguments",
            (Slot::Node, 1) => "nested form",
            (Slot::Node, _) => "nested forms",
        };
        write!(f, "{qualifier} {count} {noun}")
    }
}

/// Arguments after schema validation.
#[derive(Debug)]
pub enum Args<N> {
    /// Atoms of a [`Slot::Literal`] schema.
    Literals(Vec<String>),
    /// Built children of a [`Slot::Node`] schema.
    Nodes(Vec<N>),
}

impl<N> Args<N> {
    /// Returns the literal arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Internal`] when the schema produced nodes.
    pub fn into_literals(self, node: &str) -> Result<Vec<String>, CompileError> {
        match self {
            Self::Literals(values) => Ok(values),
            Self::Nodes(_) => Err(CompileError::Internal(format!(
                "{node} registered with a node schema but reads literals"
            ))),
        }
    }

    /// Returns the built child nodes.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Internal`] when the schema produced literals.
    pub fn into_nodes(self, node: &str) -> Result<Vec<N>, CompileError> {
        match self {
            Self::Nodes(nodes) => Ok(nodes),
            Self::Literals(_) => Err(CompileError::Internal(format!(
                "{node} registered with a literal schema but reads nodes"
            ))),
        }
    }

    /// Returns the single child node.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Internal`] when the schema does not yield
    /// exactly one node.
    pub fn into_single(self, node: &str) -> Result<N, CompileError> {
        let mut nodes = self.into_nodes(node)?.into_iter();
        match (nodes.next(), nodes.next()) {
            (Some(only), None) => Ok(only),
            _ => Err(CompileError::Internal(format!(
                "{node} schema does not yield exactly one node"
            ))),
        }
    }

    /// Returns exactly two child nodes in order.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Internal`] when the schema does not yield
    /// exactly two nodes.
    pub fn into_pair(self, node: &str) -> Result<(N, N), CompileError> {
        let mut nodes = self.into_nodes(node)?.into_iter();
        match (nodes.next(), nodes.next(), nodes.next()) {
            (Some(first), Some(second), None) => Ok((first, second)),
            _ => Err(CompileError::Internal(format!(
                "{node} schema does not yield exactly two nodes"
            ))),
        }
    }
}

/// Constructor signature stored in a registry entry.
pub type Make<N> = fn(&'static str, Args<N>) -> Result<N, CompileError>;

/// One registered primitive node.
pub struct Entry<N: 'static> {
    /// Head symbol selecting this node.
    pub name: &'static str,
    /// Arguments the node accepts.
    pub schema: ArgSchema,
    /// Builds the node from validated arguments.
    pub make: Make<N>,
}

impl<N: 'static> Entry<N> {
    /// Creates a registry entry.
    #[must_use]
    pub const fn new(name: &'static str, schema: ArgSchema, make: Make<N>) -> Self {
        Self { name, schema, make }
    }
}

/// A closed family of nodes buildable from expressions.
pub trait NodeKind: Sized + fmt::Display + 'static {
    /// Kind name used in diagnostics (for example `executor`).
    const KIND: &'static str;

    /// Primitive nodes of this kind.
    fn registry() -> &'static [Entry<Self>];

    /// Macro table applied before construction.
    fn rewriter() -> Rewriter;

    /// Every usable head symbol, macros and primitives, sorted.
    #[must_use]
    fn names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Self::rewriter()
            .names()
            .chain(Self::registry().iter().map(|entry| entry.name))
            .collect();
        names.sort_unstable();
        names
    }
}

/// Expands macros in `source`, parses it and builds the root node.
///
/// # Errors
///
/// Returns [`CompileError`] for parse failures, unknown names, argument shape
/// mismatches or a non-converging macro table.
pub fn compile<N: NodeKind>(source: &str) -> Result<N, CompileError> {
    let rewriter = N::rewriter();
    let expanded = rewriter.rewrite(source)?;
    debug!(kind = N::KIND, source, expanded = %expanded, "expanded macros");
    let node = build::<N>(expr::parse(&expanded)?, &rewriter)?;
    debug!(kind = N::KIND, node = %node, "built node tree");
    Ok(node)
}

/// Builds one node from a parsed form, consuming it.
///
/// A head naming a macro is expanded from its bare call `(<name>)` and the
/// call-site arguments are appended to the expansion before building it.
/// Chains of such expansions stop after [`MAX_REWRITE_PASSES`].
///
/// # Errors
///
/// Returns [`CompileError`] when the form is not a non-empty list headed by a
/// name, the name is unknown, or the arguments violate the node's schema.
pub fn build<N: NodeKind>(form: Form, rewriter: &Rewriter) -> Result<N, CompileError> {
    build_expanding(form, rewriter, 0)
}

fn build_expanding<N: NodeKind>(
    form: Form,
    rewriter: &Rewriter,
    head_expansions: usize,
) -> Result<N, CompileError> {
    let Form::List(items) = form else {
        return Err(CompileError::NotAList {
            kind: N::KIND,
            form: form.to_string(),
        });
    };
    let mut items = items.into_iter();
    let Some(head) = items.next() else {
        return Err(CompileError::EmptyForm { kind: N::KIND });
    };
    let Form::Atom(name) = head else {
        let mut whole = vec![head];
        whole.extend(items);
        return Err(CompileError::HeadNotSymbol {
            kind: N::KIND,
            form: Form::List(whole).to_string(),
        });
    };
    let args: Vec<Form> = items.collect();

    if let Some(expansion) = rewriter.expand_head(&name)? {
        let Form::List(mut expanded) = expr::parse(&expansion)? else {
            return Err(CompileError::NotAList {
                kind: N::KIND,
                form: expansion,
            });
        };
        if head_expansions >= MAX_REWRITE_PASSES {
            return Err(CompileError::Rewrite(RewriteError::DidNotConverge {
                passes: MAX_REWRITE_PASSES,
            }));
        }
        expanded.extend(args);
        return build_expanding::<N>(Form::List(expanded), rewriter, head_expansions + 1);
    }

    let entry = N::registry()
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| CompileError::UnknownNode {
            kind: N::KIND,
            name: name.clone(),
        })?;
    let resolved = entry.schema.resolve::<N>(entry.name, args, rewriter)?;
    (entry.make)(entry.name, resolved)
}

#[cfg(test)]
mod tests;
