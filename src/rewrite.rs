//! Literal macro expansion for pipeline expressions.
//!
//! A [`Rewriter`] holds an ordered table of [`RewriteRule`]s. Each pass walks
//! the table in order and, for every rule whose pattern occurs in the text,
//! replaces all occurrences at once. Passes repeat until one makes no
//! replacement at all.
//!
//! Matching is plain substring search over the whole expression, not over
//! parsed forms. A pattern therefore also matches inside a quoted literal
//! argument that happens to contain the same text, e.g. the atom
//! `"(csshx)"` passed to `external`. Rule tables must be written so that
//! rewriting converges; a table containing a cycle such as `A -> B` and
//! `B -> A` is caught by the pass cap and reported as
//! [`RewriteError::DidNotConverge`].

use thiserror::Error;
use tracing::trace;

/// Maximum number of full passes before rewriting is abandoned.
pub const MAX_REWRITE_PASSES: usize = 64;

/// Literal `pattern -> replacement` substitution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RewriteRule {
    /// Text searched for, usually a parenthesised macro call such as
    /// `(ssh-login)`.
    pub pattern: &'static str,
    /// Text substituted for every occurrence of `pattern`.
    pub replacement: &'static str,
}

impl RewriteRule {
    /// Creates a rule.
    #[must_use]
    pub const fn new(pattern: &'static str, replacement: &'static str) -> Self {
        Self {
            pattern,
            replacement,
        }
    }

    /// Name under which the macro may appear in head position: the pattern
    /// without its surrounding parentheses.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.pattern
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(self.pattern)
    }
}

/// Raised when the rule table is defective.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RewriteError {
    /// The table kept producing replacements after the pass cap.
    #[error("macro expansion did not converge after {passes} passes; the rule table has a cycle")]
    DidNotConverge {
        /// Number of passes performed.
        passes: usize,
    },
}

/// Applies an ordered rule table until it reaches a fixpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rewriter {
    rules: &'static [RewriteRule],
}

impl Rewriter {
    /// Wraps an ordered rule table. Earlier rules run first within a pass.
    #[must_use]
    pub const fn new(rules: &'static [RewriteRule]) -> Self {
        Self { rules }
    }

    /// A rewriter with no rules; every input is already a fixpoint.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: &[] }
    }

    /// The rule table in application order.
    #[must_use]
    pub const fn rules(&self) -> &'static [RewriteRule] {
        self.rules
    }

    /// Names usable in head position, in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(RewriteRule::name)
    }

    /// Returns `true` when `name` is the head-position name of a rule.
    #[must_use]
    pub fn is_macro(&self, name: &str) -> bool {
        self.names().any(|candidate| candidate == name)
    }

    /// Rewrites `text` until no rule matches.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::DidNotConverge`] when replacements are still
    /// happening after [`MAX_REWRITE_PASSES`] passes.
    pub fn rewrite(&self, text: &str) -> Result<String, RewriteError> {
        let mut current = text.to_owned();
        for pass in 1..=MAX_REWRITE_PASSES {
            let mut changed = false;
            for rule in self.rules {
                if current.contains(rule.pattern) {
                    trace!(pass, pattern = rule.pattern, "applying macro");
                    current = current.replace(rule.pattern, rule.replacement);
                    changed = true;
                }
            }
            if !changed {
                return Ok(current);
            }
        }
        Err(RewriteError::DidNotConverge {
            passes: MAX_REWRITE_PASSES,
        })
    }

    /// Expands the bare call `(<name>)` of a head-position macro.
    ///
    /// Returns `Ok(None)` when `name` is not a macro.
    ///
    /// # Errors
    ///
    /// Propagates [`RewriteError`] from [`Rewriter::rewrite`].
    pub fn expand_head(&self, name: &str) -> Result<Option<String>, RewriteError> {
        if !self.is_macro(name) {
            return Ok(None);
        }
        self.rewrite(&format!("({name})")).map(Some)
    }
}
