//! Connection endpoints addressed by executors.
//!
//! A [`Target`] is an optional principal plus a host. The textual form is
//! `principal@host`, or the bare host when no principal is set. Targets are
//! plain values: discoverers create them, filters replace them and executors
//! render them into process arguments.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A remote endpoint: an optional login principal and a non-empty host.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Target {
    principal: Option<String>,
    host: String,
}

/// Errors raised while constructing or parsing a [`Target`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TargetError {
    /// Raised when the host component is empty.
    #[error("target host cannot be empty")]
    EmptyHost,
    /// Raised when the textual form contains more than one `@`.
    #[error("target {input:?} contains more than one '@'")]
    AmbiguousPrincipal {
        /// Offending input text.
        input: String,
    },
}

impl Target {
    /// Builds a target, treating an empty principal as absent.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::EmptyHost`] when `host` is empty.
    pub fn new(
        principal: Option<impl Into<String>>,
        host: impl Into<String>,
    ) -> Result<Self, TargetError> {
        let host = host.into();
        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }
        let principal = principal
            .map(Into::into)
            .filter(|value: &String| !value.is_empty());
        Ok(Self { principal, host })
    }

    /// Builds a target without a principal.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::EmptyHost`] when `host` is empty.
    pub fn host_only(host: impl Into<String>) -> Result<Self, TargetError> {
        Self::new(None::<String>, host)
    }

    /// Login principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns a copy of this target pointing at `host`, keeping the principal.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::EmptyHost`] when `host` is empty.
    pub fn with_host(&self, host: impl Into<String>) -> Result<Self, TargetError> {
        Self::new(self.principal.clone(), host)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.principal {
            Some(principal) => write!(f, "{principal}@{}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), None, None) => Self::host_only(host),
            (Some(principal), Some(host), None) => Self::new(Some(principal), host),
            _ => Err(TargetError::AmbiguousPrincipal {
                input: input.to_owned(),
            }),
        }
    }
}

/// Renders every target in order.
#[must_use]
pub fn render_all(targets: &[Target]) -> Vec<String> {
    targets.iter().map(ToString::to_string).collect()
}
