//! Error types for ReplyGuard

use serde::Serialize;
use std::fmt;

/// Result type alias using ReplyGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ReplyGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input failed validation before any rule was applied
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The validation violations carried by this error, if any
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation(err) => err.violations(),
            _ => &[],
        }
    }
}

/// A single offending field found during validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Location of the field, e.g. `rules[2].params.phrases[1]`
    pub location: String,

    /// What is wrong with it
    pub message: String,
}

impl FieldViolation {
    /// Create a new violation
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Aggregated validation failure.
///
/// Always carries at least one violation, and lists every violation the
/// validator found rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Build an error from collected violations.
    ///
    /// Returns `None` when there is nothing to report.
    pub fn from_violations(violations: Vec<FieldViolation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// Build an error holding a single violation
    pub fn single(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(location, message)],
        }
    }

    /// All violations, in the order they were found
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Whether any violation is reported at `location`
    pub fn has_location(&self, location: &str) -> bool {
        self.violations.iter().any(|v| v.location == location)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.violations.len();
        write!(
            f,
            "{} validation error{}",
            count,
            if count == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_violations_is_not_an_error() {
        assert!(ValidationError::from_violations(Vec::new()).is_none());
    }

    #[test]
    fn test_display_lists_every_violation() {
        let err = ValidationError::from_violations(vec![
            FieldViolation::new("user_state.jurisdiction", "field required"),
            FieldViolation::new("rules[0].type", "unknown rule type 'NOPE'"),
        ])
        .unwrap();

        let rendered = err.to_string();
        assert!(rendered.starts_with("2 validation errors"));
        assert!(rendered.contains("user_state.jurisdiction: field required"));
        assert!(rendered.contains("rules[0].type: unknown rule type 'NOPE'"));
    }

    #[test]
    fn test_error_exposes_violations() {
        let err: Error = ValidationError::single("draft_reply", "expected a string").into();
        assert_eq!(err.violations().len(), 1);
        assert!(Error::config("missing").violations().is_empty());
    }
}
