//! Error types for configuration loading and decoding.
//!
//! Failures come in two tiers. Structural problems (no sources, a path that
//! cannot be tokenized, no decoder for a requested type) are [`ConfigError`]
//! values raised immediately. Decode problems are [`ValidationError`] values
//! with a [`Severity`]; they accumulate on a [`crate::ConfigResult`] across an
//! entire decode tree and only the outermost call decides, through an
//! [`ErrorPolicy`], whether they escalate to a hard failure.

use std::fmt;
use thiserror::Error;

/// Errors raised immediately by loading, navigation, and decoder dispatch.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration sources were registered.
    #[error("no configuration sources registered")]
    NoSources,
    /// Reads were attempted before `load()` published a tree.
    #[error("configuration has not been loaded; call load() first")]
    NotLoaded,
    /// A raw path string could not be tokenized.
    #[error("invalid config path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    /// No registered decoder claimed the requested type.
    #[error("no decoder for type {type_name} at '{path}'")]
    NoDecoder { path: String, type_name: String },
    /// A reload named a source that was never registered.
    #[error("unknown config source '{0}'")]
    UnknownSource(String),
    /// A required lookup produced no usable value.
    #[error("missing config value at '{path}': {details}")]
    MissingValue { path: String, details: String },
    /// A lookup finished with errors the caller's policy escalates.
    #[error("failed to resolve '{path}':\n{}", format_errors(.errors))]
    ResultsFailed {
        path: String,
        errors: Vec<ValidationError>,
    },
    /// A collaborator required at construction time was missing or invalid.
    #[error("invalid construction: {0}")]
    Construction(String),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!(" - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// How strongly a decode problem counts against the result.
///
/// Ordered from most to least severe; an [`ErrorPolicy`] decides per call
/// which levels escalate to a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// A value was present but unusable (parse failure, wrong node kind).
    Error,
    /// Suspicious but recoverable.
    Warn,
    /// A required value was absent.
    MissingValue,
    /// An optional value (declared default) was absent.
    MissingOptionalValue,
    /// Informational only.
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::MissingValue => "MISSING_VALUE",
            Severity::MissingOptionalValue => "MISSING_OPTIONAL_VALUE",
            Severity::Debug => "DEBUG",
        };
        f.write_str(label)
    }
}

/// A single decode problem, attached to a result rather than thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationError {
    /// Dotted path of the node the problem was observed at.
    pub path: String,
    /// How strongly this problem counts against the result.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Build an error at an explicit severity.
    pub fn new(path: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity,
            message: message.into(),
        }
    }

    /// A value was present but could not be decoded.
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, Severity::Error, message)
    }

    /// A required value was absent.
    pub fn missing(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, Severity::MissingValue, message)
    }

    /// An optional value was absent; its default applies.
    pub fn missing_optional(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, Severity::MissingOptionalValue, message)
    }

    /// A declared array slot had no value supplied.
    pub fn missing_array_index(path: impl Into<String>, index: usize) -> Self {
        let path = path.into();
        Self {
            message: format!("missing array index {index} at '{path}'"),
            path,
            severity: Severity::MissingValue,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (at '{}')", self.severity, self.message, self.path)
    }
}

/// Per-call mapping from [`Severity`] to "tolerate" or "escalate".
///
/// The policy is consulted only at the outermost call of a decode tree;
/// inner recursion always accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Escalate `Warn`-level problems.
    pub escalate_warnings: bool,
    /// Escalate `MissingValue`-level problems.
    pub escalate_missing_values: bool,
    /// Escalate `MissingOptionalValue`-level problems.
    pub escalate_missing_optional_values: bool,
    /// Escalate `Error`-level problems. Disabled only by the lenient
    /// policy used for optional lookups.
    pub escalate_errors: bool,
}

impl ErrorPolicy {
    /// Errors and missing required values escalate; warnings do not.
    pub fn standard() -> Self {
        Self {
            escalate_warnings: false,
            escalate_missing_values: true,
            escalate_missing_optional_values: false,
            escalate_errors: true,
        }
    }

    /// Everything except debug notes escalates.
    pub fn strict() -> Self {
        Self {
            escalate_warnings: true,
            escalate_missing_values: true,
            escalate_missing_optional_values: true,
            escalate_errors: true,
        }
    }

    /// Nothing escalates; absent values simply come back absent.
    pub fn lenient() -> Self {
        Self {
            escalate_warnings: false,
            escalate_missing_values: false,
            escalate_missing_optional_values: false,
            escalate_errors: false,
        }
    }

    /// Whether a problem at `severity` turns the call into a hard failure.
    pub fn escalates(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error => self.escalate_errors,
            Severity::Warn => self.escalate_warnings,
            Severity::MissingValue => self.escalate_missing_values,
            Severity::MissingOptionalValue => self.escalate_missing_optional_values,
            Severity::Debug => false,
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn severity_orders_by_strength() {
        assert!(Severity::Error < Severity::Warn);
        assert!(Severity::Warn < Severity::MissingValue);
        assert!(Severity::MissingValue < Severity::MissingOptionalValue);
        assert!(Severity::MissingOptionalValue < Severity::Debug);
    }

    #[test]
    fn results_failed_lists_every_error() {
        let err = ConfigError::ResultsFailed {
            path: "db.port".to_string(),
            errors: vec![
                ValidationError::decode("db.port", "unable to parse 'abc' as u32"),
                ValidationError::missing("db.host", "no configuration found"),
            ],
        };
        let rendered = format!("{err}");
        assert!(rendered.contains("ERROR: unable to parse 'abc' as u32 (at 'db.port')"));
        assert!(rendered.contains("MISSING_VALUE: no configuration found (at 'db.host')"));
        assert_eq!(rendered.lines().count(), 3);
    }

    #[test]
    fn policies_escalate_as_documented() {
        assert!(ErrorPolicy::standard().escalates(Severity::Error));
        assert!(ErrorPolicy::standard().escalates(Severity::MissingValue));
        assert!(!ErrorPolicy::standard().escalates(Severity::Warn));
        assert!(ErrorPolicy::strict().escalates(Severity::MissingOptionalValue));
        assert!(!ErrorPolicy::lenient().escalates(Severity::Error));
        assert!(!ErrorPolicy::strict().escalates(Severity::Debug));
    }
}
