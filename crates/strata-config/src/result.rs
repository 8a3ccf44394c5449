//! Value-plus-errors carrier threaded through every decode call.

use crate::error::{Severity, ValidationError};
use std::any::Any;
use std::sync::Arc;

/// Type-erased decoded value as it travels the decoder registry.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Outcome of a decode step: a best-effort value plus every problem
/// observed while producing it.
///
/// A result never holds neither a value nor errors; it may legitimately
/// hold both (partial success). Errors never abort a decode tree by
/// themselves — composites concatenate child errors and keep going.
#[derive(Debug, Clone)]
pub struct ConfigResult<T> {
    /// The decoded value, when one could be produced.
    pub value: Option<T>,
    /// Every problem observed while producing the value.
    pub errors: Vec<ValidationError>,
}

impl<T> ConfigResult<T> {
    /// A clean success.
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    /// A valueless result carrying one error.
    pub fn err(error: ValidationError) -> Self {
        Self {
            value: None,
            errors: vec![error],
        }
    }

    /// A valueless result carrying several errors.
    pub fn errs(errors: Vec<ValidationError>) -> Self {
        debug_assert!(!errors.is_empty(), "a valueless result must carry errors");
        Self {
            value: None,
            errors,
        }
    }

    /// A partial success: a usable value plus the problems found on the way.
    pub fn both(value: T, errors: Vec<ValidationError>) -> Self {
        Self {
            value: Some(value),
            errors,
        }
    }

    /// Whether a value was produced.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Whether any accumulated error is at least as severe as `level`.
    pub fn has_errors_at(&self, level: Severity) -> bool {
        self.errors.iter().any(|e| e.severity <= level)
    }

    /// Append further errors without touching the value.
    pub fn push_errors(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    /// Transform the value, carrying the errors across.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ConfigResult<U> {
        ConfigResult {
            value: self.value.map(f),
            errors: self.errors,
        }
    }

    /// Transform the value with a fallible function; a conversion failure
    /// replaces the value with an ERROR at `path`.
    pub fn and_then<U>(
        self,
        path: &str,
        f: impl FnOnce(T) -> Result<U, String>,
    ) -> ConfigResult<U> {
        let mut errors = self.errors;
        let value = match self.value.map(f) {
            Some(Ok(v)) => Some(v),
            Some(Err(message)) => {
                errors.push(ValidationError::decode(path, message));
                None
            }
            None => None,
        };
        ConfigResult { value, errors }
    }
}
