//! Backend diagnostics and the per-connection error channel.
//!
//! Backends report every call as a [`CallResult`]: either an [`Outcome`]
//! (possibly carrying warning records) or a [`Failure`] with the records of
//! a hard error. [`check`] turns that into a crate [`Result`], logging the
//! records on the way. Records are never handed to callers; they only see
//! the flattened error text on the connection.

use std::cell::RefCell;
use std::fmt;

use thiserror::Error;
use tracing::{error, trace, warn};

use crate::error::{DbIntError, Result};

/// SQLSTATE of the benign "string data, right truncated" warning.
pub const STATE_TRUNCATED: &str = "01004";

/// A single backend-supplied warning or error record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Five character SQLSTATE.
    pub state: String,
    pub native_error: i32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native_error,
            message: message.into(),
        }
    }

    /// Shorthand for the truncation warning emitted by fetches into short buffers.
    pub fn truncated() -> Self {
        Self::new(STATE_TRUNCATED, 0, "String data, right truncated")
    }

    pub fn is_truncation(&self) -> bool {
        self.state == STATE_TRUNCATED
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.state, self.native_error, self.message)
    }
}

/// Successful completion of a backend call, with any warnings it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Diagnostic>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Diagnostic>) -> Self {
        Self { value, warnings }
    }
}

/// Hard failure of a backend call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", flatten(.diagnostics))]
pub struct Failure {
    pub diagnostics: Vec<Diagnostic>,
}

impl Failure {
    pub fn new(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Diagnostic> for Failure {
    fn from(diagnostic: Diagnostic) -> Self {
        Failure::new(diagnostic)
    }
}

fn flatten(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "no diagnostic records available".to_string();
    }
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// What every backend call returns.
pub type CallResult<T> = std::result::Result<Outcome<T>, Failure>;

/// Logs the diagnostics of a backend call and unwraps its value.
///
/// Warnings are swallowed after logging. A failure becomes
/// [`DbIntError::Backend`] tagged with `operation`.
pub(crate) fn check<T>(operation: &'static str, result: CallResult<T>) -> Result<T> {
    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                if warning.is_truncation() {
                    trace!(operation, state = %warning.state, "data truncated");
                    continue;
                }
                warn!(
                    operation,
                    state = %warning.state,
                    native_error = warning.native_error,
                    message = %warning.message,
                    "backend warning"
                );
            }
            Ok(outcome.value)
        }
        Err(failure) => {
            for record in &failure.diagnostics {
                error!(
                    operation,
                    state = %record.state,
                    native_error = record.native_error,
                    message = %record.message,
                    "backend error"
                );
            }
            Err(DbIntError::Backend {
                operation,
                message: failure.to_string(),
            })
        }
    }
}

/// Failure state carried by a connection.
///
/// The flag is derived from the text, so "text set only when failed"
/// holds by construction.
#[derive(Debug, Default)]
pub(crate) struct ErrorChannel {
    text: RefCell<Option<String>>,
}

impl ErrorChannel {
    pub(crate) fn reset(&self) {
        self.text.replace(None);
    }

    pub(crate) fn record(&self, err: &DbIntError) {
        self.text.replace(Some(err.to_string()));
    }

    pub(crate) fn failed(&self) -> bool {
        self.text.borrow().is_some()
    }

    pub(crate) fn text(&self) -> Option<String> {
        self.text.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_value_through_warnings() {
        let result: CallResult<u32> = Ok(Outcome::with_warnings(
            7,
            vec![Diagnostic::truncated(), Diagnostic::new("01000", 0, "general")],
        ));
        assert_eq!(check("fetch", result).unwrap(), 7);
    }

    #[test]
    fn test_check_flattens_failure() {
        let result: CallResult<()> = Err(Failure {
            diagnostics: vec![
                Diagnostic::new("42S02", 208, "Invalid object name 't'"),
                Diagnostic::new("42000", 8180, "Statement could not be prepared"),
            ],
        });
        let err = check("prepare", result).unwrap_err();
        assert_eq!(
            err.to_string(),
            "prepare failed: [42S02] (208) Invalid object name 't'; \
             [42000] (8180) Statement could not be prepared"
        );
    }

    #[test]
    fn test_error_channel_flag_follows_text() {
        let channel = ErrorChannel::default();
        assert!(!channel.failed());
        channel.record(&DbIntError::NotConnected);
        assert!(channel.failed());
        assert_eq!(channel.text().as_deref(), Some("Connection is not open"));
        channel.reset();
        assert!(!channel.failed());
        assert_eq!(channel.text(), None);
    }
}
