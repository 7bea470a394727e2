//! Error and quick-fix sink for the type checker

use crate::ast::Expression;
use std::fmt;

/// A suggested replacement for the node an error was reported against
#[derive(Debug, Clone, PartialEq)]
pub struct QuickFix {
    pub title: String,
    pub replacement: Expression,
}

impl QuickFix {
    pub fn new<S: Into<String>>(title: S, replacement: Expression) -> Self {
        Self {
            title: title.into(),
            replacement,
        }
    }
}

/// Receives user-facing type errors.
///
/// The checker only proposes fixes; whether and how they are shown is up
/// to the implementor.
pub trait ErrorRecorder {
    fn record_error(&mut self, node: &Expression, message: String, fixes: Vec<QuickFix>);
}

/// One recorded error
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedError {
    pub node: Expression,
    pub message: String,
    pub fixes: Vec<QuickFix>,
}

impl fmt::Display for RecordedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in `{}`)", self.message, self.node)
    }
}

/// Recorder that keeps every error in order
#[derive(Debug, Clone, Default)]
pub struct CollectingRecorder {
    errors: Vec<RecordedError>,
}

impl CollectingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[RecordedError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<RecordedError> {
        self.errors
    }
}

impl ErrorRecorder for CollectingRecorder {
    fn record_error(&mut self, node: &Expression, message: String, fixes: Vec<QuickFix>) {
        self.errors.push(RecordedError {
            node: node.clone(),
            message,
            fixes,
        });
    }
}
