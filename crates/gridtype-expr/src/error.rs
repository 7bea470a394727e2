//! Engine error types
//!
//! User-facing type errors never travel through these types: the checker
//! hands them to an [`ErrorRecorder`](crate::recorder::ErrorRecorder) and
//! returns [`CheckError::Reported`] so ancestors abort without repeating the
//! message. [`InternalError`] is the separate channel for broken invariants.

use crate::ast::Expression;
use gridtype_core::Value;
use thiserror::Error;
use tracing::error;

/// Result type for operations that may fail anywhere in the engine
pub type ExprResult<T> = std::result::Result<T, ExprError>;

/// Text could not be parsed as an expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at position {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the input
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new<S: Into<String>>(position: usize, message: S) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A broken engine invariant: never a mistake in the user's expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Internal error: {0}")]
pub struct InternalError(String);

impl InternalError {
    /// Create an internal error; logged at `error` level when constructed
    pub fn new<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        error!(%message, "internal engine error");
        InternalError(message)
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Outcome of a failed check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The problem was already given to the error recorder
    #[error("Expression has type errors")]
    Reported,

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// A user-level runtime failure, such as dividing by zero
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EvaluationFailure {
    /// The node whose evaluation failed
    pub node: Expression,
    pub message: String,
    /// Children of `node` evaluated before the failure, in order
    pub evaluated: Vec<(Expression, Value)>,
}

impl EvaluationFailure {
    pub fn new<S: Into<String>>(node: &Expression, message: S) -> Self {
        Self {
            node: node.clone(),
            message: message.into(),
            evaluated: Vec::new(),
        }
    }

    /// Attach the already-evaluated children
    pub fn with_evaluated(mut self, evaluated: Vec<(Expression, Value)>) -> Self {
        self.evaluated = evaluated;
        self
    }
}

/// Outcome of a failed evaluation
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error(transparent)]
    Failure(#[from] EvaluationFailure),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Invalid addition to a catalogue or registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// Type name already declared
    #[error("Type already declared: {0}")]
    DuplicateType(String),

    /// Tag name already used by a type
    #[error("Tag {tag} is already declared by type {existing}")]
    DuplicateTag { tag: String, existing: String },

    /// Function name already registered
    #[error("Function already registered: {0}")]
    DuplicateFunction(String),
}

/// Any engine failure
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),
}
