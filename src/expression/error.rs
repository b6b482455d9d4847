//! Error types for expression parsing and evaluation.

use crate::column::DataKind;
use thiserror::Error;

/// Broad classes of failure, for callers that branch on the kind of error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The expression text could not be turned into a tree
    Parse,
    /// An argument or operand has the wrong kind
    Type,
    /// Column lengths cannot be reconciled
    Shape,
    /// A value is outside what an operation accepts
    Domain,
    /// A referenced field does not exist
    Lookup,
    /// The pipeline, render sink or output writer failed
    External,
}

/// Errors that can occur while building or evaluating an expression tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Mismatched parentheses in '{expression}'")]
    MismatchedParentheses { expression: String },

    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Function {function} expects {expected} arguments, got {actual}")]
    FunctionArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: DataKind,
    },

    #[error("Invalid operand types for operator {operator}: left={left}, right={right}")]
    InvalidOperandTypes {
        operator: String,
        left: DataKind,
        right: DataKind,
    },

    #[error("Length mismatch in {context}: {lengths:?}")]
    LengthMismatch { context: String, lengths: Vec<usize> },

    #[error("Index {index} out of range for column of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid input to {function}: {reason}")]
    InvalidDomain { function: String, reason: String },

    #[error("{function} did not converge (residual {residual:e})")]
    NoConvergence { function: String, residual: f64 },

    #[error("Field not found: {name}")]
    FieldNotFound { name: String },

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Output error: {message}")]
    Output { message: String },
}

impl ExpressionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExpressionError::MismatchedParentheses { .. }
            | ExpressionError::InvalidExpression { .. }
            | ExpressionError::UnknownFunction { .. }
            | ExpressionError::FunctionArgumentCount { .. } => ErrorCategory::Parse,
            ExpressionError::TypeMismatch { .. } | ExpressionError::InvalidOperandTypes { .. } => {
                ErrorCategory::Type
            }
            ExpressionError::LengthMismatch { .. } | ExpressionError::IndexOutOfRange { .. } => {
                ErrorCategory::Shape
            }
            ExpressionError::DivisionByZero
            | ExpressionError::InvalidDomain { .. }
            | ExpressionError::NoConvergence { .. } => ErrorCategory::Domain,
            ExpressionError::FieldNotFound { .. } => ErrorCategory::Lookup,
            ExpressionError::Pipeline { .. }
            | ExpressionError::Render { .. }
            | ExpressionError::Output { .. } => ErrorCategory::External,
        }
    }

    pub(crate) fn invalid(expression: &str, reason: impl Into<String>) -> Self {
        ExpressionError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn domain(function: &str, reason: impl Into<String>) -> Self {
        ExpressionError::InvalidDomain {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for ExpressionError {
    fn from(err: std::io::Error) -> Self {
        ExpressionError::Output {
            message: err.to_string(),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
