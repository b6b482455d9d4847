//! Data pipelines that expressions read fields from and write results into.
//!
//! - **Pipeline**: the trait an evaluator reads columns through
//! - **MemoryPipeline**: an in-memory, insertion-ordered implementation
//! - **PipelineAdapter**: appends evaluated results, broadcasting or
//!   expanding the pipeline as needed

pub mod adapter;
pub mod memory;

pub use adapter::{fetch, PipelineAdapter};
pub use memory::{MemoryPipeline, Normalization};

use crate::column::{DataKind, TypedColumn};
use crate::expression::ExpressionError;
use thiserror::Error;

/// How a field's values are interpreted downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Continuous,
    Categorical,
}

impl Role {
    /// Default role for values of `kind`: strings are categorical
    pub fn for_kind(kind: DataKind) -> Self {
        match kind {
            DataKind::String => Role::Categorical,
            _ => Role::Continuous,
        }
    }
}

/// Errors raised by pipeline implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field already exists: {0}")]
    DuplicateField(String),

    #[error("Field {name} has {actual} rows, pipeline has {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<PipelineError> for ExpressionError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::FieldNotFound(name) => ExpressionError::FieldNotFound { name },
            other => ExpressionError::Pipeline {
                message: other.to_string(),
            },
        }
    }
}

/// A set of named, equally long columns
pub trait Pipeline {
    fn row_count(&self) -> usize;

    /// Field names in pipeline order
    fn field_names(&self) -> Vec<String>;

    fn get_column(&self, name: &str) -> PipelineResult<(TypedColumn, Role)>;

    /// Add a new field. With `renormalize`, implementations that keep
    /// normalization statistics refresh them for the new field.
    fn append_column(
        &mut self,
        name: &str,
        column: TypedColumn,
        role: Role,
        renormalize: bool,
    ) -> PipelineResult<()>;

    fn drop_column(&mut self, name: &str) -> PipelineResult<()>;

    fn has_field(&self, name: &str) -> bool {
        self.field_names().iter().any(|f| f == name)
    }
}
