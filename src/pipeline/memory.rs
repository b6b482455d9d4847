//! In-memory pipeline.

use super::{Pipeline, PipelineError, PipelineResult, Role};
use crate::column::TypedColumn;

/// Mean and standard deviation recorded for a continuous field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: f64,
    pub std: f64,
}

impl Normalization {
    /// Population statistics of a numeric column; `None` for other kinds or no rows
    fn of(column: &TypedColumn) -> Option<Self> {
        let values = column.as_floats()?;
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    column: TypedColumn,
    role: Role,
    normalization: Option<Normalization>,
}

/// Fields kept in insertion order. The first field fixes the row count;
/// every later field must match it until all fields are dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryPipeline {
    fields: Vec<Field>,
}

impl MemoryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from named columns, inferring roles from their kinds
    pub fn from_columns<N: Into<String>>(
        columns: impl IntoIterator<Item = (N, TypedColumn)>,
    ) -> PipelineResult<Self> {
        let mut pipeline = Self::new();
        for (name, column) in columns {
            let role = Role::for_kind(column.kind());
            pipeline.append_column(&name.into(), column, role, false)?;
        }
        Ok(pipeline)
    }

    /// Statistics recorded when the field was appended with `renormalize`
    pub fn normalization(&self, name: &str) -> Option<Normalization> {
        self.field(name).and_then(|f| f.normalization)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Pipeline for MemoryPipeline {
    fn row_count(&self) -> usize {
        self.fields.first().map(|f| f.column.len()).unwrap_or(0)
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    fn get_column(&self, name: &str) -> PipelineResult<(TypedColumn, Role)> {
        self.field(name)
            .map(|f| (f.column.clone(), f.role))
            .ok_or_else(|| PipelineError::FieldNotFound(name.to_string()))
    }

    fn append_column(
        &mut self,
        name: &str,
        column: TypedColumn,
        role: Role,
        renormalize: bool,
    ) -> PipelineResult<()> {
        if self.field(name).is_some() {
            return Err(PipelineError::DuplicateField(name.to_string()));
        }
        if !self.fields.is_empty() && column.len() != self.row_count() {
            return Err(PipelineError::RowCountMismatch {
                name: name.to_string(),
                expected: self.row_count(),
                actual: column.len(),
            });
        }
        let normalization = if renormalize && role == Role::Continuous {
            Normalization::of(&column)
        } else {
            None
        };
        self.fields.push(Field {
            name: name.to_string(),
            column,
            role,
            normalization,
        });
        Ok(())
    }

    fn drop_column(&mut self, name: &str) -> PipelineResult<()> {
        let position = self
            .fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| PipelineError::FieldNotFound(name.to_string()))?;
        self.fields.remove(position);
        Ok(())
    }

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
