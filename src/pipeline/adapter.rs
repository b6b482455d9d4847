//! Moving columns between evaluated trees and a pipeline.

use super::{Pipeline, Role};
use crate::column::TypedColumn;
use crate::expression::node::OpNode;
use crate::expression::{ExpressionError, ExpressionResult};
use log::{debug, info};

/// Read a field, mapping pipeline errors into expression errors
pub fn fetch(pipeline: &dyn Pipeline, name: &str) -> ExpressionResult<(TypedColumn, Role)> {
    Ok(pipeline.get_column(name)?)
}

/// Writes results into a pipeline.
///
/// A 1-length result broadcasts to the pipeline's row count. A longer result
/// written to a 1-row pipeline first expands every existing field to the new
/// length. Any other length difference is a shape error.
pub struct PipelineAdapter<'p> {
    pipeline: &'p mut dyn Pipeline,
    renormalize: bool,
}

impl<'p> PipelineAdapter<'p> {
    pub fn new(pipeline: &'p mut dyn Pipeline, renormalize: bool) -> Self {
        Self {
            pipeline,
            renormalize,
        }
    }

    pub fn fetch(&self, name: &str) -> ExpressionResult<(TypedColumn, Role)> {
        fetch(&*self.pipeline, name)
    }

    /// Append a new field
    pub fn append(&mut self, name: &str, column: TypedColumn, role: Role) -> ExpressionResult<()> {
        let column = self.fit(name, column)?;
        debug!("appending field {} ({} rows)", name, column.len());
        self.pipeline
            .append_column(name, column, role, self.renormalize)?;
        Ok(())
    }

    /// Append, replacing any existing field of the same name. The old field
    /// is only dropped once the new column is known to fit.
    pub fn replace(&mut self, name: &str, column: TypedColumn, role: Role) -> ExpressionResult<()> {
        if !self.pipeline.has_field(name) {
            return self.append(name, column, role);
        }
        let column = self.fit(name, column)?;
        let (previous, previous_role) = self.pipeline.get_column(name)?;
        self.pipeline.drop_column(name)?;
        debug!("replacing field {} ({} rows)", name, column.len());
        if let Err(err) = self
            .pipeline
            .append_column(name, column, role, self.renormalize)
        {
            self.pipeline
                .append_column(name, previous, previous_role, self.renormalize)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Shape `column` to the pipeline's row count: a 1-length column
    /// broadcasts, and a 1-row pipeline expands to a longer column.
    fn fit(&mut self, name: &str, column: TypedColumn) -> ExpressionResult<TypedColumn> {
        let rows = self.pipeline.row_count();
        let populated = !self.pipeline.field_names().is_empty();
        if !populated || column.len() == rows {
            Ok(column)
        } else if column.is_scalar() {
            column.broadcast_to(rows)
        } else if rows == 1 {
            self.expand(column.len())?;
            Ok(column)
        } else {
            Err(ExpressionError::LengthMismatch {
                context: format!("writing field {}", name),
                lengths: vec![rows, column.len()],
            })
        }
    }

    /// Append the value of an evaluated tree
    pub fn append_result(&mut self, name: &str, node: &OpNode) -> ExpressionResult<()> {
        let (column, role) = Self::result_of(node)?;
        self.append(name, column, role)
    }

    pub fn replace_result(&mut self, name: &str, node: &OpNode) -> ExpressionResult<()> {
        let (column, role) = Self::result_of(node)?;
        self.replace(name, column, role)
    }

    fn result_of(node: &OpNode) -> ExpressionResult<(TypedColumn, Role)> {
        let column = node
            .value()
            .cloned()
            .ok_or_else(|| ExpressionError::invalid(&node.expression, "not evaluated"))?;
        let role = node
            .inferred_role
            .unwrap_or_else(|| Role::for_kind(column.kind()));
        Ok((column, role))
    }

    /// Repeat every field of a 1-row pipeline to `len` rows.
    /// All fields are taken out before any is put back so the row count never disagrees.
    fn expand(&mut self, len: usize) -> ExpressionResult<()> {
        info!("expanding pipeline from 1 to {} rows", len);
        let names = self.pipeline.field_names();
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let (column, role) = self.pipeline.get_column(&name)?;
            self.pipeline.drop_column(&name)?;
            fields.push((name, column, role));
        }
        for (name, column, role) in fields {
            let column = column.broadcast_to(len)?;
            self.pipeline
                .append_column(&name, column, role, self.renormalize)?;
        }
        Ok(())
    }
}
