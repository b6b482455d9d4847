//! Built-in function implementations.
//!
//! Every implementation has the [`FunctionImpl`](crate::expression::registry::FunctionImpl)
//! shape: it receives an [`Invocation`] holding the already-evaluated argument
//! columns and returns the result column. Argument kinds have been checked
//! against the descriptor before the call.

pub mod convert;
pub mod cumulative;
pub mod dates;
pub mod finance;
pub mod math;
pub mod output;
pub mod positional;
pub mod strings;
pub mod summary;

use crate::column::TypedColumn;
use crate::expression::eval::EvalConfig;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::render::{Figure, LayoutOptions, RenderSink};
use chrono::NaiveDateTime;
use std::borrow::Cow;
use std::io::Write;

/// Side-effect targets available to functions
pub struct Effects<'s> {
    sink: Option<&'s mut dyn RenderSink>,
    output: Option<&'s mut dyn Write>,
    pub layout: LayoutOptions,
}

impl<'s> Effects<'s> {
    /// No render sink, printing to stdout
    pub fn new() -> Self {
        Self {
            sink: None,
            output: None,
            layout: LayoutOptions::default(),
        }
    }

    pub fn set_sink(&mut self, sink: &'s mut dyn RenderSink) {
        self.sink = Some(sink);
    }

    pub fn set_output(&mut self, output: &'s mut dyn Write) {
        self.output = Some(output);
    }

    /// Write one line to the configured output, stdout by default
    pub fn write_line(&mut self, line: &str) -> ExpressionResult<()> {
        match self.output.as_deref_mut() {
            Some(out) => writeln!(out, "{}", line)?,
            None => println!("{}", line),
        }
        Ok(())
    }

    /// Hand a figure to the render sink
    pub fn render(&mut self, figure: &Figure) -> ExpressionResult<()> {
        let sink = self
            .sink
            .as_deref_mut()
            .ok_or_else(|| ExpressionError::Render {
                message: "no render sink configured".to_string(),
            })?;
        sink.render(figure, &self.layout)
            .map_err(|message| ExpressionError::Render { message })
    }
}

impl Default for Effects<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// One call of a built-in function
pub struct Invocation<'a, 's> {
    pub name: &'static str,
    /// Source text of the calling node
    pub expression: &'a str,
    pub args: Vec<&'a TypedColumn>,
    pub config: &'a EvalConfig,
    pub effects: &'a mut Effects<'s>,
}

impl<'a> Invocation<'a, '_> {
    /// The `index`-th argument
    pub fn arg(&self, index: usize) -> ExpressionResult<&'a TypedColumn> {
        self.args
            .get(index)
            .copied()
            .ok_or_else(|| ExpressionError::FunctionArgumentCount {
                function: self.name.to_string(),
                expected: index + 1,
                actual: self.args.len(),
            })
    }

    /// Numeric view of an argument
    pub fn floats(&self, index: usize) -> ExpressionResult<Cow<'a, [f64]>> {
        let column = self.arg(index)?;
        column.as_floats().ok_or_else(|| self.mismatch(index, "numeric", column))
    }

    pub fn strings(&self, index: usize) -> ExpressionResult<&'a [String]> {
        let column = self.arg(index)?;
        column
            .as_strings()
            .ok_or_else(|| self.mismatch(index, "String", column))
    }

    pub fn timestamps(&self, index: usize) -> ExpressionResult<&'a [NaiveDateTime]> {
        let column = self.arg(index)?;
        column
            .as_timestamps()
            .ok_or_else(|| self.mismatch(index, "Timestamp", column))
    }

    /// First element of a numeric argument that must be a scalar
    pub fn scalar(&self, index: usize) -> ExpressionResult<f64> {
        let values = self.floats(index)?;
        match values.as_ref() {
            [value] => Ok(*value),
            other => Err(ExpressionError::LengthMismatch {
                context: format!("argument {} of {}", index + 1, self.name),
                lengths: vec![other.len(), 1],
            }),
        }
    }

    /// A numeric argument holding one repeated value, such as a constant
    /// pipeline field
    pub fn uniform(&self, index: usize) -> ExpressionResult<f64> {
        let values = self.floats(index)?;
        match values.split_first() {
            Some((first, rest)) if rest.iter().all(|v| v == first) => Ok(*first),
            _ => Err(ExpressionError::LengthMismatch {
                context: format!("argument {} of {} must hold a single value", index + 1, self.name),
                lengths: vec![values.len(), 1],
            }),
        }
    }

    /// Variadic functions check their own argument counts
    pub fn expect_args(&self, min: usize, max: usize) -> ExpressionResult<()> {
        let actual = self.args.len();
        if actual < min || actual > max {
            return Err(ExpressionError::FunctionArgumentCount {
                function: self.name.to_string(),
                expected: if actual < min { min } else { max },
                actual,
            });
        }
        Ok(())
    }

    fn mismatch(&self, index: usize, expected: &str, column: &TypedColumn) -> ExpressionError {
        ExpressionError::TypeMismatch {
            context: format!("argument {} of {}", index + 1, self.name),
            expected: expected.to_string(),
            actual: column.kind(),
        }
    }
}

/// Numeric truth: strictly positive values are true
#[inline]
pub fn is_true(value: f64) -> bool {
    value > 0.0
}

#[inline]
pub fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Bring two columns to a common kind: equal kinds are kept, two numeric
/// kinds meet at Float64, anything else is a type error.
pub fn unify_kinds(
    context: &str,
    left: &TypedColumn,
    right: &TypedColumn,
) -> ExpressionResult<(TypedColumn, TypedColumn)> {
    if left.kind() == right.kind() {
        return Ok((left.clone(), right.clone()));
    }
    match (left.as_floats(), right.as_floats()) {
        (Some(l), Some(r)) => Ok((
            TypedColumn::Float64(l.into_owned()),
            TypedColumn::Float64(r.into_owned()),
        )),
        _ => Err(ExpressionError::TypeMismatch {
            context: context.to_string(),
            expected: left.kind().to_string(),
            actual: right.kind(),
        }),
    }
}

/// Convert an integral float to i64, rejecting fractions and non-finite values
pub fn integral(function: &str, value: f64) -> ExpressionResult<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ExpressionError::domain(
            function,
            format!("{} is not an integer", value),
        ));
    }
    Ok(value as i64)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unify_kinds() {
        let ints = TypedColumn::Int32(vec![1]);
        let floats = TypedColumn::Float64(vec![2.5]);
        let (l, r) = unify_kinds("if", &ints, &floats).unwrap();
        assert_eq!(l, TypedColumn::Float64(vec![1.0]));
        assert_eq!(r, floats);

        let strings = TypedColumn::scalar_string("a");
        assert!(matches!(
            unify_kinds("if", &ints, &strings),
            Err(ExpressionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_integral() {
        assert_eq!(integral("range", 3.0), Ok(3));
        assert!(integral("range", 3.5).is_err());
        assert!(integral("range", f64::NAN).is_err());
    }

    #[test]
    fn test_truth() {
        assert!(is_true(0.5));
        assert!(!is_true(0.0));
        assert!(!is_true(-1.0));
        assert_eq!(truth(true), 1.0);
    }
}
