//! Reductions to a single value and fit metrics.

use super::Invocation;
use crate::column::TypedColumn;
use crate::expression::broadcast::map_floats;
use crate::expression::{ExpressionError, ExpressionResult};

/// Running state for the one-pass reductions
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn over(values: &[f64]) -> Self {
        let mut acc = Self::new();
        values.iter().for_each(|v| acc.update(*v));
        acc
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn scalar(value: f64) -> ExpressionResult<TypedColumn> {
    Ok(TypedColumn::scalar_float(value))
}

fn non_empty(invocation: &Invocation<'_, '_>, acc: &Accumulator) -> ExpressionResult<()> {
    if acc.count == 0 {
        return Err(ExpressionError::domain(invocation.name, "no values"));
    }
    Ok(())
}

pub fn sum(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    scalar(Accumulator::over(&invocation.floats(0)?).sum)
}

pub fn mean(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let acc = Accumulator::over(&invocation.floats(0)?);
    match acc.mean() {
        Some(mean) => scalar(mean),
        None => Err(ExpressionError::domain(invocation.name, "no values")),
    }
}

pub fn min(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let acc = Accumulator::over(&invocation.floats(0)?);
    non_empty(invocation, &acc)?;
    scalar(acc.min)
}

pub fn max(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let acc = Accumulator::over(&invocation.floats(0)?);
    non_empty(invocation, &acc)?;
    scalar(acc.max)
}

/// Sample standard deviation (n - 1 denominator)
pub fn std(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let values = invocation.floats(0)?;
    let acc = Accumulator::over(&values);
    let mean = match acc.mean() {
        Some(mean) if acc.count >= 2 => mean,
        _ => {
            return Err(ExpressionError::domain(
                invocation.name,
                "needs at least two values",
            ))
        }
    };
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    scalar((squares / (acc.count - 1) as f64).sqrt())
}

/// Number of rows, of any kind
pub fn count(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    Ok(TypedColumn::Int64(vec![invocation.arg(0)?.len() as i64]))
}

pub fn median(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let mut values = invocation.floats(0)?.into_owned();
    if values.is_empty() {
        return Err(ExpressionError::domain(invocation.name, "no values"));
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        scalar((values[mid - 1] + values[mid]) / 2.0)
    } else {
        scalar(values[mid])
    }
}

fn residuals(invocation: &Invocation<'_, '_>) -> ExpressionResult<Vec<f64>> {
    let (actual, fitted) = (invocation.floats(0)?, invocation.floats(1)?);
    map_floats(invocation.name, &[&*actual, &*fitted], |r| Ok(r[0] - r[1]))
}

pub fn sse(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    scalar(residuals(invocation)?.iter().map(|e| e * e).sum())
}

/// Mean absolute deviation of the residuals
pub fn mad(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let errors = residuals(invocation)?;
    if errors.is_empty() {
        return Err(ExpressionError::domain(invocation.name, "no values"));
    }
    scalar(errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64)
}

/// Coefficient of determination of `fitted` against `actual`
pub fn r_squared(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let errors = residuals(invocation)?;
    let actual = invocation.floats(0)?;
    let mean = Accumulator::over(&actual)
        .mean()
        .ok_or_else(|| ExpressionError::domain(invocation.name, "no values"))?;
    let total: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    if total == 0.0 {
        return Err(ExpressionError::domain(
            invocation.name,
            "actual values have no variance",
        ));
    }
    let residual: f64 = errors.iter().map(|e| e * e).sum();
    scalar(1.0 - residual / total)
}
