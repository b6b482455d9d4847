//! Elementwise numeric functions.

use super::Invocation;
use crate::column::TypedColumn;
use crate::expression::broadcast::map_floats;
use crate::expression::{ExpressionError, ExpressionResult};

fn unary(
    invocation: &Invocation<'_, '_>,
    f: fn(f64) -> ExpressionResult<f64>,
) -> ExpressionResult<TypedColumn> {
    let values = invocation.floats(0)?;
    values
        .iter()
        .map(|v| f(*v))
        .collect::<ExpressionResult<Vec<_>>>()
        .map(TypedColumn::Float64)
}

pub fn abs(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| Ok(x.abs()))
}

pub fn exp(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| Ok(x.exp()))
}

pub fn log(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| {
        if x <= 0.0 {
            return Err(ExpressionError::domain("log", format!("{} is not positive", x)));
        }
        Ok(x.ln())
    })
}

pub fn sqrt(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| {
        if x < 0.0 {
            return Err(ExpressionError::domain("sqrt", format!("{} is negative", x)));
        }
        Ok(x.sqrt())
    })
}

pub fn floor(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| Ok(x.floor()))
}

pub fn ceil(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    unary(invocation, |x| Ok(x.ceil()))
}

pub fn max_elementwise(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (a, b) = (invocation.floats(0)?, invocation.floats(1)?);
    map_floats(invocation.name, &[&*a, &*b], |r| Ok(r[0].max(r[1]))).map(TypedColumn::Float64)
}

pub fn min_elementwise(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (a, b) = (invocation.floats(0)?, invocation.floats(1)?);
    map_floats(invocation.name, &[&*a, &*b], |r| Ok(r[0].min(r[1]))).map(TypedColumn::Float64)
}
