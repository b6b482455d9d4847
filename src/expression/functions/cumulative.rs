//! Exclusive prefix and suffix aggregates. Row i never includes its own value.

use super::{is_true, Invocation};
use crate::column::TypedColumn;
use crate::expression::ExpressionResult;

#[derive(Clone, Copy)]
enum Direction {
    Before,
    After,
}

fn exclusive_scan(
    invocation: &Invocation<'_, '_>,
    seed: f64,
    direction: Direction,
    step: fn(f64, f64) -> f64,
) -> ExpressionResult<TypedColumn> {
    let values = invocation.floats(0)?;
    let mut out = vec![0.0; values.len()];
    let mut acc = seed;
    let mut visit = |i: usize| {
        out[i] = acc;
        acc = step(acc, values[i]);
    };
    match direction {
        Direction::Before => (0..values.len()).for_each(&mut visit),
        Direction::After => (0..values.len()).rev().for_each(&mut visit),
    }
    Ok(TypedColumn::Float64(out))
}

fn add(acc: f64, x: f64) -> f64 {
    acc + x
}

fn multiply(acc: f64, x: f64) -> f64 {
    acc * x
}

fn count_true(acc: f64, x: f64) -> f64 {
    if is_true(x) {
        acc + 1.0
    } else {
        acc
    }
}

pub fn sum_before(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 0.0, Direction::Before, add)
}

pub fn sum_after(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 0.0, Direction::After, add)
}

pub fn product_before(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 1.0, Direction::Before, multiply)
}

pub fn product_after(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 1.0, Direction::After, multiply)
}

pub fn count_before(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 0.0, Direction::Before, count_true)
}

pub fn count_after(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    exclusive_scan(invocation, 0.0, Direction::After, count_true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::testing::{call, floats};

    #[test]
    fn test_sums_exclude_current_row() {
        let x = floats(&[1.0, 2.0, 3.0]);
        assert_eq!(
            call("cumeBefore", sum_before, &[x.clone()]).unwrap(),
            floats(&[0.0, 1.0, 3.0])
        );
        assert_eq!(
            call("cumeAfter", sum_after, &[x]).unwrap(),
            floats(&[5.0, 3.0, 0.0])
        );
    }

    #[test]
    fn test_products() {
        let x = floats(&[2.0, 3.0, 4.0]);
        assert_eq!(
            call("cumeProdBefore", product_before, &[x.clone()]).unwrap(),
            floats(&[1.0, 2.0, 6.0])
        );
        assert_eq!(
            call("cumeProdAfter", product_after, &[x]).unwrap(),
            floats(&[12.0, 4.0, 1.0])
        );
    }

    #[test]
    fn test_counts() {
        let x = floats(&[1.0, 0.0, 1.0, 1.0]);
        assert_eq!(
            call("cumeCountBefore", count_before, &[x.clone()]).unwrap(),
            floats(&[0.0, 1.0, 1.0, 2.0])
        );
        assert_eq!(
            call("cumeCountAfter", count_after, &[x]).unwrap(),
            floats(&[2.0, 2.0, 1.0, 0.0])
        );
    }
}
