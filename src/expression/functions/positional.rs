//! Selection, shifting and positional functions.

use super::{integral, is_true, unify_kinds, Invocation};
use crate::column::TypedColumn;
use crate::expression::broadcast::Broadcast;
use crate::expression::{ExpressionError, ExpressionResult};

/// `if(cond, a, b)`: row i takes `a` where `cond[i] > 0`, else `b`
pub fn select(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let cond = invocation.floats(0)?;
    let (a, b) = unify_kinds(invocation.name, invocation.arg(1)?, invocation.arg(2)?)?;
    let shape = Broadcast::new(invocation.name, &[cond.len(), a.len(), b.len()])?;

    // Pick from `a` and `b` laid end to end
    let offset = a.len();
    let picks: Vec<usize> = (0..shape.len())
        .map(|i| {
            if is_true(cond[shape.index(0, i)]) {
                shape.index(1, i)
            } else {
                offset + shape.index(2, i)
            }
        })
        .collect();
    Ok(a.concat(&b)?.take(&picks))
}

/// Values and a 1-length fill of a common kind
fn values_and_fill(invocation: &Invocation<'_, '_>) -> ExpressionResult<(TypedColumn, TypedColumn)> {
    let (values, fill) = unify_kinds(invocation.name, invocation.arg(0)?, invocation.arg(1)?)?;
    if fill.is_empty() {
        return Err(ExpressionError::LengthMismatch {
            context: format!("fill value of {}", invocation.name),
            lengths: vec![values.len(), 0],
        });
    }
    Broadcast::new(invocation.name, &[values.len(), fill.len()])?;
    let fill = fill.take(&[0]);
    Ok((values, fill))
}

/// `lag(x, missing)`: row 0 is `missing`, row i is `x[i-1]`
pub fn lag(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (values, fill) = values_and_fill(invocation)?;
    let n = values.len();
    let joined = fill.concat(&values)?;
    Ok(joined.take(&(0..n).collect::<Vec<_>>()))
}

/// `lead(x, missing)`: the last row is `missing`, row i is `x[i+1]`
pub fn lead(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (values, fill) = values_and_fill(invocation)?;
    let n = values.len();
    let joined = values.concat(&fill)?;
    Ok(joined.take(&(1..=n).collect::<Vec<_>>()))
}

/// `row(x)`: 0-based row index over the rows of `x`
pub fn row_number(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let n = invocation.arg(0)?.len();
    Ok(TypedColumn::Int64((0..n as i64).collect()))
}

/// `index(x, idx)`: `result[i] = x[idx[i]]`
pub fn gather(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let values = invocation.arg(0)?;
    let len = values.len();
    let positions = invocation
        .floats(1)?
        .iter()
        .map(|&v| {
            let index = integral(invocation.name, v)?;
            if index < 0 || index as usize >= len {
                return Err(ExpressionError::IndexOutOfRange { index, len });
            }
            Ok(index as usize)
        })
        .collect::<ExpressionResult<Vec<_>>>()?;
    Ok(values.take(&positions))
}

/// `range(start, end)`: the integers `start..end`
pub fn range(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let start = integral(invocation.name, invocation.scalar(0)?)?;
    let end = integral(invocation.name, invocation.scalar(1)?)?;
    if end <= start {
        return Err(ExpressionError::domain(
            invocation.name,
            format!("empty range {}..{}", start, end),
        ));
    }
    Ok(TypedColumn::Int64((start..end).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::testing::{call, floats, strings};

    #[test]
    fn test_select_uses_positive_truth() {
        let cond = floats(&[1.0, 0.0, 0.5, -1.0]);
        let result = call("if", select, &[cond, floats(&[1.0]), floats(&[2.0])]).unwrap();
        assert_eq!(result, floats(&[1.0, 2.0, 1.0, 2.0]));
    }

    #[test]
    fn test_select_strings() {
        let result = call(
            "if",
            select,
            &[floats(&[1.0, 0.0]), strings(&["a", "b"]), strings(&["x"])],
        )
        .unwrap();
        assert_eq!(result, strings(&["a", "x"]));

        assert!(call("if", select, &[floats(&[1.0]), strings(&["a"]), floats(&[1.0])]).is_err());
    }

    #[test]
    fn test_lag_and_lead() {
        let c = floats(&[1.0, 2.0]);
        assert_eq!(
            call("lag", lag, &[c.clone(), floats(&[3.0])]).unwrap(),
            floats(&[3.0, 1.0])
        );
        assert_eq!(
            call("lead", lead, &[c, floats(&[0.0])]).unwrap(),
            floats(&[2.0, 0.0])
        );
        assert_eq!(
            call("lag", lag, &[strings(&["a", "b", "c"]), strings(&[""])]).unwrap(),
            strings(&["", "a", "b"])
        );
    }

    #[test]
    fn test_lag_integer_column_with_float_fill() {
        let result = call("lag", lag, &[TypedColumn::Int64(vec![5, 6]), floats(&[0.0])]).unwrap();
        assert_eq!(result, floats(&[0.0, 5.0]));
    }

    #[test]
    fn test_row_and_gather() {
        assert_eq!(
            call("row", row_number, &[strings(&["a", "b", "c"])]).unwrap(),
            TypedColumn::Int64(vec![0, 1, 2])
        );
        assert_eq!(
            call("index", gather, &[strings(&["a", "b", "c"]), floats(&[2.0, 0.0])]).unwrap(),
            strings(&["c", "a"])
        );
        assert_eq!(
            call("index", gather, &[floats(&[1.0]), floats(&[1.0])]),
            Err(ExpressionError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_range() {
        let result = call("range", range, &[floats(&[0.0]), floats(&[10.0])]).unwrap();
        assert_eq!(result, TypedColumn::Int64((0..10).collect()));
        assert!(call("range", range, &[floats(&[3.0]), floats(&[3.0])]).is_err());
        assert!(call("range", range, &[floats(&[0.0, 1.0]), floats(&[3.0])]).is_err());
    }
}
