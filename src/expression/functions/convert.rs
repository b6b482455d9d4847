//! Coercions between column kinds.

use super::Invocation;
use crate::column::{format_timestamp, parse_timestamp, TypedColumn};
use crate::expression::{ExpressionError, ExpressionResult};
use chrono::Datelike;

fn parse_number(function: &str, text: &str) -> ExpressionResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ExpressionError::domain(function, format!("'{}' is not a number", text)))
}

fn yyyymmdd(date: &chrono::NaiveDateTime) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

pub fn to_float(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    match invocation.arg(0)? {
        TypedColumn::Float64(values) => Ok(TypedColumn::Float64(values.clone())),
        TypedColumn::Int32(values) => Ok(TypedColumn::Float64(
            values.iter().map(|v| *v as f64).collect(),
        )),
        TypedColumn::Int64(values) => Ok(TypedColumn::Float64(
            values.iter().map(|v| *v as f64).collect(),
        )),
        TypedColumn::String(values) => values
            .iter()
            .map(|s| parse_number(invocation.name, s))
            .collect::<ExpressionResult<Vec<_>>>()
            .map(TypedColumn::Float64),
        TypedColumn::Timestamp(values) => Ok(TypedColumn::Float64(
            values.iter().map(|d| yyyymmdd(d) as f64).collect(),
        )),
    }
}

/// Truncates toward zero
pub fn to_int(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let name = invocation.name;
    let truncate = |v: f64| {
        if v.is_finite() {
            Ok(v.trunc() as i64)
        } else {
            Err(ExpressionError::domain(name, format!("{} has no integer value", v)))
        }
    };
    let column = invocation.arg(0)?;
    let values = match column {
        TypedColumn::Int32(values) => values.iter().map(|v| *v as i64).collect(),
        TypedColumn::Int64(values) => values.clone(),
        TypedColumn::Float64(values) => values
            .iter()
            .map(|v| truncate(*v))
            .collect::<ExpressionResult<Vec<_>>>()?,
        TypedColumn::String(values) => values
            .iter()
            .map(|s| match s.trim().parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => truncate(parse_number(name, s)?),
            })
            .collect::<ExpressionResult<Vec<_>>>()?,
        TypedColumn::Timestamp(values) => values.iter().map(yyyymmdd).collect(),
    };
    Ok(TypedColumn::Int64(values))
}

pub fn to_string(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let column = invocation.arg(0)?;
    let values = match column {
        TypedColumn::String(values) => values.clone(),
        TypedColumn::Timestamp(values) => values.iter().map(format_timestamp).collect(),
        other => (0..other.len())
            .filter_map(|i| other.get(i))
            .map(|v| v.to_string())
            .collect(),
    };
    Ok(TypedColumn::String(values))
}

/// Strings in any accepted date layout, or integers written as `YYYYMMDD`
pub fn to_date(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let name = invocation.name;
    let parse = |text: &str| {
        parse_timestamp(text)
            .ok_or_else(|| ExpressionError::domain(name, format!("'{}' is not a date", text)))
    };
    let column = invocation.arg(0)?;
    let values = match column {
        TypedColumn::Timestamp(values) => values.clone(),
        TypedColumn::String(values) => values
            .iter()
            .map(|s| parse(s.as_str()))
            .collect::<ExpressionResult<Vec<_>>>()?,
        numeric => numeric
            .as_floats()
            .unwrap_or_default()
            .iter()
            .map(|v| {
                if v.fract() != 0.0 || *v < 0.0 {
                    return Err(ExpressionError::domain(name, format!("{} is not a date", v)));
                }
                parse(format!("{:08}", *v as i64).as_str())
            })
            .collect::<ExpressionResult<Vec<_>>>()?,
    };
    Ok(TypedColumn::Timestamp(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::testing::{call, floats, strings};
    use crate::expression::ErrorCategory;

    #[test]
    fn test_to_float() {
        assert_eq!(
            call("toFloat", to_float, &[strings(&["1.5", " 2 "])]).unwrap(),
            floats(&[1.5, 2.0])
        );
        assert_eq!(
            call("toFloat", to_float, &[TypedColumn::Int32(vec![4])]).unwrap(),
            floats(&[4.0])
        );
        assert_eq!(
            call("toFloat", to_float, &[TypedColumn::Int64(vec![-3, 9])]).unwrap(),
            floats(&[-3.0, 9.0])
        );
        let err = call("toFloat", to_float, &[strings(&["x"])]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Domain);
    }

    #[test]
    fn test_to_int_truncates() {
        assert_eq!(
            call("toInt", to_int, &[floats(&[2.9, -2.9])]).unwrap(),
            TypedColumn::Int64(vec![2, -2])
        );
        assert_eq!(
            call("toInt", to_int, &[strings(&["7", "7.5"])]).unwrap(),
            TypedColumn::Int64(vec![7, 7])
        );
        assert!(call("toInt", to_int, &[floats(&[f64::NAN])]).is_err());
    }

    #[test]
    fn test_to_string_builds_keys() {
        assert_eq!(
            call("toString", to_string, &[floats(&[1.0, 2.5])]).unwrap(),
            strings(&["1", "2.5"])
        );
        assert_eq!(
            call("toString", to_string, &[TypedColumn::Int64(vec![42])]).unwrap(),
            strings(&["42"])
        );
    }

    #[test]
    fn test_to_date_and_back() {
        let dates = call("toDate", to_date, &[strings(&["2020-02-29", "20210101"])]).unwrap();
        assert_eq!(
            call("toString", to_string, &[dates.clone()]).unwrap(),
            strings(&["2020-02-29", "2021-01-01"])
        );
        assert_eq!(
            call("toInt", to_int, &[dates]).unwrap(),
            TypedColumn::Int64(vec![20200229, 20210101])
        );
        let from_int = call("toDate", to_date, &[floats(&[20200115.0])]).unwrap();
        assert_eq!(
            call("toString", to_string, &[from_int]).unwrap(),
            strings(&["2020-01-15"])
        );
        assert!(call("toDate", to_date, &[strings(&["2020-13-01"])]).is_err());
    }
}
