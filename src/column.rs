//! Typed columns: the unit of data flowing through expression evaluation.
//!
//! A column is a tagged, length-N sequence of same-kind values. Each kind has
//! its own typed backing storage; [`Scalar`] is the one boundary type used to
//! move single values in and out of a column.

use crate::expression::{ExpressionError, ExpressionResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::borrow::Cow;
use std::fmt;

/// Kinds of values a column can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Float64,
    Int32,
    Int64,
    String,
    Timestamp,
}

impl DataKind {
    /// Whether values of this kind take part in arithmetic
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataKind::Float64 | DataKind::Int32 | DataKind::Int64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Float64 => "Float64",
            DataKind::Int32 => "Int32",
            DataKind::Int64 => "Int64",
            DataKind::String => "String",
            DataKind::Timestamp => "Timestamp",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value of one of the supported kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Float64(f64),
    Int32(i32),
    Int64(i64),
    String(String),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    /// Get the kind of this value
    pub fn kind(&self) -> DataKind {
        match self {
            Scalar::Float64(_) => DataKind::Float64,
            Scalar::Int32(_) => DataKind::Int32,
            Scalar::Int64(_) => DataKind::Int64,
            Scalar::String(_) => DataKind::String,
            Scalar::Timestamp(_) => DataKind::Timestamp,
        }
    }

    /// Numeric view of this value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float64(v) => Some(*v),
            Scalar::Int32(v) => Some(*v as f64),
            Scalar::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
        }
    }
}

/// A length-N sequence of values sharing one kind.
///
/// A column of length 1 is a scalar and broadcasts against longer columns.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    String(Vec<String>),
    Timestamp(Vec<NaiveDateTime>),
}

impl TypedColumn {
    /// A 1-length Float64 column
    pub fn scalar_float(value: f64) -> Self {
        TypedColumn::Float64(vec![value])
    }

    /// A 1-length String column
    pub fn scalar_string(value: impl Into<String>) -> Self {
        TypedColumn::String(vec![value.into()])
    }

    /// Build a column of `kind` from boundary values.
    ///
    /// Every value must already be of `kind`.
    pub fn from_scalars(kind: DataKind, values: Vec<Scalar>) -> ExpressionResult<Self> {
        fn mismatch(kind: DataKind, value: &Scalar) -> ExpressionError {
            ExpressionError::TypeMismatch {
                context: "column construction".to_string(),
                expected: kind.to_string(),
                actual: value.kind(),
            }
        }

        let column = match kind {
            DataKind::Float64 => TypedColumn::Float64(
                values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::Float64(x) => Ok(x),
                        other => Err(mismatch(kind, &other)),
                    })
                    .collect::<ExpressionResult<_>>()?,
            ),
            DataKind::Int32 => TypedColumn::Int32(
                values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::Int32(x) => Ok(x),
                        other => Err(mismatch(kind, &other)),
                    })
                    .collect::<ExpressionResult<_>>()?,
            ),
            DataKind::Int64 => TypedColumn::Int64(
                values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::Int64(x) => Ok(x),
                        other => Err(mismatch(kind, &other)),
                    })
                    .collect::<ExpressionResult<_>>()?,
            ),
            DataKind::String => TypedColumn::String(
                values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::String(x) => Ok(x),
                        other => Err(mismatch(kind, &other)),
                    })
                    .collect::<ExpressionResult<_>>()?,
            ),
            DataKind::Timestamp => TypedColumn::Timestamp(
                values
                    .into_iter()
                    .map(|v| match v {
                        Scalar::Timestamp(x) => Ok(x),
                        other => Err(mismatch(kind, &other)),
                    })
                    .collect::<ExpressionResult<_>>()?,
            ),
        };
        Ok(column)
    }

    pub fn kind(&self) -> DataKind {
        match self {
            TypedColumn::Float64(_) => DataKind::Float64,
            TypedColumn::Int32(_) => DataKind::Int32,
            TypedColumn::Int64(_) => DataKind::Int64,
            TypedColumn::String(_) => DataKind::String,
            TypedColumn::Timestamp(_) => DataKind::Timestamp,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedColumn::Float64(v) => v.len(),
            TypedColumn::Int32(v) => v.len(),
            TypedColumn::Int64(v) => v.len(),
            TypedColumn::String(v) => v.len(),
            TypedColumn::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length-1 columns broadcast against any other length
    pub fn is_scalar(&self) -> bool {
        self.len() == 1
    }

    /// Get the value at `index` as a boundary value
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            TypedColumn::Float64(v) => v.get(index).map(|x| Scalar::Float64(*x)),
            TypedColumn::Int32(v) => v.get(index).map(|x| Scalar::Int32(*x)),
            TypedColumn::Int64(v) => v.get(index).map(|x| Scalar::Int64(*x)),
            TypedColumn::String(v) => v.get(index).map(|x| Scalar::String(x.clone())),
            TypedColumn::Timestamp(v) => v.get(index).map(|x| Scalar::Timestamp(*x)),
        }
    }

    /// Numeric view of the column; `None` for strings and timestamps
    pub fn as_floats(&self) -> Option<Cow<'_, [f64]>> {
        match self {
            TypedColumn::Float64(v) => Some(Cow::Borrowed(v.as_slice())),
            TypedColumn::Int32(v) => Some(Cow::Owned(v.iter().map(|x| *x as f64).collect())),
            TypedColumn::Int64(v) => Some(Cow::Owned(v.iter().map(|x| *x as f64).collect())),
            TypedColumn::String(_) | TypedColumn::Timestamp(_) => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            TypedColumn::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamps(&self) -> Option<&[NaiveDateTime]> {
        match self {
            TypedColumn::Timestamp(v) => Some(v),
            _ => None,
        }
    }

    /// Flip the sign of every numeric value. Strings and timestamps are left as is.
    pub fn negate(&mut self) {
        match self {
            TypedColumn::Float64(v) => v.iter_mut().for_each(|x| *x = -*x),
            TypedColumn::Int32(v) => v.iter_mut().for_each(|x| *x = x.wrapping_neg()),
            TypedColumn::Int64(v) => v.iter_mut().for_each(|x| *x = x.wrapping_neg()),
            TypedColumn::String(_) | TypedColumn::Timestamp(_) => {}
        }
    }

    /// Gather the rows at `indices` into a new column
    pub fn take(&self, indices: &[usize]) -> TypedColumn {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }

        match self {
            TypedColumn::Float64(v) => TypedColumn::Float64(pick(v, indices)),
            TypedColumn::Int32(v) => TypedColumn::Int32(pick(v, indices)),
            TypedColumn::Int64(v) => TypedColumn::Int64(pick(v, indices)),
            TypedColumn::String(v) => TypedColumn::String(pick(v, indices)),
            TypedColumn::Timestamp(v) => TypedColumn::Timestamp(pick(v, indices)),
        }
    }

    /// Join two columns of the same kind end to end
    pub fn concat(&self, other: &TypedColumn) -> ExpressionResult<TypedColumn> {
        fn join<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
            a.iter().chain(b).cloned().collect()
        }

        let joined = match (self, other) {
            (TypedColumn::Float64(a), TypedColumn::Float64(b)) => TypedColumn::Float64(join(a, b)),
            (TypedColumn::Int32(a), TypedColumn::Int32(b)) => TypedColumn::Int32(join(a, b)),
            (TypedColumn::Int64(a), TypedColumn::Int64(b)) => TypedColumn::Int64(join(a, b)),
            (TypedColumn::String(a), TypedColumn::String(b)) => TypedColumn::String(join(a, b)),
            (TypedColumn::Timestamp(a), TypedColumn::Timestamp(b)) => {
                TypedColumn::Timestamp(join(a, b))
            }
            _ => {
                return Err(ExpressionError::TypeMismatch {
                    context: "column concatenation".to_string(),
                    expected: self.kind().to_string(),
                    actual: other.kind(),
                })
            }
        };
        Ok(joined)
    }

    /// Repeat a scalar column to `len` rows; a column already `len` long is cloned
    pub fn broadcast_to(&self, len: usize) -> ExpressionResult<TypedColumn> {
        if self.len() == len {
            return Ok(self.clone());
        }
        if !self.is_scalar() {
            return Err(ExpressionError::LengthMismatch {
                context: "broadcast".to_string(),
                lengths: vec![self.len(), len],
            });
        }
        Ok(self.take(&vec![0; len]))
    }
}

impl fmt::Display for TypedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.len() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if let Some(value) = self.get(i) {
                write!(f, "{}", value)?;
            }
        }
        write!(f, "]")
    }
}

/// Parse a date or timestamp literal.
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text[0..4].parse().ok()?;
        let month = text[4..6].parse().ok()?;
        let day = text[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(NaiveTime::MIN));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Timestamps at midnight print as plain dates
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_kind_and_len() {
        let col = TypedColumn::Float64(vec![1.0, 2.0, 3.0]);
        assert_eq!(col.kind(), DataKind::Float64);
        assert_eq!(col.len(), 3);
        assert!(!col.is_scalar());
        assert!(TypedColumn::scalar_string("x").is_scalar());
        assert!(DataKind::Int32.is_numeric());
        assert!(!DataKind::Timestamp.is_numeric());
    }

    #[test]
    fn test_from_scalars_rejects_mixed_kinds() {
        let ok = TypedColumn::from_scalars(
            DataKind::Int64,
            vec![Scalar::Int64(1), Scalar::Int64(2)],
        )
        .unwrap();
        assert_eq!(ok, TypedColumn::Int64(vec![1, 2]));

        let err = TypedColumn::from_scalars(
            DataKind::Int64,
            vec![Scalar::Int64(1), Scalar::String("a".to_string())],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::TypeMismatch {
                actual: DataKind::String,
                ..
            }
        ));
    }

    #[test]
    fn test_negate_only_touches_numbers() {
        let mut ints = TypedColumn::Int32(vec![1, -2]);
        ints.negate();
        assert_eq!(ints, TypedColumn::Int32(vec![-1, 2]));

        let mut strings = TypedColumn::String(vec!["a".to_string()]);
        strings.negate();
        assert_eq!(strings, TypedColumn::String(vec!["a".to_string()]));
    }

    #[test]
    fn test_broadcast_to() {
        let scalar = TypedColumn::scalar_float(2.5);
        assert_eq!(
            scalar.broadcast_to(3).unwrap(),
            TypedColumn::Float64(vec![2.5, 2.5, 2.5])
        );

        let col = TypedColumn::Int64(vec![1, 2]);
        assert!(matches!(
            col.broadcast_to(3),
            Err(ExpressionError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_concat() {
        let a = TypedColumn::Int64(vec![1]);
        let b = TypedColumn::Int64(vec![2, 3]);
        assert_eq!(a.concat(&b).unwrap(), TypedColumn::Int64(vec![1, 2, 3]));
        assert!(a.concat(&TypedColumn::scalar_float(1.0)).is_err());
    }

    #[test]
    fn test_as_floats_borrows_float_storage() {
        let col = TypedColumn::Float64(vec![1.0]);
        assert!(matches!(col.as_floats(), Some(Cow::Borrowed(_))));
        let ints = TypedColumn::Int64(vec![3]);
        assert_eq!(ints.as_floats().unwrap().as_ref(), &[3.0]);
        assert!(TypedColumn::scalar_string("a").as_floats().is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("20200115"), Some(date(2020, 1, 15)));
        assert_eq!(parse_timestamp("2020-01-15"), Some(date(2020, 1, 15)));
        assert_eq!(
            parse_timestamp("2020-01-15 10:30:00").map(|ts| ts.format("%H:%M").to_string()),
            Some("10:30".to_string())
        );
        assert_eq!(parse_timestamp("20201315"), None);
        assert_eq!(parse_timestamp("hello"), None);
    }

    #[test]
    fn test_display() {
        let col = TypedColumn::Timestamp(vec![date(2021, 3, 1)]);
        assert_eq!(col.to_string(), "[2021-03-01]");
        assert_eq!(TypedColumn::Float64(vec![1.5, -2.0]).to_string(), "[1.5, -2]");
    }
}
