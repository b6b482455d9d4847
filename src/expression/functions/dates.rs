//! Date arithmetic and date parts.

use super::{integral, Invocation};
use crate::column::TypedColumn;
use crate::expression::broadcast::Broadcast;
use crate::expression::{ExpressionError, ExpressionResult};
use chrono::{Datelike, Months, NaiveDateTime};

fn shift_months(date: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// Whole calendar months from `earlier` to `later`; a partial month does not count
fn whole_months(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    let raw = (later.year() as i64 - earlier.year() as i64) * 12 + later.month() as i64
        - earlier.month() as i64;
    let later_rest = (later.day(), later.time());
    let earlier_rest = (earlier.day(), earlier.time());
    if raw > 0 && later_rest < earlier_rest {
        raw - 1
    } else if raw < 0 && later_rest > earlier_rest {
        raw + 1
    } else {
        raw
    }
}

/// `dateAdd(date, months)`. Days past the end of the target month clamp to its last day.
pub fn add_months(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let name = invocation.name;
    let dates = invocation.timestamps(0)?;
    let months = invocation.floats(1)?;
    let shape = Broadcast::new(name, &[dates.len(), months.len()])?;
    (0..shape.len())
        .map(|i| {
            let date = dates[shape.index(0, i)];
            let months = integral(name, months[shape.index(1, i)])?;
            shift_months(date, months)
                .ok_or_else(|| ExpressionError::domain(name, "date out of range"))
        })
        .collect::<ExpressionResult<Vec<_>>>()
        .map(TypedColumn::Timestamp)
}

/// `dateDiff(later, earlier, unit)` in whole `'day'`, `'month'` or `'year'` units
pub fn difference(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let name = invocation.name;
    let later = invocation.timestamps(0)?;
    let earlier = invocation.timestamps(1)?;
    let units = invocation.strings(2)?;
    let shape = Broadcast::new(name, &[later.len(), earlier.len(), units.len()])?;
    (0..shape.len())
        .map(|i| {
            let (a, b) = (later[shape.index(0, i)], earlier[shape.index(1, i)]);
            match units[shape.index(2, i)].as_str() {
                "day" => Ok((a - b).num_days()),
                "month" => Ok(whole_months(a, b)),
                "year" => Ok(whole_months(a, b) / 12),
                other => Err(ExpressionError::domain(
                    name,
                    format!("unknown unit '{}', expected day, month or year", other),
                )),
            }
        })
        .collect::<ExpressionResult<Vec<_>>>()
        .map(TypedColumn::Int64)
}

fn date_part(
    invocation: &Invocation<'_, '_>,
    part: fn(&NaiveDateTime) -> i64,
) -> ExpressionResult<TypedColumn> {
    let dates = invocation.timestamps(0)?;
    Ok(TypedColumn::Int64(dates.iter().map(part).collect()))
}

pub fn year(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    date_part(invocation, |d| d.year() as i64)
}

pub fn month(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    date_part(invocation, |d| d.month() as i64)
}

pub fn day(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    date_part(invocation, |d| d.day() as i64)
}
