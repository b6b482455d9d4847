//! Printing and plotting. These are evaluated for their side effect and
//! return a 1-length `[0]` placeholder.

use super::{integral, is_true, Invocation};
use crate::column::TypedColumn;
use crate::expression::broadcast::Broadcast;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::render::Figure;
use log::debug;

fn done() -> ExpressionResult<TypedColumn> {
    Ok(TypedColumn::scalar_float(0.0))
}

fn format_rows(column: &TypedColumn, rows: &[usize], total: usize) -> String {
    let shown: Vec<String> = rows
        .iter()
        .filter_map(|&i| column.get(i))
        .map(|v| v.to_string())
        .collect();
    if shown.is_empty() && total > 0 {
        format!("[... ({} rows)]", total)
    } else if total > shown.len() {
        format!("[{}, ... ({} rows)]", shown.join(", "), total)
    } else {
        format!("[{}]", shown.join(", "))
    }
}

/// Non-negative integral count argument
fn count_arg(invocation: &Invocation<'_, '_>, index: usize, min: i64) -> ExpressionResult<usize> {
    let value = integral(invocation.name, invocation.scalar(index)?)?;
    if value < min {
        return Err(ExpressionError::domain(
            invocation.name,
            format!("{} is less than {}", value, min),
        ));
    }
    Ok(value as usize)
}

/// `print(x)` or `print(x, rows)`
pub fn print(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    invocation.expect_args(1, 2)?;
    let column = invocation.arg(0)?;
    let rows = if invocation.args.len() == 2 {
        count_arg(invocation, 1, 0)?
    } else {
        invocation.config.print_rows
    };
    let shown: Vec<usize> = (0..column.len().min(rows)).collect();
    let line = format_rows(column, &shown, column.len());
    invocation.effects.write_line(&line)?;
    done()
}

/// `printIf(x, cond)`: the rows of `x` where `cond > 0`
pub fn print_if(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let column = invocation.arg(0)?;
    let cond = invocation.floats(1)?;
    let shape = Broadcast::new(invocation.name, &[column.len(), cond.len()])?;
    let selected: Vec<usize> = (0..shape.len())
        .filter(|&i| is_true(cond[shape.index(1, i)]))
        .map(|i| shape.index(0, i))
        .collect();
    let line = format_rows(column, &selected, selected.len());
    invocation.effects.write_line(&line)?;
    done()
}

/// Both series, broadcast to a common length
fn series(invocation: &Invocation<'_, '_>) -> ExpressionResult<(Vec<f64>, Vec<f64>)> {
    let (x, y) = (invocation.floats(0)?, invocation.floats(1)?);
    let shape = Broadcast::new(invocation.name, &[x.len(), y.len()])?;
    Ok((
        shape.indices(0).into_iter().map(|i| x[i]).collect(),
        shape.indices(1).into_iter().map(|i| y[i]).collect(),
    ))
}

fn draw(invocation: &mut Invocation<'_, '_>, figure: Figure) -> ExpressionResult<TypedColumn> {
    debug!("{} of {} points", figure.kind, figure.x.len());
    invocation.effects.render(&figure)?;
    done()
}

/// `plotLine(x, y)`
pub fn plot_line(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (x, y) = series(invocation)?;
    let figure = Figure::line(invocation.expression, x, y);
    draw(invocation, figure)
}

/// `plotXY(x, y)`
pub fn plot_xy(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let (x, y) = series(invocation)?;
    let figure = Figure::scatter(invocation.expression, x, y);
    draw(invocation, figure)
}

/// `histogram(x, bins)`
pub fn histogram(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let bins = count_arg(invocation, 1, 1)?;
    let values = invocation.floats(0)?;
    let figure = Figure::histogram(invocation.expression, &values, bins);
    draw(invocation, figure)
}

/// `setPlotDim(width, height)`: size of the plots that follow
pub fn set_plot_dim(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let width = count_arg(invocation, 0, 1)?;
    let height = count_arg(invocation, 1, 1)?;
    invocation.effects.layout.width = width;
    invocation.effects.layout.height = height;
    done()
}
