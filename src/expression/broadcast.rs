//! Broadcasting of operands with lengths 1 and N.
//!
//! Operands of length 1 are reused for every output row; every other operand
//! must have the common length. Two non-scalar operands of different lengths
//! are always an error, never truncated.

use crate::expression::{ExpressionError, ExpressionResult};

/// Output length and per-operand strides for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    len: usize,
    strides: Vec<usize>,
}

impl Broadcast {
    /// Compute the broadcast shape of operands with the given lengths
    pub fn new(context: &str, lengths: &[usize]) -> ExpressionResult<Self> {
        let len = lengths.iter().copied().max().unwrap_or(0);
        if lengths.iter().any(|&l| l != 1 && l != len) {
            return Err(ExpressionError::LengthMismatch {
                context: context.to_string(),
                lengths: lengths.to_vec(),
            });
        }
        let strides = lengths.iter().map(|&l| usize::from(l != 1)).collect();
        Ok(Self { len, strides })
    }

    /// Number of output rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position in `operand` feeding output row `row`
    #[inline]
    pub fn index(&self, operand: usize, row: usize) -> usize {
        row * self.strides[operand]
    }

    /// Positions in `operand` for every output row, for use with `TypedColumn::take`
    pub fn indices(&self, operand: usize) -> Vec<usize> {
        (0..self.len).map(|row| self.index(operand, row)).collect()
    }
}

/// Apply `f` row by row over broadcast numeric operands.
///
/// `f` receives one value per operand for each output row.
pub fn map_floats<F>(context: &str, operands: &[&[f64]], mut f: F) -> ExpressionResult<Vec<f64>>
where
    F: FnMut(&[f64]) -> ExpressionResult<f64>,
{
    let lengths: Vec<usize> = operands.iter().map(|o| o.len()).collect();
    let shape = Broadcast::new(context, &lengths)?;
    let mut row = vec![0.0; operands.len()];
    let mut out = Vec::with_capacity(shape.len());
    for i in 0..shape.len() {
        for (k, operand) in operands.iter().enumerate() {
            row[k] = operand[shape.index(k, i)];
        }
        out.push(f(&row)?);
    }
    Ok(out)
}
