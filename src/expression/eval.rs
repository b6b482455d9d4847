//! Expression evaluation implementation.

use crate::column::{parse_timestamp, DataKind, TypedColumn};
use crate::expression::broadcast::{map_floats, Broadcast};
use crate::expression::builder::parse;
use crate::expression::functions::{is_true, truth, Effects, Invocation};
use crate::expression::node::{Functor, Leaf, OpNode};
use crate::expression::operator::{BinaryOperator, PrecedenceClass};
use crate::expression::registry::{FunctionDescriptor, Level, Strategy};
use crate::expression::{ErrorCategory, ExpressionError, ExpressionResult};
use crate::pipeline::{fetch, Pipeline, Role};
use crate::render::{LayoutOptions, RenderSink};
use chrono::NaiveDateTime;
use log::{debug, trace};
use std::cmp::Ordering;
use std::io::Write;

/// Evaluation settings
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    /// Starting rate for the `irr` search
    pub irr_initial_guess: f64,
    /// Restarts of the `irr` search before giving up
    pub irr_max_iterations: usize,
    /// Accepted `|npv(r) - cost|`, relative to `max(|cost|, 1)`
    pub irr_tolerance: f64,
    /// Rows shown by `print(x)` without an explicit count
    pub print_rows: usize,
    /// Passed to the pipeline when results are appended
    pub renormalize: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            irr_initial_guess: 0.05,
            irr_max_iterations: 40,
            irr_tolerance: 1e-4,
            print_rows: 10,
            renormalize: false,
        }
    }
}

/// Evaluates expression trees against a pipeline.
///
/// Evaluation writes `computed_value` and `inferred_role` into every node it
/// visits. A failed evaluation leaves already evaluated children populated;
/// call [`OpNode::reset`] before evaluating the same tree again if that matters.
pub struct Evaluator<'s> {
    config: EvalConfig,
    effects: Effects<'s>,
}

impl<'s> Evaluator<'s> {
    /// Create an evaluator with default settings, printing to stdout
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self {
            config,
            effects: Effects::new(),
        }
    }

    /// Send figures from the plotting functions to `sink`
    pub fn with_render_sink(mut self, sink: &'s mut dyn RenderSink) -> Self {
        self.effects.set_sink(sink);
        self
    }

    /// Send output of the printing functions to `out`
    pub fn with_output(mut self, out: &'s mut dyn Write) -> Self {
        self.effects.set_output(out);
        self
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Plot layout as last changed by `setPlotDim`
    pub fn layout(&self) -> &LayoutOptions {
        &self.effects.layout
    }

    /// Evaluate `node` and all of its children, bottom up
    pub fn evaluate(&mut self, node: &mut OpNode, pipeline: &dyn Pipeline) -> ExpressionResult<()> {
        if node.hold_override {
            trace!("keeping pinned value of {}", node.expression);
            return Ok(());
        }

        let (mut value, role) = match node.functor.clone() {
            None => Self::evaluate_leaf(node, pipeline)?,
            Some(Functor::Operator(op)) => {
                for child in node.children.iter_mut() {
                    self.evaluate(child, pipeline)?;
                }
                let value = match node.children.as_slice() {
                    [left, right] => evaluate_binary_op(op, evaluated(left)?, evaluated(right)?)?,
                    _ => {
                        return Err(ExpressionError::invalid(
                            &node.expression,
                            format!("{} needs two operands", op.as_str()),
                        ))
                    }
                };
                let role = Role::for_kind(value.kind());
                (value, role)
            }
            Some(Functor::Function(descriptor)) => match descriptor.strategy {
                Strategy::Eager(_) => {
                    let value = self.evaluate_call(node, &descriptor, pipeline)?;
                    let role = Role::for_kind(value.kind());
                    (value, role)
                }
                Strategy::Fallback => self.evaluate_fallback(node, pipeline)?,
            },
        };

        if node.negate {
            value.negate();
        }
        trace!("{} = {}", node.expression, value);
        node.inferred_role = Some(role);
        node.computed_value = Some(value);
        Ok(())
    }

    fn evaluate_leaf(node: &OpNode, pipeline: &dyn Pipeline) -> ExpressionResult<(TypedColumn, Role)> {
        match node.leaf_kind() {
            Leaf::Number(value) => Ok((TypedColumn::scalar_float(value), Role::Continuous)),
            Leaf::Text(text) => Ok((TypedColumn::scalar_string(text), Role::Categorical)),
            Leaf::Field(name) => fetch(pipeline, name),
        }
    }

    fn evaluate_call(
        &mut self,
        node: &mut OpNode,
        descriptor: &FunctionDescriptor,
        pipeline: &dyn Pipeline,
    ) -> ExpressionResult<TypedColumn> {
        let Strategy::Eager(implementation) = descriptor.strategy else {
            return Err(ExpressionError::invalid(&node.expression, "not an eager function"));
        };
        for child in node.children.iter_mut() {
            self.evaluate(child, pipeline)?;
        }
        let values = node
            .children
            .iter()
            .map(evaluated)
            .collect::<ExpressionResult<Vec<_>>>()?;
        let coerced = check_arguments(descriptor, &values)?;
        let args = values
            .iter()
            .zip(&coerced)
            .map(|(value, coerced)| coerced.as_ref().unwrap_or(*value))
            .collect();

        let mut invocation = Invocation {
            name: descriptor.name,
            expression: &node.expression,
            args,
            config: &self.config,
            effects: &mut self.effects,
        };
        let value = implementation(&mut invocation)?;
        check_result(descriptor, value)
    }

    /// `exist(a, b)`: the value of `a`, or of `b` when `a` names a missing field
    fn evaluate_fallback(
        &mut self,
        node: &mut OpNode,
        pipeline: &dyn Pipeline,
    ) -> ExpressionResult<(TypedColumn, Role)> {
        let arity = node.children.len();
        let [primary, fallback] = node.children.as_mut_slice() else {
            return Err(ExpressionError::FunctionArgumentCount {
                function: node.expression.clone(),
                expected: 2,
                actual: arity,
            });
        };
        let chosen = match self.evaluate(primary, pipeline) {
            Ok(()) => primary,
            Err(err) if err.category() == ErrorCategory::Lookup => {
                debug!("{}: {}, using {}", node.expression, err, fallback.expression);
                self.evaluate(fallback, pipeline)?;
                fallback
            }
            Err(err) => return Err(err),
        };
        let value = evaluated(chosen)?.clone();
        let role = chosen
            .inferred_role
            .unwrap_or_else(|| Role::for_kind(value.kind()));
        Ok((value, role))
    }
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluated(node: &OpNode) -> ExpressionResult<&TypedColumn> {
    node.value()
        .ok_or_else(|| ExpressionError::invalid(&node.expression, "not evaluated"))
}

/// Reductions yield one value, and a declared result kind must match.
fn check_result(descriptor: &FunctionDescriptor, value: TypedColumn) -> ExpressionResult<TypedColumn> {
    if descriptor.level == Level::Reduction && value.len() != 1 {
        return Err(ExpressionError::LengthMismatch {
            context: format!("result of {}", descriptor.name),
            lengths: vec![value.len(), 1],
        });
    }
    match descriptor.returns {
        Some(kind) if kind != value.kind() => Err(ExpressionError::TypeMismatch {
            context: format!("result of {}", descriptor.name),
            expected: kind.to_string(),
            actual: value.kind(),
        }),
        _ => Ok(value),
    }
}

/// Check argument kinds against the descriptor. String arguments in a
/// Timestamp position are parsed as dates; the parsed columns are returned
/// in their argument's slot.
fn check_arguments(
    descriptor: &FunctionDescriptor,
    values: &[&TypedColumn],
) -> ExpressionResult<Vec<Option<TypedColumn>>> {
    let mut coerced = vec![None; values.len()];
    for (index, (kind, value)) in descriptor.args.iter().zip(values).enumerate() {
        if kind.accepts(value.kind()) {
            continue;
        }
        let mismatch = || ExpressionError::TypeMismatch {
            context: format!("argument {} of {}", index + 1, descriptor.name),
            expected: kind.as_str().to_string(),
            actual: value.kind(),
        };
        match (kind.accepts(DataKind::Timestamp), value.as_strings()) {
            (true, Some(strings)) => {
                coerced[index] = Some(TypedColumn::Timestamp(
                    parse_dates(strings).map_err(|_| mismatch())?,
                ))
            }
            _ => return Err(mismatch()),
        }
    }
    Ok(coerced)
}

fn parse_dates(values: &[String]) -> ExpressionResult<Vec<NaiveDateTime>> {
    values
        .iter()
        .map(|s| {
            parse_timestamp(s).ok_or_else(|| ExpressionError::TypeMismatch {
                context: format!("'{}' used as a date", s),
                expected: DataKind::Timestamp.to_string(),
                actual: DataKind::String,
            })
        })
        .collect()
}

/// Apply a binary operator to two columns, broadcasting length-1 operands.
///
/// Arithmetic on numeric columns yields Float64; `+` also concatenates
/// strings. Comparisons and logical operators yield Float64 `1`/`0`, and a
/// Timestamp compared with a String parses the String as a date.
pub fn evaluate_binary_op(
    op: BinaryOperator,
    left: &TypedColumn,
    right: &TypedColumn,
) -> ExpressionResult<TypedColumn> {
    let invalid = || ExpressionError::InvalidOperandTypes {
        operator: op.as_str().to_string(),
        left: left.kind(),
        right: right.kind(),
    };
    let context = op.as_str();

    match op.class() {
        PrecedenceClass::Logical => {
            let (l, r) = (
                left.as_floats().ok_or_else(invalid)?,
                right.as_floats().ok_or_else(invalid)?,
            );
            let and = op == BinaryOperator::And;
            map_floats(context, &[&*l, &*r], |v| {
                let (a, b) = (is_true(v[0]), is_true(v[1]));
                Ok(truth(if and { a && b } else { a || b }))
            })
            .map(TypedColumn::Float64)
        }
        PrecedenceClass::Comparison => {
            let test = comparison_test(op).ok_or_else(invalid)?;
            match (left, right) {
                (TypedColumn::String(l), TypedColumn::String(r)) => compare_slices(context, l, r, test),
                (TypedColumn::Timestamp(l), TypedColumn::Timestamp(r)) => {
                    compare_slices(context, l, r, test)
                }
                (TypedColumn::Timestamp(l), TypedColumn::String(r)) => {
                    compare_slices(context, l, &parse_dates(r)?, test)
                }
                (TypedColumn::String(l), TypedColumn::Timestamp(r)) => {
                    compare_slices(context, &parse_dates(l)?, r, test)
                }
                _ => match (left.as_floats(), right.as_floats()) {
                    (Some(l), Some(r)) => compare_slices(context, &l, &r, test),
                    _ => Err(invalid()),
                },
            }
        }
        PrecedenceClass::Additive | PrecedenceClass::Multiplicative | PrecedenceClass::Power => {
            if let (TypedColumn::String(l), TypedColumn::String(r)) = (left, right) {
                if op != BinaryOperator::Add {
                    return Err(invalid());
                }
                let shape = Broadcast::new(context, &[l.len(), r.len()])?;
                return Ok(TypedColumn::String(
                    (0..shape.len())
                        .map(|i| format!("{}{}", l[shape.index(0, i)], r[shape.index(1, i)]))
                        .collect(),
                ));
            }
            let (l, r) = (
                left.as_floats().ok_or_else(invalid)?,
                right.as_floats().ok_or_else(invalid)?,
            );
            map_floats(context, &[&*l, &*r], |v| arithmetic(op, v[0], v[1]))
                .map(TypedColumn::Float64)
        }
    }
}

fn arithmetic(op: BinaryOperator, a: f64, b: f64) -> ExpressionResult<f64> {
    match op {
        BinaryOperator::Add => Ok(a + b),
        BinaryOperator::Sub => Ok(a - b),
        BinaryOperator::Mul => Ok(a * b),
        BinaryOperator::Div => {
            if b == 0.0 {
                Err(ExpressionError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }
        BinaryOperator::Pow => Ok(a.powf(b)),
        other => Err(ExpressionError::invalid(
            other.as_str(),
            "not an arithmetic operator",
        )),
    }
}

/// Ordering test for a comparison operator. Unordered values (NaN) are only `!=`.
fn comparison_test(op: BinaryOperator) -> Option<fn(Option<Ordering>) -> bool> {
    let test: fn(Option<Ordering>) -> bool = match op {
        BinaryOperator::Eq => |o| o == Some(Ordering::Equal),
        BinaryOperator::Ne => |o| o != Some(Ordering::Equal),
        BinaryOperator::Lt => |o| o == Some(Ordering::Less),
        BinaryOperator::Le => |o| matches!(o, Some(Ordering::Less | Ordering::Equal)),
        BinaryOperator::Gt => |o| o == Some(Ordering::Greater),
        BinaryOperator::Ge => |o| matches!(o, Some(Ordering::Greater | Ordering::Equal)),
        _ => return None,
    };
    Some(test)
}

fn compare_slices<T: PartialOrd>(
    context: &str,
    left: &[T],
    right: &[T],
    test: fn(Option<Ordering>) -> bool,
) -> ExpressionResult<TypedColumn> {
    let shape = Broadcast::new(context, &[left.len(), right.len()])?;
    Ok(TypedColumn::Float64(
        (0..shape.len())
            .map(|i| {
                let ordering = left[shape.index(0, i)].partial_cmp(&right[shape.index(1, i)]);
                truth(test(ordering))
            })
            .collect(),
    ))
}

/// Parse `text` with the built-in functions and evaluate it against `pipeline`
pub fn evaluate_expression(text: &str, pipeline: &dyn Pipeline) -> ExpressionResult<TypedColumn> {
    let mut tree = parse(text)?;
    Evaluator::new().evaluate(&mut tree, pipeline)?;
    evaluated(&tree).cloned()
}
