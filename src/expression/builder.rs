//! Recursive-descent construction of expression trees.
//!
//! Text is split at its lowest-precedence top-level operator, tried class by
//! class from logical up to power. Text with no top-level operator is either a
//! function call or a leaf. Subtraction is built as addition of a negated
//! right operand, so `a-b-c` evaluates as `(a-b)+(-c)`.

use crate::expression::node::OpNode;
use crate::expression::operator::BinaryOperator;
use crate::expression::registry::FunctionRegistry;
use crate::expression::scanner::{
    check_balanced, find_any_operator, function_call, split_arguments, strip_outer_parens,
    strip_whitespace, Split,
};
use crate::expression::{ExpressionError, ExpressionResult};
use log::debug;

/// Build a tree resolving function names against `registry`
pub fn build_tree(text: &str, registry: &FunctionRegistry) -> ExpressionResult<OpNode> {
    let stripped = strip_whitespace(text);
    check_balanced(&stripped)?;
    let tree = build_node(&stripped, registry)?;
    debug!("built {} ({} nodes)", stripped, tree.size());
    Ok(tree)
}

/// Build a tree against the built-in functions
pub fn parse(text: &str) -> ExpressionResult<OpNode> {
    build_tree(text, FunctionRegistry::shared())
}

fn build_node(text: &str, registry: &FunctionRegistry) -> ExpressionResult<OpNode> {
    let text = strip_outer_parens(text);
    if text.is_empty() {
        return Err(ExpressionError::invalid(text, "empty expression"));
    }

    if let Some(rest) = text.strip_prefix('+') {
        return build_node(rest, registry);
    }
    if let Some(rest) = text.strip_prefix('-') {
        let splits_first = find_any_operator(text)
            .map(|split| split.operator.class().binds_below_negation())
            .unwrap_or(false);
        if !splits_first {
            let mut node = build_node(rest, registry)?;
            node.negate = !node.negate;
            return Ok(node);
        }
    }

    if let Some(split) = find_any_operator(text) {
        return build_binary(text, split, registry);
    }
    if let Some((name, body)) = function_call(text) {
        return build_call(text, name, body, registry);
    }
    check_leaf(text)?;
    Ok(OpNode::leaf(text))
}

fn build_binary(text: &str, split: Split<'_>, registry: &FunctionRegistry) -> ExpressionResult<OpNode> {
    let Split {
        operator,
        left,
        right,
    } = split;
    if left.is_empty() || right.is_empty() {
        return Err(ExpressionError::invalid(
            text,
            format!("missing operand for {}", operator.as_str()),
        ));
    }
    let left = build_node(left, registry)?;
    let (operator, right) = match operator {
        BinaryOperator::Sub => (
            BinaryOperator::Add,
            build_node(&format!("-{}", right), registry)?,
        ),
        other => (other, build_node(right, registry)?),
    };
    Ok(OpNode::binary(text, operator, left, right))
}

fn build_call(
    text: &str,
    name: &str,
    body: &str,
    registry: &FunctionRegistry,
) -> ExpressionResult<OpNode> {
    let descriptor = registry
        .get(name)
        .ok_or_else(|| ExpressionError::UnknownFunction {
            name: name.to_string(),
        })?;
    let args = split_arguments(body);
    if !descriptor.is_variadic() && args.len() != descriptor.args.len() {
        return Err(ExpressionError::FunctionArgumentCount {
            function: name.to_string(),
            expected: descriptor.args.len(),
            actual: args.len(),
        });
    }
    let children = args
        .into_iter()
        .map(|arg| build_node(arg, registry))
        .collect::<ExpressionResult<Vec<_>>>()?;
    Ok(OpNode::call(text, descriptor, children))
}

/// Reject leaf text that is neither a number, a quoted literal nor a name
fn check_leaf(text: &str) -> ExpressionResult<()> {
    if text.contains(['(', ')']) {
        return Err(ExpressionError::invalid(text, "unexpected parenthesis"));
    }
    if text.contains('\'') {
        let quoted = text.len() >= 2
            && text.starts_with('\'')
            && text.ends_with('\'')
            && !text[1..text.len() - 1].contains('\'');
        if !quoted {
            return Err(ExpressionError::invalid(text, "malformed string literal"));
        }
        return Ok(());
    }
    let starts_numeric = text
        .bytes()
        .next()
        .map(|b| b.is_ascii_digit() || b == b'.')
        .unwrap_or(false);
    if starts_numeric {
        if text.parse::<f64>().is_err() {
            return Err(ExpressionError::invalid(text, "malformed number"));
        }
        return Ok(());
    }
    // Operator characters left in a name mean a dangling operator
    if text.bytes().any(|b| b"+-*/^<>=!&|,".contains(&b)) {
        return Err(ExpressionError::invalid(text, "missing operand"));
    }
    Ok(())
}
