//! Expression tree nodes.

use crate::column::TypedColumn;
use crate::expression::operator::BinaryOperator;
use crate::expression::registry::FunctionDescriptor;
use crate::pipeline::Role;
use std::sync::Arc;

/// What an interior node applies to its children
#[derive(Debug, Clone)]
pub enum Functor {
    Operator(BinaryOperator),
    Function(Arc<FunctionDescriptor>),
}

impl Functor {
    pub fn name(&self) -> &str {
        match self {
            Functor::Operator(op) => op.as_str(),
            Functor::Function(desc) => desc.name,
        }
    }
}

/// Syntactic classification of a leaf's text
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf<'a> {
    Number(f64),
    Text(&'a str),
    Field(&'a str),
}

/// Expression tree node.
///
/// The tree shape is fixed once built. `computed_value`, `inferred_role` and
/// `hold_override` are evaluation state and are overwritten by every
/// evaluation, so a tree must not be evaluated by two callers at once; hand
/// each caller its own [`OpNode::deep_copy`].
#[derive(Debug, Clone)]
pub struct OpNode {
    /// Source text of this node, whitespace stripped
    pub expression: String,
    /// `None` for leaves
    pub functor: Option<Functor>,
    /// Negate the result after evaluation
    pub negate: bool,
    pub children: Vec<OpNode>,
    /// `None` until evaluated
    pub inferred_role: Option<Role>,
    pub computed_value: Option<TypedColumn>,
    /// Keep `computed_value` and skip evaluation of this node
    pub hold_override: bool,
}

impl OpNode {
    /// Create a leaf node
    pub fn leaf(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            functor: None,
            negate: false,
            children: Vec::new(),
            inferred_role: None,
            computed_value: None,
            hold_override: false,
        }
    }

    /// Create a binary operator node
    pub fn binary(
        expression: impl Into<String>,
        op: BinaryOperator,
        left: OpNode,
        right: OpNode,
    ) -> Self {
        Self {
            functor: Some(Functor::Operator(op)),
            children: vec![left, right],
            ..Self::leaf(expression)
        }
    }

    /// Create a function call node
    pub fn call(
        expression: impl Into<String>,
        descriptor: Arc<FunctionDescriptor>,
        args: Vec<OpNode>,
    ) -> Self {
        Self {
            functor: Some(Functor::Function(descriptor)),
            children: args,
            ..Self::leaf(expression)
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.functor.is_none()
    }

    /// Classify a leaf: numbers must start with a digit or `.`, anything with
    /// a single quote is a string literal, everything else names a field.
    pub fn leaf_kind(&self) -> Leaf<'_> {
        let text = self.expression.as_str();
        let starts_numeric = text
            .bytes()
            .next()
            .map(|b| b.is_ascii_digit() || b == b'.')
            .unwrap_or(false);
        if starts_numeric {
            if let Ok(value) = text.parse::<f64>() {
                return Leaf::Number(value);
            }
        }
        if text.contains('\'') {
            return Leaf::Text(text.trim_matches('\''));
        }
        Leaf::Field(text)
    }

    /// The value computed by the last evaluation
    pub fn value(&self) -> Option<&TypedColumn> {
        self.computed_value.as_ref()
    }

    /// Deep copy of the whole tree. Descriptors are immutable and shared;
    /// everything else, including computed columns, is copied.
    pub fn deep_copy(&self) -> OpNode {
        self.clone()
    }

    /// Clear evaluation state in the whole tree so it can be evaluated afresh
    pub fn reset(&mut self) {
        self.computed_value = None;
        self.inferred_role = None;
        self.hold_override = false;
        self.children.iter_mut().for_each(OpNode::reset);
    }

    /// Pin a value on this node; evaluation will keep it
    pub fn pin(&mut self, value: TypedColumn) {
        self.computed_value = Some(value);
        self.hold_override = true;
    }

    /// Pin `value` on every leaf whose text equals `name`. Returns how many were pinned.
    pub fn pin_leaves(&mut self, name: &str, value: &TypedColumn) -> usize {
        if self.is_leaf() {
            if self.expression == name {
                // Held nodes skip evaluation, negation included
                let mut value = value.clone();
                if self.negate {
                    value.negate();
                }
                self.pin(value);
                return 1;
            }
            return 0;
        }
        self.children
            .iter_mut()
            .map(|child| child.pin_leaves(name, value))
            .sum()
    }

    /// Release every pin in the tree
    pub fn release_pins(&mut self) {
        self.hold_override = false;
        self.children.iter_mut().for_each(OpNode::release_pins);
    }

    /// Count of nodes in the tree
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OpNode::size).sum::<usize>()
    }
}
