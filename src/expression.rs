//! Expression trees over typed columns.
//!
//! This module provides:
//! - Parsing of infix expression text into [`OpNode`] trees
//! - A registry of built-in row-level and reduction functions
//! - Evaluation of trees against a [`Pipeline`](crate::pipeline::Pipeline)
//! - A loop driver that re-evaluates assignments over an integer range

pub mod broadcast;
pub mod builder;
pub mod error;
pub mod eval;
pub mod functions;
pub mod looping;
pub mod node;
pub mod operator;
pub mod registry;
pub mod scanner;

pub use builder::{build_tree, parse};
pub use error::{ErrorCategory, ExpressionError, ExpressionResult};
pub use eval::{evaluate_binary_op, evaluate_expression, EvalConfig, Evaluator};
pub use looping::{run_loop, LoopSpec};
pub use node::{Functor, OpNode};
pub use operator::{BinaryOperator, PrecedenceClass};
pub use registry::{FunctionDescriptor, FunctionRegistry, Strategy};
