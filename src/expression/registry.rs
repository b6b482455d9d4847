//! Function descriptors and the registry the tree builder resolves names against.

use crate::column::{DataKind, TypedColumn};
use crate::expression::functions::{
    convert, cumulative, dates, finance, math, output, positional, strings, summary, Invocation,
};
use crate::expression::ExpressionResult;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Declared kind of a function argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Float64, Int32 or Int64
    Numeric,
    String,
    Timestamp,
    Any,
}

impl ArgKind {
    pub fn accepts(&self, kind: DataKind) -> bool {
        match self {
            ArgKind::Numeric => kind.is_numeric(),
            ArgKind::String => kind == DataKind::String,
            ArgKind::Timestamp => kind == DataKind::Timestamp,
            ArgKind::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::Numeric => "numeric",
            ArgKind::String => "String",
            ArgKind::Timestamp => "Timestamp",
            ArgKind::Any => "any",
        }
    }
}

/// Whether a function yields one value per row or one value per column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Row,
    Reduction,
}

pub type FunctionImpl = fn(&mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn>;

/// How the evaluator runs a function
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Evaluate every argument, check kinds, then call the implementation
    Eager(FunctionImpl),
    /// Evaluate the first argument; if it references a missing field,
    /// evaluate the second instead
    Fallback,
}

/// Signature and implementation of one built-in function
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub name: &'static str,
    /// Declared argument kinds. Empty means variadic: no arity check.
    pub args: &'static [ArgKind],
    /// `None` when the result kind follows the arguments
    pub returns: Option<DataKind>,
    pub level: Level,
    pub strategy: Strategy,
}

impl FunctionDescriptor {
    pub fn is_variadic(&self) -> bool {
        self.args.is_empty()
    }
}

/// Name → descriptor table
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Arc<FunctionDescriptor>>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in function
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Process-wide built-in registry, built on first use
    pub fn shared() -> &'static FunctionRegistry {
        static SHARED: OnceLock<FunctionRegistry> = OnceLock::new();
        SHARED.get_or_init(FunctionRegistry::builtin)
    }

    /// Add or replace a function
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        self.functions.insert(descriptor.name, Arc::new(descriptor));
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Function names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

const N: ArgKind = ArgKind::Numeric;
const S: ArgKind = ArgKind::String;
const T: ArgKind = ArgKind::Timestamp;
const A: ArgKind = ArgKind::Any;

fn row(
    name: &'static str,
    args: &'static [ArgKind],
    returns: Option<DataKind>,
    implementation: FunctionImpl,
) -> FunctionDescriptor {
    FunctionDescriptor {
        name,
        args,
        returns,
        level: Level::Row,
        strategy: Strategy::Eager(implementation),
    }
}

fn reduction(
    name: &'static str,
    args: &'static [ArgKind],
    returns: Option<DataKind>,
    implementation: FunctionImpl,
) -> FunctionDescriptor {
    FunctionDescriptor {
        name,
        args,
        returns,
        level: Level::Reduction,
        strategy: Strategy::Eager(implementation),
    }
}

fn builtin_descriptors() -> Vec<FunctionDescriptor> {
    use DataKind::{Float64, Int64, String as Str, Timestamp};

    vec![
        // Elementwise math
        row("abs", &[N], Some(Float64), math::abs),
        row("exp", &[N], Some(Float64), math::exp),
        row("log", &[N], Some(Float64), math::log),
        row("sqrt", &[N], Some(Float64), math::sqrt),
        row("floor", &[N], Some(Float64), math::floor),
        row("ceil", &[N], Some(Float64), math::ceil),
        row("maxE", &[N, N], Some(Float64), math::max_elementwise),
        row("minE", &[N, N], Some(Float64), math::min_elementwise),
        // Selection, shifts and positions
        row("if", &[N, A, A], None, positional::select),
        row("lag", &[A, A], None, positional::lag),
        row("lead", &[A, A], None, positional::lead),
        row("row", &[A], Some(Int64), positional::row_number),
        row("index", &[A, N], None, positional::gather),
        row("range", &[N, N], Some(Int64), positional::range),
        FunctionDescriptor {
            name: "exist",
            args: &[A, A],
            returns: None,
            level: Level::Row,
            strategy: Strategy::Fallback,
        },
        // Exclusive cumulative aggregates
        row("cumeBefore", &[N], Some(Float64), cumulative::sum_before),
        row("cumeAfter", &[N], Some(Float64), cumulative::sum_after),
        row("cumeProdBefore", &[N], Some(Float64), cumulative::product_before),
        row("cumeProdAfter", &[N], Some(Float64), cumulative::product_after),
        row("cumeCountBefore", &[N], Some(Float64), cumulative::count_before),
        row("cumeCountAfter", &[N], Some(Float64), cumulative::count_after),
        // Coercions
        row("toFloat", &[A], Some(Float64), convert::to_float),
        row("toInt", &[A], Some(Int64), convert::to_int),
        row("toString", &[A], Some(Str), convert::to_string),
        row("toDate", &[A], Some(Timestamp), convert::to_date),
        // Dates
        row("dateAdd", &[T, N], Some(Timestamp), dates::add_months),
        row("dateDiff", &[T, T, S], Some(Int64), dates::difference),
        row("year", &[T], Some(Int64), dates::year),
        row("month", &[T], Some(Int64), dates::month),
        row("day", &[T], Some(Int64), dates::day),
        // Strings
        row("substr", &[S, N, N], Some(Str), strings::substring),
        row("strPos", &[S, S], Some(Int64), strings::position),
        row("strCount", &[S, S], Some(Int64), strings::count),
        row("strLen", &[S], Some(Int64), strings::length),
        row("upper", &[S], Some(Str), strings::upper),
        row("lower", &[S], Some(Str), strings::lower),
        // Summaries
        reduction("sum", &[N], Some(Float64), summary::sum),
        reduction("mean", &[N], Some(Float64), summary::mean),
        reduction("min", &[N], Some(Float64), summary::min),
        reduction("max", &[N], Some(Float64), summary::max),
        reduction("std", &[N], Some(Float64), summary::std),
        reduction("count", &[A], Some(Int64), summary::count),
        reduction("median", &[N], Some(Float64), summary::median),
        reduction("r2", &[N, N], Some(Float64), summary::r_squared),
        reduction("sse", &[N, N], Some(Float64), summary::sse),
        reduction("mad", &[N, N], Some(Float64), summary::mad),
        // Finance
        reduction("npv", &[N, N], Some(Float64), finance::npv),
        reduction("irr", &[N, N], Some(Float64), finance::irr),
        // Side effects
        reduction("print", &[], Some(Float64), output::print),
        reduction("printIf", &[A, N], Some(Float64), output::print_if),
        reduction("plotLine", &[N, N], Some(Float64), output::plot_line),
        reduction("plotXY", &[N, N], Some(Float64), output::plot_xy),
        reduction("histogram", &[N, N], Some(Float64), output::histogram),
        reduction("setPlotDim", &[N, N], Some(Float64), output::set_plot_dim),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = FunctionRegistry::builtin();
        assert!(registry.len() >= 40);
        assert!(registry.contains("irr"));
        assert!(registry.contains("cumeBefore"));
        assert!(!registry.contains("nope"));

        let lag = registry.get("lag").unwrap();
        assert_eq!(lag.args.len(), 2);
        assert_eq!(lag.level, Level::Row);
        assert_eq!(registry.get("npv").unwrap().level, Level::Reduction);
        assert!(registry.get("print").unwrap().is_variadic());
        assert!(matches!(
            registry.get("exist").unwrap().strategy,
            Strategy::Fallback
        ));
    }

    #[test]
    fn test_names_are_identifiers() {
        // The tree builder only recognizes names that start with a letter
        for name in FunctionRegistry::builtin().names() {
            let mut chars = name.chars();
            assert!(chars.next().is_some_and(|c| c.is_ascii_alphabetic()), "{}", name);
            assert!(chars.all(|c| c.is_ascii_alphanumeric() || c == '_'), "{}", name);
        }
    }

    #[test]
    fn test_arg_kind_accepts() {
        assert!(ArgKind::Numeric.accepts(DataKind::Int32));
        assert!(!ArgKind::Numeric.accepts(DataKind::String));
        assert!(ArgKind::Any.accepts(DataKind::Timestamp));
        assert!(!ArgKind::Timestamp.accepts(DataKind::String));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = FunctionRegistry::new();
        assert!(registry.is_empty());
        registry.register(row("double", &[N], Some(DataKind::Float64), math::abs));
        assert_eq!(registry.names(), vec!["double"]);
        assert!(FunctionRegistry::shared().contains("sum"));
    }
}
