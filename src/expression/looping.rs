//! Repeated evaluation of assignment bodies over an integer range.

use crate::column::TypedColumn;
use crate::expression::eval::Evaluator;
use crate::expression::node::OpNode;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::pipeline::{Pipeline, PipelineAdapter};
use log::{debug, info, warn};
use std::str::FromStr;

/// `variable` takes every integer in `start..end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSpec {
    pub variable: String,
    pub start: i64,
    pub end: i64,
}

impl LoopSpec {
    pub fn new(variable: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            variable: variable.into(),
            start,
            end,
        }
    }
}

/// Parses `name:start:end`
impl FromStr for LoopSpec {
    type Err = ExpressionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = text.split(':').map(str::trim).collect();
        let [variable, start, end] = parts.as_slice() else {
            return Err(ExpressionError::invalid(text, "expected name:start:end"));
        };
        if variable.is_empty() {
            return Err(ExpressionError::invalid(text, "missing loop variable"));
        }
        let bound = |s: &str| {
            s.parse::<i64>()
                .map_err(|_| ExpressionError::invalid(text, format!("'{}' is not an integer", s)))
        };
        Ok(Self::new(*variable, bound(*start)?, bound(*end)?))
    }
}

/// For each value of the loop variable, evaluate every body with the
/// variable pinned and store the result in the matching target field.
///
/// Iterations run strictly in order, so a body can read the field written
/// by the previous iteration. Pins are released when the loop ends, whether
/// or not it succeeded.
pub fn run_loop(
    evaluator: &mut Evaluator<'_>,
    spec: &LoopSpec,
    bodies: &mut [OpNode],
    targets: &[String],
    pipeline: &mut dyn Pipeline,
) -> ExpressionResult<()> {
    if bodies.len() != targets.len() {
        return Err(ExpressionError::invalid(
            &spec.variable,
            format!("{} loop bodies for {} targets", bodies.len(), targets.len()),
        ));
    }
    if pipeline.has_field(&spec.variable) {
        warn!(
            "loop variable {} shadows a pipeline field of the same name",
            spec.variable
        );
    }
    info!(
        "looping {} over {}..{} ({} bodies)",
        spec.variable,
        spec.start,
        spec.end,
        bodies.len()
    );

    let result = iterate(evaluator, spec, bodies, targets, pipeline);
    bodies.iter_mut().for_each(OpNode::release_pins);
    result
}

fn iterate(
    evaluator: &mut Evaluator<'_>,
    spec: &LoopSpec,
    bodies: &mut [OpNode],
    targets: &[String],
    pipeline: &mut dyn Pipeline,
) -> ExpressionResult<()> {
    let renormalize = evaluator.config().renormalize;
    for i in spec.start..spec.end {
        let value = TypedColumn::Int64(vec![i]);
        for (body, target) in bodies.iter_mut().zip(targets) {
            body.pin_leaves(&spec.variable, &value);
            evaluator.evaluate(body, &*pipeline)?;
            PipelineAdapter::new(pipeline, renormalize).replace_result(target, body)?;
        }
        debug!("{} = {} done", spec.variable, i);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::builder::parse;
    use crate::pipeline::MemoryPipeline;

    fn column(pipeline: &MemoryPipeline, name: &str) -> TypedColumn {
        pipeline.get_column(name).unwrap().0
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!("k:0:5".parse::<LoopSpec>().unwrap(), LoopSpec::new("k", 0, 5));
        assert_eq!(" i : -2 : 2 ".parse::<LoopSpec>().unwrap(), LoopSpec::new("i", -2, 2));
        assert!("k:0".parse::<LoopSpec>().is_err());
        assert!("k:a:5".parse::<LoopSpec>().is_err());
        assert!(":0:5".parse::<LoopSpec>().is_err());
    }

    #[test]
    fn test_loop_accumulates() {
        let mut pipeline =
            MemoryPipeline::from_columns([("acc", TypedColumn::scalar_float(0.0))]).unwrap();
        let mut bodies = vec![parse("acc+k").unwrap(), parse("k*k").unwrap()];
        let targets = vec!["acc".to_string(), "square".to_string()];
        let mut evaluator = Evaluator::new();
        run_loop(
            &mut evaluator,
            &LoopSpec::new("k", 0, 4),
            &mut bodies,
            &targets,
            &mut pipeline,
        )
        .unwrap();

        assert_eq!(column(&pipeline, "acc"), TypedColumn::scalar_float(6.0));
        assert_eq!(column(&pipeline, "square"), TypedColumn::scalar_float(9.0));
        assert!(!bodies[0].children[1].hold_override);
    }

    #[test]
    fn test_loop_variable_shadows_field() {
        let mut pipeline = MemoryPipeline::from_columns([(
            "k",
            TypedColumn::scalar_float(100.0),
        )])
        .unwrap();
        let mut bodies = vec![parse("-k").unwrap()];
        let targets = vec!["out".to_string()];
        run_loop(
            &mut Evaluator::new(),
            &LoopSpec::new("k", 2, 3),
            &mut bodies,
            &targets,
            &mut pipeline,
        )
        .unwrap();
        assert_eq!(column(&pipeline, "out"), TypedColumn::Int64(vec![-2]));
    }

    #[test]
    fn test_loop_checks_targets_and_releases_pins() {
        let mut pipeline = MemoryPipeline::new();
        let mut bodies = vec![parse("k").unwrap()];
        let err = run_loop(
            &mut Evaluator::new(),
            &LoopSpec::new("k", 0, 1),
            &mut bodies,
            &[],
            &mut pipeline,
        )
        .unwrap_err();
        assert_eq!(err.category(), crate::expression::ErrorCategory::Parse);

        let mut bodies = vec![parse("k/0").unwrap()];
        let targets = vec!["x".to_string()];
        assert!(run_loop(
            &mut Evaluator::new(),
            &LoopSpec::new("k", 0, 1),
            &mut bodies,
            &targets,
            &mut pipeline,
        )
        .is_err());
        assert!(!bodies[0].children[0].hold_override);
    }
}
