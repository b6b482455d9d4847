//! colexpr - evaluate column expressions from the command line

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use colexpr::column::{parse_timestamp, TypedColumn};
use colexpr::expression::{parse, run_loop, EvalConfig, Evaluator, LoopSpec, OpNode};
use colexpr::pipeline::{MemoryPipeline, Pipeline, PipelineAdapter, Role};
use colexpr::render::TextSink;
use log::info;

/// colexpr - evaluate column expressions over an in-memory pipeline
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Expressions to evaluate and print
    expressions: Vec<String>,

    /// Pipeline field as name=v1,v2,... (numbers, dates or text)
    #[arg(short, long = "field", value_name = "NAME=VALUES")]
    fields: Vec<String>,

    /// Assignment target=expression, run before the expressions
    #[arg(short, long = "assign", value_name = "TARGET=EXPR")]
    assigns: Vec<String>,

    /// Run the assignments once per value of VAR in START..END
    #[arg(short, long = "loop", value_name = "VAR:START:END")]
    loop_spec: Option<LoopSpec>,

    /// Rows shown by print(x)
    #[arg(long, default_value = "10")]
    print_rows: usize,

    /// Record normalization statistics for appended fields
    #[arg(long)]
    renormalize: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut pipeline = MemoryPipeline::new();
    for spec in &args.fields {
        let (name, column) = parse_field(spec)?;
        let role = Role::for_kind(column.kind());
        pipeline
            .append_column(name, column, role, args.renormalize)
            .with_context(|| format!("Failed to add field {}", name))?;
    }
    info!(
        "pipeline has {} fields, {} rows",
        pipeline.field_names().len(),
        pipeline.row_count()
    );

    let config = EvalConfig {
        print_rows: args.print_rows,
        renormalize: args.renormalize,
        ..EvalConfig::default()
    };
    let mut sink = TextSink::new(std::io::stdout());
    let mut evaluator = Evaluator::with_config(config).with_render_sink(&mut sink);

    let mut targets = Vec::new();
    let mut bodies = Vec::new();
    for assign in &args.assigns {
        let (target, body) = parse_assignment(assign)?;
        targets.push(target);
        bodies.push(body);
    }
    match &args.loop_spec {
        Some(spec) => run_loop(&mut evaluator, spec, &mut bodies, &targets, &mut pipeline)
            .context("Loop failed")?,
        None => {
            for (target, body) in targets.iter().zip(bodies.iter_mut()) {
                evaluator
                    .evaluate(body, &pipeline)
                    .with_context(|| format!("Failed to evaluate {}", body.expression))?;
                PipelineAdapter::new(&mut pipeline, args.renormalize)
                    .replace_result(target, body)
                    .with_context(|| format!("Failed to assign {}", target))?;
            }
        }
    }

    for text in &args.expressions {
        let mut tree = parse(text).with_context(|| format!("Failed to parse {}", text))?;
        evaluator
            .evaluate(&mut tree, &pipeline)
            .with_context(|| format!("Failed to evaluate {}", text))?;
        if let Some(value) = tree.value() {
            println!("{} = {}", text, value);
        }
    }

    Ok(())
}

/// `name=v1,v2,...`: all numbers give Float64, all dates Timestamp, anything else String
fn parse_field(spec: &str) -> Result<(&str, TypedColumn)> {
    let Some((name, values)) = spec.split_once('=') else {
        bail!("Field {} is not of the form name=v1,v2", spec);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Field {} has no name", spec);
    }
    let values: Vec<&str> = values.split(',').map(str::trim).collect();

    let numbers: Option<Vec<f64>> = values.iter().map(|v| v.parse().ok()).collect();
    if let Some(numbers) = numbers {
        return Ok((name, TypedColumn::Float64(numbers)));
    }
    let dates: Option<Vec<_>> = values.iter().map(|v| parse_timestamp(v)).collect();
    if let Some(dates) = dates {
        return Ok((name, TypedColumn::Timestamp(dates)));
    }
    Ok((
        name,
        TypedColumn::String(values.iter().map(|v| v.to_string()).collect()),
    ))
}

/// `target=expression`; the first `=` not part of a comparison splits
fn parse_assignment(spec: &str) -> Result<(String, OpNode)> {
    let Some((target, body)) = spec.split_once('=') else {
        bail!("Assignment {} is not of the form target=expression", spec);
    };
    let target = target.trim();
    if target.is_empty() || body.starts_with('=') {
        bail!("Assignment {} has no target", spec);
    }
    let body = parse(body).with_context(|| format!("Failed to parse {}", body))?;
    Ok((target.to_string(), body))
}
