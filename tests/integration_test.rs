use colexpr::column::TypedColumn;
use colexpr::expression::{
    evaluate_expression, parse, run_loop, ErrorCategory, EvalConfig, Evaluator, LoopSpec,
};
use colexpr::pipeline::{MemoryPipeline, Pipeline, PipelineAdapter};
use colexpr::render::{Figure, FigureKind, LayoutOptions, RenderSink};
use std::thread;

fn floats(values: &[f64]) -> TypedColumn {
    TypedColumn::Float64(values.to_vec())
}

fn first(column: &TypedColumn) -> f64 {
    column.as_floats().unwrap()[0]
}

fn scenario_pipeline() -> MemoryPipeline {
    MemoryPipeline::from_columns([("c", floats(&[1.0, 2.0])), ("D", floats(&[3.0, -4.0]))])
        .unwrap()
}

#[test]
fn test_scenario_arithmetic_and_selection() {
    let pipeline = scenario_pipeline();
    assert_eq!(evaluate_expression("c+D", &pipeline).unwrap(), floats(&[4.0, -2.0]));
    assert_eq!(
        evaluate_expression("if(c>D,c,D)", &pipeline).unwrap(),
        floats(&[3.0, 2.0])
    );
}

#[test]
fn test_scenario_lag() {
    let pipeline = scenario_pipeline();
    assert_eq!(evaluate_expression("lag(c,3)", &pipeline).unwrap(), floats(&[3.0, 1.0]));
}

#[test]
fn test_scenario_finance() {
    let pipeline = MemoryPipeline::from_columns([
        ("c", floats(&[1.0, 2.0, 3.0, 4.0])),
        ("e", floats(&[6.0, 6.0, 6.0, 6.0])),
    ])
    .unwrap();

    let npv = evaluate_expression("npv(.1,c)", &pipeline).unwrap();
    assert_eq!(npv.len(), 1);
    assert!((first(&npv) - 8.302778).abs() < 1e-4);

    let irr = evaluate_expression("irr(e,c)", &pipeline).unwrap();
    assert_eq!(irr.len(), 1);
    assert!((first(&irr) - 0.3169080).abs() < 1e-4);

    let averaged = evaluate_expression("irr(sum(e)/count(e),c)", &pipeline).unwrap();
    assert!((first(&averaged) - first(&irr)).abs() < 1e-12);
}

#[test]
fn test_scenario_range_expands_pipeline() {
    let mut pipeline = MemoryPipeline::from_columns([("x", floats(&[5.0]))]).unwrap();
    let mut tree = parse("range(0,10)").unwrap();
    Evaluator::new().evaluate(&mut tree, &pipeline).unwrap();
    assert_eq!(tree.value().map(TypedColumn::len), Some(10));

    PipelineAdapter::new(&mut pipeline, false)
        .append_result("r", &tree)
        .unwrap();
    assert_eq!(pipeline.row_count(), 10);
    assert_eq!(pipeline.get_column("x").unwrap().0, floats(&[5.0; 10]));
    assert_eq!(
        evaluate_expression("x*r", &pipeline).unwrap(),
        floats(&[0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0])
    );
}

#[test]
fn test_scenario_errors() {
    let pipeline = scenario_pipeline();
    let err = parse("(1+2").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    let err = evaluate_expression("c/0", &pipeline).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Domain);
    let err = evaluate_expression("c+missing", &pipeline).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Lookup);
    let err = evaluate_expression("c+range(0,3)", &pipeline).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Shape);
}

#[test]
fn test_scalar_broadcast_matches_materialized_operand() {
    let pipeline = MemoryPipeline::from_columns([
        ("c", floats(&[1.0, 2.0, 3.0])),
        ("two", floats(&[2.0, 2.0, 2.0])),
    ])
    .unwrap();
    for op in ["+", "-", "*", "/", "^", "==", "!=", "<", "<=", ">", ">=", "&&", "||"] {
        let scalar = evaluate_expression(&format!("c{}2", op), &pipeline).unwrap();
        let materialized = evaluate_expression(&format!("c{}two", op), &pipeline).unwrap();
        assert_eq!(scalar, materialized, "operator {}", op);
        let flipped = evaluate_expression(&format!("2{}c", op), &pipeline).unwrap();
        let flipped_materialized = evaluate_expression(&format!("two{}c", op), &pipeline).unwrap();
        assert_eq!(flipped, flipped_materialized, "operator {}", op);
    }
}

#[test]
fn test_clone_evaluates_like_original() {
    let pipeline = scenario_pipeline();
    let mut evaluator = Evaluator::new();
    let original = parse("cumeAfter(c*D)+maxE(c,D)^2-lead(c,0)").unwrap();

    let mut copy = original.deep_copy();
    evaluator.evaluate(&mut copy, &pipeline).unwrap();
    assert!(original.value().is_none());

    let mut original = original;
    evaluator.evaluate(&mut original, &pipeline).unwrap();
    assert_eq!(original.value(), copy.value());

    // Evaluating again gives the same answer
    evaluator.evaluate(&mut original, &pipeline).unwrap();
    assert_eq!(original.value(), copy.value());

    // A reset tree evaluates afresh
    original.reset();
    assert!(original.value().is_none());
    evaluator.evaluate(&mut original, &pipeline).unwrap();
    assert_eq!(original.value(), copy.value());
}

#[test]
fn test_clones_evaluate_on_separate_threads() {
    let tree = parse("sum(x*k)").unwrap();
    let handles: Vec<_> = (1..=4)
        .map(|k| {
            let mut tree = tree.deep_copy();
            thread::spawn(move || {
                let pipeline = MemoryPipeline::from_columns([
                    ("x", floats(&[1.0, 2.0, 3.0])),
                    ("k", TypedColumn::Int64(vec![k; 3])),
                ])
                .unwrap();
                Evaluator::new().evaluate(&mut tree, &pipeline).unwrap();
                first(tree.value().unwrap())
            })
        })
        .collect();
    let results: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![6.0, 12.0, 18.0, 24.0]);
}

#[test]
fn test_exist_fallback() {
    let pipeline = scenario_pipeline();
    assert_eq!(
        evaluate_expression("exist(weight,1)*c", &pipeline).unwrap(),
        floats(&[1.0, 2.0])
    );
    assert_eq!(
        evaluate_expression("exist(D,0)", &pipeline).unwrap(),
        floats(&[3.0, -4.0])
    );
}

#[test]
fn test_loop_builds_running_balance() {
    let mut pipeline = MemoryPipeline::from_columns([
        ("balance", floats(&[100.0])),
        ("rate", floats(&[0.1])),
    ])
    .unwrap();
    let mut bodies = vec![parse("balance*(1+rate)").unwrap(), parse("k+1").unwrap()];
    let targets = vec!["balance".to_string(), "years".to_string()];
    let spec: LoopSpec = "k:0:3".parse().unwrap();

    run_loop(&mut Evaluator::new(), &spec, &mut bodies, &targets, &mut pipeline).unwrap();

    let (balance, _) = pipeline.get_column("balance").unwrap();
    assert!((first(&balance) - 133.1).abs() < 1e-9);
    assert_eq!(pipeline.get_column("years").unwrap().0, floats(&[3.0]));
    assert_eq!(pipeline.field_names(), vec!["rate", "balance", "years"]);
}

#[derive(Default)]
struct RecordingSink {
    figures: Vec<(Figure, LayoutOptions)>,
}

impl RenderSink for RecordingSink {
    fn render(&mut self, figure: &Figure, layout: &LayoutOptions) -> Result<(), String> {
        self.figures.push((figure.clone(), layout.clone()));
        Ok(())
    }
}

#[test]
fn test_output_functions() {
    let pipeline = MemoryPipeline::from_columns([
        ("x", floats(&[1.0, 2.0, 3.0, 4.0])),
        ("y", floats(&[2.0, 4.0, 6.0, 8.0])),
    ])
    .unwrap();
    let mut sink = RecordingSink::default();
    let mut out = Vec::new();
    {
        let config = EvalConfig {
            print_rows: 3,
            ..EvalConfig::default()
        };
        let mut evaluator = Evaluator::with_config(config)
            .with_render_sink(&mut sink)
            .with_output(&mut out);
        for text in [
            "setPlotDim(40,10)",
            "plotLine(x,y)",
            "histogram(y,2)",
            "print(x)",
            "printIf(y,x>2)",
        ] {
            let mut tree = parse(text).unwrap();
            evaluator.evaluate(&mut tree, &pipeline).unwrap();
            assert_eq!(tree.value(), Some(&floats(&[0.0])), "{}", text);
        }
        assert_eq!(evaluator.layout().width, 40);
    }

    assert_eq!(sink.figures.len(), 2);
    let (line, layout) = &sink.figures[0];
    assert_eq!(line.kind, FigureKind::Line);
    assert_eq!(line.title, "plotLine(x,y)");
    assert_eq!(line.y, vec![2.0, 4.0, 6.0, 8.0]);
    assert_eq!((layout.width, layout.height), (40, 10));
    assert_eq!(sink.figures[1].0.y, vec![2.0, 2.0]);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "[1, 2, 3, ... (4 rows)]\n[6, 8]\n");
}

#[test]
fn test_plot_without_sink_fails() {
    let pipeline = scenario_pipeline();
    let err = evaluate_expression("plotXY(c,D)", &pipeline).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::External);
}

#[test]
fn test_dates_and_strings() {
    let pipeline = MemoryPipeline::from_columns([
        (
            "name",
            TypedColumn::String(vec!["alpha".into(), "beta".into()]),
        ),
        ("n", floats(&[1.0, 2.0])),
    ])
    .unwrap();
    assert_eq!(
        evaluate_expression("upper(substr(name,0,n+1))", &pipeline).unwrap(),
        TypedColumn::String(vec!["AL".into(), "BET".into()])
    );
    assert_eq!(
        evaluate_expression("dateDiff(dateAdd('2021-01-31',n),'2021-01-31','day')", &pipeline)
            .unwrap(),
        TypedColumn::Int64(vec![28, 59])
    );
    assert_eq!(
        evaluate_expression("toString(n)+'-'+name", &pipeline).unwrap(),
        TypedColumn::String(vec!["1-alpha".into(), "2-beta".into()])
    );
}
