//! End-to-end context lifecycle: configure, distribute, run, edit plans.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use cepctx_core::error::Error;
use cepctx_core::prelude::*;
use cepctx_exec::{EngineFactory, EngineManager, OperatorContext, StagingEngineManager, Worker};

/// Schema stub that renders a fixed definition.
#[derive(Debug, Clone, PartialEq)]
struct Fixed(String);

impl StreamSchema for Fixed {
    fn render_definition(&self, _stream_id: &str) -> String {
        self.0.clone()
    }
}

fn handles(pairs: &[(&str, &str)]) -> Vec<(String, ExtensionHandle)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), ExtensionHandle::new(*v)))
        .collect()
}

fn handle_map(pairs: &[(&str, &str)]) -> BTreeMap<String, ExtensionHandle> {
    handles(pairs).into_iter().collect()
}

fn trades_context() -> OperatorContext {
    let mut ctx = OperatorContext::new();
    ctx.set_name("trades-cep").unwrap();
    ctx.set_time_characteristic(TimeCharacteristic::EventTime);
    ctx.set_execution_config(ExecutionConfig::default());
    ctx.set_input_schemas([
        (
            "Trades",
            Schema::new(vec![
                Field::new("symbol", DataType::Utf8),
                Field::new("price", DataType::Float64),
            ]),
        ),
        (
            "Quotes",
            Schema::new(vec![
                Field::new("symbol", DataType::Utf8),
                Field::new("bid", DataType::Float64),
            ]),
        ),
    ])
    .unwrap();
    ctx.set_extensions(handles(&[("math:ema", "ext.math.Ema")]))
        .unwrap();
    ctx
}

#[test]
fn test_assemble_all_is_deterministic() {
    let mut ctx = OperatorContext::new();
    ctx.set_input_schemas([
        ("B", Fixed("defB;".into())),
        ("A", Fixed("defA;".into())),
    ])
    .unwrap();
    ctx.add_plan_with_id("p2", "q2;").unwrap();
    ctx.add_plan_with_id("p1", "q1;").unwrap();

    let first = ctx.assemble_all().unwrap();
    assert_eq!(first, "defA;defB;q1;q2;");
    for _ in 0..10 {
        assert_eq!(ctx.assemble_all().unwrap(), first);
    }
}

#[test]
fn test_plan_registry_semantics() {
    let mut ctx = trades_context();
    let id = ctx.add_plan("from Trades select symbol insert into Out;").unwrap();
    let all = ctx.plans().unwrap().list_all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[&id], "from Trades select symbol insert into Out;");

    ctx.update_plan(id.clone(), "from Trades select price insert into Out;")
        .unwrap();
    ctx.update_plan("fresh", "from Quotes select bid insert into Out;")
        .unwrap();
    let all = ctx.plans().unwrap().list_all();
    assert_eq!(all[&id], "from Trades select price insert into Out;");
    assert!(all.contains_key("fresh"));

    assert!(ctx.remove_plan(id.as_str()));
    assert!(!ctx.remove_plan(id.as_str()));
    assert!(!ctx.remove_plan("never-added"));
}

#[test]
fn test_assemble_one_selects_referenced_streams() {
    let mut ctx = trades_context();
    ctx.add_plan_with_id("p1", "from Quotes[bid > 10.0] select symbol insert into Out;")
        .unwrap();
    assert_eq!(
        ctx.assemble_one("p1").unwrap(),
        "define stream Quotes (symbol string, bid double);\
         from Quotes[bid > 10.0] select symbol insert into Out;"
    );
    assert_eq!(
        ctx.assemble_one("p9"),
        Err(Error::UndefinedPlan("p9".into()))
    );

    ctx.add_plan_with_id("bad", "from Orders select id insert into Out;")
        .unwrap();
    assert_eq!(
        ctx.assemble_one("bad"),
        Err(Error::UndefinedStream("Orders".into()))
    );
}

#[test]
fn test_input_schema_lookup() {
    let ctx = trades_context();
    assert_eq!(ctx.input_stream_ids(), vec!["Quotes", "Trades"]);
    assert_eq!(ctx.input_schema("Trades").unwrap().fields.len(), 2);
    assert_eq!(
        ctx.input_schema("Orders"),
        Err(Error::UndefinedStream("Orders".into()))
    );
}

#[test]
fn test_extension_merge_overwrites_colliding_names() {
    let mut ctx = OperatorContext::<Schema>::new();
    ctx.set_extensions(handles(&[("a", "1")])).unwrap();
    ctx.set_extensions(handles(&[("b", "2")])).unwrap();
    assert_eq!(
        ctx.extensions().to_map(),
        handle_map(&[("a", "1"), ("b", "2")])
    );
    ctx.set_extensions(handles(&[("a", "3")])).unwrap();
    assert_eq!(
        ctx.extensions().to_map(),
        handle_map(&[("a", "3"), ("b", "2")])
    );
}

#[test]
fn test_engine_managers_are_independent() {
    let mut ctx = trades_context();
    let factory = EngineFactory::<StagingEngineManager>::default();

    let first = ctx.new_engine_manager(&factory).unwrap();
    ctx.set_extensions(handles(&[("math:ema", "ext.math.Ema2"), ("str:upper", "ext.Upper")]))
        .unwrap();
    let second = ctx.new_engine_manager(&factory).unwrap();

    assert_ne!(first.instance_id(), second.instance_id());
    assert_eq!(first.extensions().len(), 1);
    assert_eq!(first.extensions()["math:ema"].as_str(), "ext.math.Ema");
    assert_eq!(second.extensions().len(), 2);
    assert_eq!(second.extensions()["math:ema"].as_str(), "ext.math.Ema2");
}

#[test]
fn test_distribution_preserves_identity() {
    let mut ctx = trades_context();
    ctx.add_plan_with_id("p1", "from Trades select symbol insert into Out;")
        .unwrap();
    ctx.set_output_binding(
        "Out",
        Schema::new(vec![Field::new("symbol", DataType::Utf8)]),
    )
    .unwrap();

    let copies: Vec<_> = (0..4).map(|_| ctx.distribute()).collect();
    for copy in &copies {
        assert_eq!(copy.id(), ctx.id());
        assert_eq!(copy.display_name(), ctx.display_name());
        assert_eq!(copy.assemble_all().unwrap(), ctx.assemble_all().unwrap());
        assert_eq!(copy.output_binding("Out"), ctx.output_binding("Out"));
    }

    // The pipeline may ship contexts as serialized values instead.
    let wire = serde_json::to_string(&ctx).unwrap();
    let shipped: OperatorContext = serde_json::from_str(&wire).unwrap();
    assert_eq!(shipped.id(), ctx.id());
    assert_eq!(shipped.display_name(), ctx.display_name());
    assert_eq!(shipped.time_characteristic().unwrap(), TimeCharacteristic::EventTime);
    assert_eq!(shipped.extensions(), ctx.extensions());
    assert_eq!(shipped.assemble_all().unwrap(), ctx.assemble_all().unwrap());
}

#[test]
fn test_control_path_edits_while_worker_reads() {
    let mut ctx = trades_context();
    ctx.add_plan_with_id("base", "from Trades select symbol insert into Out;")
        .unwrap();
    let factory = EngineFactory::<StagingEngineManager>::default();
    let mut worker = Worker::start(ctx.distribute(), &factory).unwrap();

    // The control channel holds a shared handle to the worker's plans.
    let control = worker.context().plans().unwrap().clone();
    let done = Arc::new(AtomicBool::new(false));
    let editor = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..200 {
                let body = format!("from Quotes select bid insert into O{i};");
                control.add_with_id(format!("q{i}"), body).unwrap();
                if i % 3 == 0 {
                    control.remove(&format!("q{i}"));
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    while !done.load(Ordering::SeqCst) {
        worker.refresh(&factory).unwrap();
    }
    editor.join().unwrap();
    worker.refresh(&factory).unwrap();

    let program = &worker.engine().programs()[0];
    assert!(program.starts_with("define stream Quotes"));
    assert!(program.contains("insert into O199;"));
    assert!(!program.contains("insert into O0;"));
    assert_eq!(worker.fingerprint(), worker.context().program_fingerprint().unwrap());

    // The configuring instance never saw the worker's edits.
    assert_eq!(ctx.plans().unwrap().len(), 1);
}
