//! 메시지 처리 벤치마크
//!
//! 스테이지 평가, 라우팅 반복, 파이프라인 수에 따른 처리량을 측정합니다.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sluice_core::store::{PipelineSource, RuleSource, StreamConnection};
use sluice_core::types::Message;
use sluice_core::value::Value;
use sluice_interpreter::{FunctionRegistry, Interpreter, InterpreterConfig, RuleParser, Simulator};

fn rule(id: &str, source: &str) -> RuleSource {
    RuleSource {
        id: id.to_owned(),
        source: source.to_owned(),
    }
}

fn interpreter(pipeline_count: usize) -> Interpreter {
    let registry = Arc::new(FunctionRegistry::with_builtins().expect("builtins register"));
    let interpreter = Interpreter::new(InterpreterConfig::default(), registry);

    let rules = vec![
        rule(
            "tag",
            r#"rule "tag http" when has_field("http_response_code") then set_field("checked", "yes"); end"#,
        ),
        rule(
            "classify",
            r#"rule "classify" when to_long($message.http_response_code) >= 400
               then set_field("status_class", to_long($message.http_response_code) / 100); end"#,
        ),
        rule(
            "kv",
            r#"rule "kv" when has_field("query")
               then set_fields(fields: key_value(to_string($message.query), "&", "="), prefix: "q_"); end"#,
        ),
    ];

    let mut pipelines = Vec::with_capacity(pipeline_count);
    let mut ids = Vec::with_capacity(pipeline_count);
    for i in 0..pipeline_count {
        let id = format!("p{i}");
        pipelines.push(PipelineSource {
            id: id.clone(),
            source: format!(
                "pipeline \"p{i}\"\nstage 0 match either\n  rule \"tag http\";\n  rule \"kv\";\nstage 1 match all\n  rule \"classify\";\nend"
            ),
        });
        ids.push(id);
    }
    let connections = vec![StreamConnection {
        stream: "default".to_owned(),
        pipelines: ids,
    }];

    let failures = interpreter.reload(&rules, &pipelines, &connections);
    assert!(failures.is_empty(), "bench sources must compile");
    interpreter
}

fn sample_message(i: usize) -> Message {
    let mut message = Message::new(format!("GET /index.html {i}"), "bench");
    message.set_field("http_response_code", Value::Long(404));
    message.set_field("query", Value::from("a=1&b=2&c=3"));
    message
}

fn bench_single_message(c: &mut Criterion) {
    let interpreter = interpreter(1);
    let mut group = c.benchmark_group("process_single");
    group.throughput(Throughput::Elements(1));
    group.bench_function("one_pipeline", |b| {
        b.iter(|| interpreter.process(black_box(vec![sample_message(0)])))
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let interpreter = interpreter(1);
    let mut group = c.benchmark_group("process_batch");

    for size in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || (0..size).map(sample_message).collect::<Vec<_>>(),
                |batch| interpreter.process(black_box(batch)),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_pipeline_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_scaling");
    group.throughput(Throughput::Elements(1));

    for count in [1usize, 10, 50] {
        let interpreter = interpreter(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| interpreter.process(black_box(vec![sample_message(0)])))
        });
    }

    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let registry = Arc::new(FunctionRegistry::with_builtins().expect("builtins register"));
    let simulator = Simulator::new(RuleParser::new(registry));
    let source = r#"rule "sim" when has_field("http_response_code") then set_field("checked", true); end"#;

    let mut group = c.benchmark_group("simulate");
    group.throughput(Throughput::Elements(1));
    group.bench_function("with_trace", |b| {
        b.iter(|| {
            simulator
                .simulate(black_box(source), sample_message(0))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_single_message,
    bench_batch,
    bench_pipeline_scaling,
    bench_simulation
);
criterion_main!(benches);
