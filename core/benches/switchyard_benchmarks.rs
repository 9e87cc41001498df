use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use switchyard::{aggregator, constant, simple, Exchange, Route, RouteBuilder, Runtime, RuntimeConfig, Value};

// --- Helpers ---

fn bench_runtime() -> Runtime {
  let runtime = Runtime::new(RuntimeConfig::default().with_name("bench"));
  runtime
    .register_processor(
      "increment",
      Arc::new(|exchange: &mut Exchange| {
        let next = exchange.body().as_i64().unwrap_or(0) + 1;
        exchange.set_body(next);
      }),
    )
    .unwrap();
  runtime
}

fn compiled(runtime: &Runtime, builder: RouteBuilder) -> Route {
  let definition = builder.build().unwrap();
  let name = definition.name.clone();
  runtime.register_route(definition).unwrap();
  runtime.route(&name).unwrap()
}

fn run(route: &Route, body: Value) -> Exchange {
  let mut exchange = Exchange::detached();
  exchange.set_body(body);
  route.process(&mut exchange);
  exchange
}

// --- Benchmark Functions ---

fn bench_pipeline_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("Pipeline");

  for num_steps in [1usize, 5, 20] {
    let runtime = bench_runtime();
    let builder = (0..num_steps).fold(
      RouteBuilder::new(format!("pipeline_{}", num_steps), "direct:bench"),
      |builder, _| builder.process("increment"),
    );
    let route = compiled(&runtime, builder);

    group.throughput(Throughput::Elements(num_steps as u64));
    group.bench_with_input(BenchmarkId::new("steps", num_steps), &route, |b, route| {
      b.iter(|| run(route, Value::from(0)))
    });
  }
  group.finish();
}

fn bench_choice_and_expressions(c: &mut Criterion) {
  let mut group = c.benchmark_group("Choice");
  let runtime = bench_runtime();
  let route = compiled(
    &runtime,
    RouteBuilder::new("choice", "direct:choice")
      .choice()
      .when(simple("body < 10"))
      .set_header("size", constant("small"))
      .when(simple("body < 1000 && body % 2 == 0"))
      .set_header("size", constant("medium"))
      .otherwise()
      .set_header("size", simple("'large-' + string(body)"))
      .end(),
  );

  for body in [1i64, 500, 5_000] {
    group.bench_with_input(BenchmarkId::new("branch", body), &body, |b, body| {
      b.iter(|| run(&route, Value::from(*body)))
    });
  }
  group.finish();
}

fn bench_multicast(c: &mut Criterion) {
  let mut group = c.benchmark_group("Multicast");

  for parallel in [false, true] {
    let runtime = bench_runtime();
    let mut builder = RouteBuilder::new("multicast", "direct:multicast").multicast();
    if parallel {
      builder = builder.parallel();
    }
    let builder = builder
      .aggregate(aggregator(|acc: Option<Exchange>, next: Exchange| match acc {
        None => next,
        Some(mut acc) => {
          let total = acc.body().as_i64().unwrap_or(0) + next.body().as_i64().unwrap_or(0);
          acc.set_body(total);
          acc
        }
      }))
      .process("increment")
      .process("increment")
      .process("increment")
      .process("increment")
      .end();
    let route = compiled(&runtime, builder);

    let label = if parallel { "parallel" } else { "sequential" };
    group.bench_function(BenchmarkId::new("branches_4", label), |b| {
      b.iter(|| run(&route, Value::from(1)))
    });
  }
  group.finish();
}

criterion_group!(benches, bench_pipeline_steps, bench_choice_and_expressions, bench_multicast);
criterion_main!(benches);
