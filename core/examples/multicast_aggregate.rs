// switchyard/examples/multicast_aggregate.rs

use std::time::Duration;
use switchyard::{aggregator, constant, simple, Exchange, RouteBuilder, Runtime, SwitchyardResult, Value};
use tracing::info;

fn main() -> SwitchyardResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Multicast and Aggregate Example ---");

  let runtime = Runtime::default();

  runtime.add_route(RouteBuilder::new("warehouse-a", "direct:warehouse-a").set_body(simple("body * 3")))?;
  runtime.add_route(
    RouteBuilder::new("warehouse-b", "direct:warehouse-b")
      .delay(constant(Duration::from_millis(20)))
      .set_body(simple("body * 5")),
  )?;

  let sum = aggregator(|acc: Option<Exchange>, next: Exchange| match acc {
    None => next,
    Some(mut acc) => {
      let total = acc.body().as_i64().unwrap_or(0) + next.body().as_i64().unwrap_or(0);
      acc.set_body(total);
      acc
    }
  });

  runtime.add_route(
    RouteBuilder::new("stock", "direct:stock")
      .multicast()
      .parallel()
      .aggregate(sum)
      .to("direct:warehouse-a")
      .to("direct:warehouse-b")
      .end()
      .loop_count(constant(3))
      .set_body(simple("body + 1"))
      .end(),
  )?;
  runtime.start()?;

  let total = runtime.send_body("direct:stock", 10)?;
  info!("Aggregated stock plus three restocks: {}", total);
  assert_eq!(total, Value::from(83));

  runtime.stop()
}
