// switchyard/examples/basic_route.rs

use switchyard::{constant, simple, Exchange, LogLevel, RouteBuilder, Runtime, RuntimeConfig, SwitchyardResult};
use tracing::info;

fn main() -> SwitchyardResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Basic Route Example ---");

  let runtime = Runtime::new(RuntimeConfig::default().with_name("basic").with_history(true));

  runtime.register_function("stamp", |exchange: &mut Exchange| {
    let customer = exchange
      .header("customer")
      .and_then(|v| v.as_str())
      .ok_or_else(|| anyhow::anyhow!("customer header is required"))?
      .to_string();
    exchange.set_header("stamped-by", format!("desk-{}", customer.len()));
    Ok(())
  })?;

  runtime.add_route(
    RouteBuilder::new("greet", "direct:greet")
      .process("stamp")
      .choice()
      .when(simple("header.customer == 'vip'"))
      .set_body(simple("'Welcome back, ' + body + '!'"))
      .otherwise()
      .set_body(simple("'Hello ' + body"))
      .end()
      .set_header("handled", constant(true))
      .log(LogLevel::Info, "Greeted ${header.customer}: ${body}"),
  )?;
  runtime.start()?;

  let reply = runtime.send_body("direct:greet", "Ada");
  info!("Without a customer header: {:?}", reply.err().map(|e| e.to_string()));

  let reply = runtime.send_headers("direct:greet", "Grace", [("customer", "vip")])?;
  info!("VIP reply: {}", reply);

  let exchange = runtime.send("direct:greet", |exchange| {
    exchange.set_header("customer", "regular");
    exchange.set_body("Linus");
  })?;
  if let Some(history) = exchange.history() {
    info!("Steps visited: {:?}", history.steps().collect::<Vec<_>>());
  }

  runtime.stop()
}
