// switchyard/examples/error_handling.rs

use switchyard::{constant, simple, Exchange, ErrorMatcher, RouteBuilder, Runtime, SwitchyardResult};
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
enum OrderError {
  #[error("order {0} is out of stock")]
  OutOfStock(String),
}

fn main() -> SwitchyardResult<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");

  let runtime = Runtime::default();

  runtime.register_function("reserve", |exchange: &mut Exchange| {
    let sku = exchange.body().to_string();
    if sku.starts_with('X') {
      return Err(OrderError::OutOfStock(sku).into());
    }
    exchange.set_header("reserved", true);
    Ok(())
  })?;

  runtime.add_route(
    RouteBuilder::new("orders", "direct:orders")
      .do_try()
      .process("reserve")
      .set_body(simple("'reserved ' + body"))
      .do_catch(ErrorMatcher::is::<OrderError>())
      .set_body(simple("'backordered: ' + error.message"))
      .do_catch(ErrorMatcher::Any)
      .set_body(constant("rejected"))
      .do_finally()
      .set_header("audited", constant(true))
      .end(),
  )?;

  // An uncaught error surfaces from send_body as the exchange error.
  runtime.add_route(
    RouteBuilder::new("strict", "direct:strict")
      .pipeline()
      .stop_on_error(true)
      .process("reserve")
      .set_body(constant("never reached on failure"))
      .end(),
  )?;
  runtime.start()?;

  for sku in ["A-100", "X-200"] {
    info!("{} -> {}", sku, runtime.send_body("direct:orders", sku)?);
  }

  match runtime.send_body("direct:strict", "X-300") {
    Ok(body) => info!("strict route returned {}", body),
    Err(err) => error!("strict route failed: {}", err),
  }

  runtime.stop()
}
