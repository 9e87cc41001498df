// tests/runtime_tests.rs
mod common;

use common::*;
use parking_lot::Mutex;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use switchyard::component::timer::{TIMER_COUNTER_PROPERTY, TIMER_NAME_PROPERTY};
use switchyard::processor::Producer;
use switchyard::{
  constant, simple, Component, Consumer, ConsumerContext, Endpoint, Exchange, Hooks, LifecycleState, RouteBuilder,
  Runtime, RuntimeConfig, StepInfo, SwitchyardError, SwitchyardResult, Uri, Value, ValueKind,
};

fn exchange_failure(result: SwitchyardResult<Value>) -> switchyard::ExchangeError {
  match result {
    Err(SwitchyardError::Exchange(err)) => err,
    other => panic!("expected an exchange error, got {:?}", other),
  }
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while Instant::now() < deadline {
    if condition() {
      return true;
    }
    thread::sleep(Duration::from_millis(5));
  }
  condition()
}

// --- A recording component used to observe outbound traffic ---

#[derive(Default)]
struct MockComponent {
  endpoints_created: AtomicUsize,
  received: Arc<Mutex<Vec<Value>>>,
}

struct MockEndpoint {
  uri: Uri,
  received: Arc<Mutex<Vec<Value>>>,
}

impl Component for MockComponent {
  fn id(&self) -> &str {
    "mock"
  }

  fn create_endpoint(&self, uri: &Uri) -> SwitchyardResult<Arc<dyn Endpoint>> {
    self.endpoints_created.fetch_add(1, Ordering::SeqCst);
    Ok(Arc::new(MockEndpoint {
      uri: uri.clone(),
      received: self.received.clone(),
    }))
  }
}

impl Endpoint for MockEndpoint {
  fn uri(&self) -> &Uri {
    &self.uri
  }

  fn create_consumer(&self, _context: ConsumerContext) -> SwitchyardResult<Box<dyn Consumer>> {
    Err(SwitchyardError::Unsupported {
      uri: self.uri.to_string(),
      operation: "consuming",
    })
  }

  fn create_producer(&self) -> SwitchyardResult<Producer> {
    let received = self.received.clone();
    Ok(Arc::new(move |exchange: &mut Exchange| {
      received.lock().push(exchange.body().clone());
    }))
  }
}

// --- Synchronous dispatch ---

#[test]
fn test_send_body_through_direct_route() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("greet", "direct:greet").set_body(simple("'Hello ' + body")))
    .unwrap();
  runtime.start().unwrap();

  assert_eq!(runtime.send_body("direct:greet", "World").unwrap(), Value::from("Hello World"));
  runtime.stop().unwrap();
}

#[test]
fn test_send_headers_and_route_chaining() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(
      RouteBuilder::new("front", "direct:front")
        .set_header("stage", constant("front"))
        .to("direct:back"),
    )
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("back", "direct:back").set_body(simple("header.customer + '@' + header.stage")))
    .unwrap();
  runtime.start().unwrap();

  let body = runtime
    .send_headers("direct:front", "ignored", [("customer", "ada")])
    .unwrap();
  assert_eq!(body, Value::from("ada@front"));
  assert_eq!(runtime.route_names(), vec!["back".to_string(), "front".to_string()]);
  runtime.stop().unwrap();
}

#[test]
fn test_send_returns_the_processed_exchange() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(
      RouteBuilder::new("inspect", "direct:inspect")
        .set_property("seen", simple("header.id"))
        .set_error(constant("rejected")),
    )
    .unwrap();
  runtime.start().unwrap();

  let exchange = runtime
    .send("direct:inspect", |exchange| exchange.set_header("id", 7))
    .unwrap();
  assert_eq!(exchange.property("seen"), Some(&Value::from(7)));
  assert_eq!(exchange.error().map(|e| e.message()), Some("rejected".to_string()));

  let err = exchange_failure(runtime.send_body("direct:inspect", "x"));
  assert_eq!(err.message(), "rejected");
  runtime.stop().unwrap();
}

#[test]
fn test_direct_without_consumer_reports_no_consumer() {
  setup_tracing();
  let runtime = runtime();
  let err = exchange_failure(runtime.send_body("direct:nobody", "x"));
  assert!(matches!(
    err.downcast_ref::<SwitchyardError>(),
    Some(SwitchyardError::NoConsumer { .. })
  ));
}

#[test]
fn test_panicking_function_becomes_exchange_error() {
  setup_tracing();
  let runtime = runtime();
  runtime.register_processor("explode", panicking_processor("bad input")).unwrap();
  runtime
    .add_route(RouteBuilder::new("panics", "direct:panics").process("explode"))
    .unwrap();
  runtime.start().unwrap();

  let err = exchange_failure(runtime.send_body("direct:panics", "x"));
  assert!(matches!(
    err.downcast_ref::<SwitchyardError>(),
    Some(SwitchyardError::Panic { message }) if message == "bad input"
  ));
  // The runtime keeps serving after a panic.
  assert!(runtime.send_body("direct:panics", "y").is_err());
  runtime.stop().unwrap();
}

#[test]
fn test_fallible_functions_set_exchange_errors() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .register_function("validate", |exchange: &mut Exchange| {
      if exchange.header("customer").is_none() {
        anyhow::bail!("customer header is required");
      }
      exchange.set_body("valid");
      Ok(())
    })
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("validate", "direct:validate").process("validate"))
    .unwrap();
  runtime.start().unwrap();

  let err = exchange_failure(runtime.send_body("direct:validate", "x"));
  assert_eq!(err.message(), "customer header is required");
  let ok = runtime.send_headers("direct:validate", "x", [("customer", "ada")]).unwrap();
  assert_eq!(ok, Value::from("valid"));
  runtime.stop().unwrap();
}

#[test]
fn test_custom_component_endpoint_is_created_once() {
  setup_tracing();
  let runtime = runtime();
  let mock = Arc::new(MockComponent::default());
  runtime.register_component(mock.clone()).unwrap();
  runtime
    .add_route(
      RouteBuilder::new("outbound", "direct:outbound")
        .set_body(simple("upper(body)"))
        .to("mock:sink"),
    )
    .unwrap();
  runtime.start().unwrap();

  runtime.send_body("direct:outbound", "a").unwrap();
  runtime.send_body("direct:outbound", "b").unwrap();
  runtime.send_body("mock:sink", "c").unwrap();

  assert_eq!(*mock.received.lock(), vec![Value::from("A"), Value::from("B"), Value::from("c")]);
  assert_eq!(mock.endpoints_created.load(Ordering::SeqCst), 1);
  runtime.stop().unwrap();
}

#[test]
fn test_custom_converter_is_used_by_routes() {
  setup_tracing();
  let runtime = runtime();
  runtime.register_converter(ValueKind::String, ValueKind::List, |value, params| {
    let separator = params.get("separator").map(String::as_str).unwrap_or(",");
    let text = value.as_str().unwrap_or_default();
    Ok(Value::List(text.split(separator).map(Value::from).collect()))
  });
  runtime
    .add_route(
      RouteBuilder::new("split", "direct:split")
        .convert_body_to("list")
        .set_body(simple("len(body)")),
    )
    .unwrap();
  runtime.start().unwrap();

  assert_eq!(runtime.send_body("direct:split", "a,b,c").unwrap(), Value::from(3));
  assert!(runtime.converters().can_convert(ValueKind::Bytes, ValueKind::List));
  runtime.stop().unwrap();
}

#[test]
fn test_hooks_apply_to_routes_registered_afterwards() {
  setup_tracing();
  let runtime = runtime();
  let visited = Arc::new(Mutex::new(Vec::<String>::new()));
  let recorder = visited.clone();
  runtime.set_hooks(Hooks::new().with_pre(move |info: &StepInfo, _: &mut Exchange| {
    recorder.lock().push(format!("{}/{}", info.route, info.step));
  }));
  runtime
    .add_route(
      RouteBuilder::new("hooked", "direct:hooked")
        .set_body(constant(1))
        .remove_header("noise"),
    )
    .unwrap();
  runtime.start().unwrap();
  runtime.send_body("direct:hooked", "x").unwrap();

  assert_eq!(
    *visited.lock(),
    vec![
      "hooked/pipeline".to_string(),
      "hooked/setBody".to_string(),
      "hooked/removeHeader[noise]".to_string()
    ]
  );
  runtime.stop().unwrap();
}

#[test]
fn test_exchange_timeout_gives_send_a_deadline() {
  setup_tracing();
  let runtime = Runtime::new(RuntimeConfig::default().with_exchange_timeout(Duration::from_millis(20)));
  runtime
    .add_route(
      RouteBuilder::new("slow", "direct:slow")
        .delay(constant(1_000))
        .set_body(constant("late")),
    )
    .unwrap();
  runtime.start().unwrap();

  let started = Instant::now();
  let err = exchange_failure(runtime.send_body("direct:slow", "x"));
  assert!(started.elapsed() < Duration::from_millis(900));
  assert!(matches!(
    err.downcast_ref::<SwitchyardError>(),
    Some(SwitchyardError::DeadlineExceeded)
  ));
  runtime.stop().unwrap();
}

#[test]
fn test_unrepresentable_exchange_timeout_means_no_deadline() {
  setup_tracing();
  let runtime = Runtime::new(RuntimeConfig::default().with_exchange_timeout(Duration::MAX));
  runtime
    .add_route(RouteBuilder::new("patient", "direct:patient").set_body(constant("done")))
    .unwrap();
  runtime.start().unwrap();

  assert!(runtime.new_exchange().scope().deadline().is_none());
  assert_eq!(runtime.send_body("direct:patient", "x").unwrap(), Value::from("done"));
  runtime.stop().unwrap();
}

// --- Timer ---

#[test]
#[serial]
fn test_timer_fires_repeat_count_times() {
  setup_tracing();
  reset_counters();
  let runtime = runtime();
  let fired = Arc::new(Mutex::new(Vec::<(Value, Value)>::new()));
  let recorder = fired.clone();
  runtime
    .register_processor(
      "tick",
      Arc::new(move |exchange: &mut Exchange| {
        TIMER_FIRE_COUNTER.fetch_add(1, Ordering::SeqCst);
        recorder.lock().push((
          exchange.property(TIMER_NAME_PROPERTY).cloned().unwrap_or_default(),
          exchange.property(TIMER_COUNTER_PROPERTY).cloned().unwrap_or_default(),
        ));
      }),
    )
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("ticker", "timer:heartbeat?period=10&repeatCount=3").process("tick"))
    .unwrap();
  runtime.start().unwrap();

  assert!(wait_until(Duration::from_secs(2), || TIMER_FIRE_COUNTER.load(Ordering::SeqCst) >= 3));
  thread::sleep(Duration::from_millis(50));
  assert_eq!(TIMER_FIRE_COUNTER.load(Ordering::SeqCst), 3);
  let counters: Vec<Value> = fired.lock().iter().map(|(_, counter)| counter.clone()).collect();
  assert_eq!(counters, vec![Value::from(1), Value::from(2), Value::from(3)]);
  assert!(fired.lock().iter().all(|(name, _)| *name == Value::from("heartbeat")));
  runtime.stop().unwrap();
}

#[test]
#[serial]
fn test_stop_halts_timer_consumers() {
  setup_tracing();
  reset_counters();
  let runtime = runtime();
  runtime
    .register_processor(
      "tick",
      Arc::new(|_: &mut Exchange| {
        TIMER_FIRE_COUNTER.fetch_add(1, Ordering::SeqCst);
      }),
    )
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("forever", "timer:forever?period=5").process("tick"))
    .unwrap();
  runtime.start().unwrap();
  assert!(wait_until(Duration::from_secs(2), || TIMER_FIRE_COUNTER.load(Ordering::SeqCst) >= 2));

  runtime.stop().unwrap();
  let after_stop = TIMER_FIRE_COUNTER.load(Ordering::SeqCst);
  thread::sleep(Duration::from_millis(40));
  assert_eq!(TIMER_FIRE_COUNTER.load(Ordering::SeqCst), after_stop);
}

#[test]
fn test_timer_endpoints_have_no_producer() {
  setup_tracing();
  let runtime = runtime();
  assert!(matches!(
    runtime.send_body("timer:t", "x"),
    Err(SwitchyardError::Unsupported { .. })
  ));
}

// --- Lifecycle ---

#[test]
fn test_lifecycle_transitions() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("echo", "direct:echo").set_body(simple("body")))
    .unwrap();
  assert_eq!(runtime.state(), LifecycleState::Created);

  runtime.start().unwrap();
  assert!(runtime.is_started());
  assert!(matches!(runtime.start(), Err(SwitchyardError::Lifecycle(_))));

  runtime.stop().unwrap();
  assert_eq!(runtime.state(), LifecycleState::Stopped);
  assert!(runtime.route_names().is_empty());
  assert!(runtime.component("direct").is_none());
  assert!(runtime.data_format("json").is_none());

  // Stopping twice is harmless; everything else is refused.
  runtime.stop().unwrap();
  assert!(matches!(runtime.start(), Err(SwitchyardError::Lifecycle(_))));
  assert!(matches!(
    runtime.send_body("direct:echo", "x"),
    Err(SwitchyardError::Lifecycle(_))
  ));
  assert!(matches!(
    runtime.add_route(RouteBuilder::new("late", "direct:late").set_body(constant(1))),
    Err(SwitchyardError::Lifecycle(_))
  ));
}

#[test]
fn test_stop_cancels_in_flight_exchanges() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("sleepy", "direct:sleepy").delay(constant(Duration::from_secs(5))))
    .unwrap();
  runtime.start().unwrap();

  let started = Instant::now();
  let result = thread::scope(|scope| {
    let in_flight = scope.spawn(|| runtime.send_body("direct:sleepy", "x"));
    thread::sleep(Duration::from_millis(50));
    runtime.stop().unwrap();
    in_flight.join().unwrap()
  });

  assert!(started.elapsed() < Duration::from_secs(3));
  let err = exchange_failure(result);
  assert!(matches!(
    err.downcast_ref::<SwitchyardError>(),
    Some(SwitchyardError::Cancelled)
  ));
}

#[test]
fn test_route_registered_after_start_is_live_immediately() {
  setup_tracing();
  let runtime = runtime();
  runtime.start().unwrap();
  runtime
    .add_route(RouteBuilder::new("late", "direct:late").set_body(constant("live")))
    .unwrap();
  assert_eq!(runtime.send_body("direct:late", "x").unwrap(), Value::from("live"));
  runtime.stop().unwrap();
}

#[test]
fn test_failed_start_rolls_back_started_consumers() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("a-good", "direct:good").set_body(constant("ok")))
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("b-bad", "timer:bad?period=0").set_body(constant(1)))
    .unwrap();

  assert!(matches!(runtime.start(), Err(SwitchyardError::InvalidUri { .. })));
  assert_eq!(runtime.state(), LifecycleState::Created);
  let err = exchange_failure(runtime.send_body("direct:good", "x"));
  assert!(matches!(
    err.downcast_ref::<SwitchyardError>(),
    Some(SwitchyardError::NoConsumer { .. })
  ));
}

#[test]
fn test_two_routes_cannot_consume_the_same_direct_name() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("first", "direct:shared").set_body(constant(1)))
    .unwrap();
  runtime
    .add_route(RouteBuilder::new("second", "direct:shared").set_body(constant(2)))
    .unwrap();
  assert!(matches!(
    runtime.start(),
    Err(SwitchyardError::DuplicateRegistration { .. })
  ));
  assert!(!runtime.is_started());
}

#[test]
fn test_duplicate_registrations_are_rejected() {
  setup_tracing();
  let runtime = runtime();
  runtime
    .add_route(RouteBuilder::new("dup", "direct:dup").set_body(constant(1)))
    .unwrap();
  assert!(matches!(
    runtime.add_route(RouteBuilder::new("dup", "direct:other").set_body(constant(2))),
    Err(SwitchyardError::DuplicateRoute { name }) if name == "dup"
  ));

  runtime.register_function("f", |_: &mut Exchange| Ok(())).unwrap();
  assert!(matches!(
    runtime.register_function("f", |_: &mut Exchange| Ok(())),
    Err(SwitchyardError::DuplicateRegistration { kind: "function", .. })
  ));
  assert!(matches!(
    runtime.register_component(Arc::new(MockComponent::default())).and(runtime.register_component(Arc::new(MockComponent::default()))),
    Err(SwitchyardError::DuplicateRegistration { kind: "component", .. })
  ));
}

#[test]
fn test_runtimes_do_not_share_registries() {
  setup_tracing();
  let first = runtime();
  let second = runtime();
  first.register_function("only-here", |_: &mut Exchange| Ok(())).unwrap();
  assert!(second
    .add_route(RouteBuilder::new("r", "direct:r").process("only-here"))
    .is_err());
  assert!(first
    .add_route(RouteBuilder::new("r", "direct:r").process("only-here"))
    .is_ok());
}

// --- Configuration ---

#[test]
fn test_config_from_lookup() {
  let vars: HashMap<&str, &str> = [
    ("SWITCHYARD_NAME", "orders"),
    ("SWITCHYARD_TRACK_HISTORY", "yes"),
    ("SWITCHYARD_EXCHANGE_TIMEOUT_MS", "250"),
    ("SWITCHYARD_TIMER_PERIOD_MS", "500"),
  ]
  .into_iter()
  .collect();
  let config = RuntimeConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

  assert_eq!(config.name, "orders");
  assert!(config.track_history);
  assert_eq!(config.exchange_timeout, Some(Duration::from_millis(250)));
  assert_eq!(config.timer_default_period, Duration::from_millis(500));
}

#[test]
fn test_config_defaults_and_invalid_values() {
  let defaults = RuntimeConfig::from_lookup(|_| None).unwrap();
  assert_eq!(defaults.name, "switchyard");
  assert!(!defaults.track_history);
  assert_eq!(defaults.exchange_timeout, None);

  let zero_timeout = RuntimeConfig::from_lookup(|key| {
    (key == "SWITCHYARD_EXCHANGE_TIMEOUT_MS").then(|| "0".to_string())
  })
  .unwrap();
  assert_eq!(zero_timeout.exchange_timeout, None);

  for (key, value) in [
    ("SWITCHYARD_TRACK_HISTORY", "maybe"),
    ("SWITCHYARD_EXCHANGE_TIMEOUT_MS", "soon"),
    ("SWITCHYARD_TIMER_PERIOD_MS", "0"),
  ] {
    let err = RuntimeConfig::from_lookup(|k| (k == key).then(|| value.to_string())).unwrap_err();
    assert!(
      matches!(&err, SwitchyardError::ConfigurationError { key: reported, .. } if reported == key),
      "{:?}",
      err
    );
  }
}
