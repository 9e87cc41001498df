// tests/exchange_tests.rs
mod common;

use common::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use switchyard::processor::{Decorated, Hooks, StepInfo};
use switchyard::{CancelScope, Exchange, ExchangeError, Processor, SwitchyardError, Value, ValueKind};

#[derive(Debug, Clone, PartialEq)]
struct Order {
  id: u32,
  lines: Vec<String>,
}

#[test]
fn test_copy_gets_fresh_identities() {
  setup_tracing();
  let mut original = Exchange::detached();
  original.set_body("payload");

  let copy = original.copy();
  assert_ne!(copy.id(), original.id());
  assert_ne!(copy.message().id(), original.message().id());
  assert_eq!(copy.body(), original.body());
  assert_eq!(copy.created_at(), original.created_at());
}

#[test]
fn test_copy_never_aliases_body_headers_or_properties() {
  setup_tracing();
  let mut original = Exchange::detached();
  original.set_body(Value::List(vec![Value::from(1), Value::from(2)]));
  original.set_header("h", "one");
  original.set_property("p", "one");

  let mut copy = original.copy();
  if let Value::List(items) = copy.message_mut().body_mut() {
    items.push(Value::from(3));
  }
  copy.set_header("h", "two");
  copy.set_property("p", "two");
  copy.set_property("extra", true);

  assert_eq!(original.body().as_list().map(|items| items.len()), Some(2));
  assert_eq!(original.header("h"), Some(&Value::from("one")));
  assert_eq!(original.property("p"), Some(&Value::from("one")));
  assert!(original.property("extra").is_none());
}

#[test]
fn test_object_values_copy_themselves_and_shared_values_do_not() {
  setup_tracing();
  let mut original = Exchange::detached();
  original.set_body(Value::object(Order {
    id: 7,
    lines: vec!["widget".to_string()],
  }));
  original.set_property("cache", Value::shared(String::from("shared state")));

  let mut copy = original.copy();
  copy
    .message_mut()
    .body_mut()
    .downcast_mut::<Order>()
    .expect("order payload")
    .lines
    .push("gadget".to_string());

  let order = original.body().downcast_ref::<Order>().expect("order payload");
  assert_eq!(order.lines, vec!["widget".to_string()]);

  // Shared payloads compare by pointer identity.
  assert_eq!(copy.property("cache"), original.property("cache"));
}

#[test]
fn test_error_values_are_shared_between_copies() {
  setup_tracing();
  let mut original = Exchange::detached();
  let err = ExchangeError::msg("boom");
  original.set_error(err.clone());

  let copy = original.copy();
  assert!(copy.error().expect("copied error").same(&err));
  assert!(copy.is_error());
}

#[test]
fn test_as_map_projects_the_evaluation_environment() {
  setup_tracing();
  let mut exchange = Exchange::detached();
  exchange.set_body(42);
  exchange.set_header("kind", "order");
  exchange.set_property("tenant", "acme");

  let env = exchange.as_map();
  let keys: Vec<&str> = env.keys().map(String::as_str).collect();
  assert_eq!(keys, vec!["body", "error", "exchangeId", "header", "id", "property"]);
  assert_eq!(env["body"], Value::from(42));
  assert_eq!(env["error"], Value::Null);
  assert_eq!(env["exchangeId"], Value::from(exchange.id()));
  assert_eq!(env["id"], Value::from(exchange.message().id()));

  let mut headers = BTreeMap::new();
  headers.insert("kind".to_string(), Value::from("order"));
  assert_eq!(env["header"], Value::Map(headers));
  assert_eq!(env["property"].as_map().and_then(|m| m.get("tenant")), Some(&Value::from("acme")));
}

#[test]
fn test_cancelled_exchange_short_circuits_decorated_processor() {
  setup_tracing();
  reset_counters();
  let step = Decorated::new(
    StepInfo {
      route: "r".to_string(),
      step: "work".to_string(),
    },
    appending_processor("X"),
    Hooks::default(),
    false,
  );

  let mut exchange = Exchange::detached();
  exchange.set_body("");
  exchange.cancel();
  step.process(&mut exchange);

  assert_eq!(exchange.body(), &Value::from(""));
  let err = exchange.error().expect("cancellation error");
  assert!(matches!(err.downcast_ref::<SwitchyardError>(), Some(SwitchyardError::Cancelled)));
}

#[test]
fn test_deadline_is_inherited_and_reported_before_cancellation() {
  setup_tracing();
  let root = CancelScope::new();
  let scoped = root.with_timeout(Duration::from_millis(5));
  let exchange = Exchange::new(&scoped);
  assert!(exchange.scope().deadline().is_some());
  assert!(exchange.check_cancel_or_timeout().is_ok());

  thread::sleep(Duration::from_millis(15));
  root.cancel();
  assert!(matches!(
    exchange.check_cancel_or_timeout(),
    Err(SwitchyardError::DeadlineExceeded)
  ));
}

#[test]
fn test_timeout_beyond_instant_range_has_no_deadline() {
  let root = CancelScope::new().with_timeout(Duration::from_secs(60));
  let unbounded = root.with_timeout(Duration::MAX);
  assert_eq!(unbounded.deadline(), root.deadline());
  assert!(CancelScope::new().with_timeout(Duration::MAX).deadline().is_none());

  root.cancel();
  assert!(unbounded.is_cancelled());
}

#[test]
fn test_fork_does_not_cancel_its_source_but_source_reaches_fork() {
  setup_tracing();
  let source = Exchange::detached();
  let fork = source.fork();
  fork.cancel();
  assert!(source.check_cancel_or_timeout().is_ok());

  let other = source.fork();
  let plain_copy = source.copy();
  source.cancel();
  assert!(other.check_cancel_or_timeout().is_err());
  assert!(plain_copy.check_cancel_or_timeout().is_err());
}

#[test]
fn test_hooks_run_around_processor_even_when_it_errors() {
  setup_tracing();
  reset_counters();
  let seen = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));
  let pre_seen = seen.clone();
  let post_seen = seen.clone();
  let hooks = Hooks::new()
    .with_pre(move |info: &StepInfo, _: &mut Exchange| pre_seen.lock().push(format!("pre:{}", info.step)))
    .with_post(move |info: &StepInfo, exchange: &mut Exchange| {
      post_seen.lock().push(format!("post:{}:{}", info.step, exchange.is_error()))
    });
  let step = Decorated::new(
    StepInfo {
      route: "r".to_string(),
      step: "fail".to_string(),
    },
    failing_processor("nope"),
    hooks,
    false,
  );

  let exchange = run_processor(&step, "x");
  assert!(exchange.is_error());
  assert_eq!(*seen.lock(), vec!["pre:fail".to_string(), "post:fail:true".to_string()]);
}

#[test]
fn test_value_kind_names_parse() {
  assert_eq!("int".parse::<ValueKind>().ok(), Some(ValueKind::Int));
  assert_eq!("Boolean".parse::<ValueKind>().ok(), Some(ValueKind::Bool));
  assert_eq!("[]byte".parse::<ValueKind>().ok(), Some(ValueKind::Bytes));
  assert!("decimal".parse::<ValueKind>().is_err());
  assert_eq!(ValueKind::Duration.to_string(), "duration");
}
