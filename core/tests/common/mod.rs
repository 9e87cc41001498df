// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper

use once_cell::sync::Lazy;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use switchyard::{Exchange, Processor, ProcessorRef, Route, RouteBuilder, Runtime, RuntimeConfig, Value};
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("mandatory parameter missing")]
  MissingParameter,

  #[error("Test handler failed: {0}")]
  Handler(String),
}

// --- Helper for Tracing Setup ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static HANDLER_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static TIMER_FIRE_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
  TIMER_FIRE_COUNTER.store(0, Ordering::SeqCst);
}

// --- Processors ---

/// Counts every call and appends `tag` to a string body.
pub fn appending_processor(tag: &'static str) -> ProcessorRef {
  Arc::new(move |exchange: &mut Exchange| {
    HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
    let current = exchange.body().as_str().unwrap_or_default().to_string();
    exchange.set_body(format!("{}{}", current, tag));
  })
}

/// Sets `TestError::Handler(message)` on the exchange.
pub fn failing_processor(message: &'static str) -> ProcessorRef {
  Arc::new(move |exchange: &mut Exchange| {
    HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
    exchange.set_error(switchyard::ExchangeError::new(TestError::Handler(message.to_string())));
  })
}

pub fn panicking_processor(message: &'static str) -> ProcessorRef {
  Arc::new(move |_exchange: &mut Exchange| {
    panic!("{}", message);
  })
}

// --- Runtime helpers ---

pub fn runtime() -> Runtime {
  Runtime::new(RuntimeConfig::default().with_name("test"))
}

/// Builds, registers and fetches a compiled route.
pub fn register(runtime: &Runtime, builder: RouteBuilder) -> Route {
  let definition = builder.build().expect("route should build");
  let name = definition.name.clone();
  runtime.register_route(definition).expect("route should register");
  runtime.route(&name).expect("route should be registered")
}

/// Runs `route` on a detached exchange carrying `body`.
pub fn run(route: &Route, body: impl Into<Value>) -> Exchange {
  let mut exchange = Exchange::detached();
  exchange.set_body(body);
  route.process(&mut exchange);
  exchange
}

/// Runs a bare processor on a detached exchange carrying `body`.
pub fn run_processor(processor: &dyn Processor, body: impl Into<Value>) -> Exchange {
  let mut exchange = Exchange::detached();
  exchange.set_body(body);
  processor.process(&mut exchange);
  exchange
}
