// switchyard/src/runtime/mod.rs

//! The `Runtime`: registries, route registration, lifecycle and synchronous dispatch.
//!
//! A runtime owns every registry it uses, so several runtimes can live in one process.
//! Lifecycle transitions (`start`, `stop`) take the state lock exclusively; `send*`
//! calls take it shared while resolving their endpoint and therefore wait for a
//! transition in progress.

pub mod endpoints;
pub mod registry;

use crate::component::{Component, Consumer, ConsumerContext, DirectComponent, TimerComponent};
use crate::config::RuntimeConfig;
use crate::converter::{ConverterParams, ConverterRegistry};
use crate::core::cancel::CancelScope;
use crate::core::exchange::Exchange;
use crate::core::value::{Value, ValueKind};
use crate::dataformat::{DataFormat, JsonDataFormat};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::processor::{from_fn, invoke, Hooks, ProcessorRef};
use crate::route::{compile, CompileContext, Route, RouteBuilder, RouteDefinition};
use endpoints::EndpointRegistry;
use parking_lot::{Mutex, RwLock};
use registry::NamedRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Created,
  Started,
  Stopped,
}

struct ActiveConsumer {
  route: String,
  consumer: Box<dyn Consumer>,
}

pub struct Runtime {
  config: RuntimeConfig,
  functions: NamedRegistry<ProcessorRef>,
  components: Arc<NamedRegistry<Arc<dyn Component>>>,
  data_formats: NamedRegistry<Arc<dyn DataFormat>>,
  converters: Arc<ConverterRegistry>,
  endpoints: Arc<EndpointRegistry>,
  routes: RwLock<BTreeMap<String, Route>>,
  consumers: Mutex<Vec<ActiveConsumer>>,
  hooks: RwLock<Hooks>,
  scope: CancelScope,
  state: RwLock<LifecycleState>,
}

impl Default for Runtime {
  fn default() -> Self {
    Self::new(RuntimeConfig::default())
  }
}

impl Runtime {
  /// Creates a runtime with the `direct` and `timer` components, the `json` data format
  /// and the built-in converters registered.
  pub fn new(config: RuntimeConfig) -> Self {
    let components: Arc<NamedRegistry<Arc<dyn Component>>> = Arc::new(NamedRegistry::with_items(
      "component",
      [
        ("direct", Arc::new(DirectComponent::new()) as Arc<dyn Component>),
        (
          "timer",
          Arc::new(TimerComponent::new(config.timer_default_period)) as Arc<dyn Component>,
        ),
      ],
    ));
    let data_formats = NamedRegistry::with_items(
      "data format",
      [("json", Arc::new(JsonDataFormat::new()) as Arc<dyn DataFormat>)],
    );
    let endpoints = Arc::new(EndpointRegistry::new(components.clone()));

    event!(Level::DEBUG, runtime = %config.name, "Runtime created.");
    Self {
      config,
      functions: NamedRegistry::new("function"),
      components,
      data_formats,
      converters: Arc::new(ConverterRegistry::new()),
      endpoints,
      routes: RwLock::new(BTreeMap::new()),
      consumers: Mutex::new(Vec::new()),
      hooks: RwLock::new(Hooks::default()),
      scope: CancelScope::new(),
      state: RwLock::new(LifecycleState::Created),
    }
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  pub fn state(&self) -> LifecycleState {
    *self.state.read()
  }

  pub fn is_started(&self) -> bool {
    self.state() == LifecycleState::Started
  }

  /// The runtime-wide cancellation scope; every exchange the runtime creates lives in a child.
  pub fn scope(&self) -> &CancelScope {
    &self.scope
  }

  // --- Registries ---

  /// Registers a function callable from routes with `process(name)`.
  pub fn register_function<F>(&self, name: impl Into<String>, function: F) -> SwitchyardResult<()>
  where
    F: Fn(&mut Exchange) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.functions.register(name, from_fn(function))
  }

  /// Registers an existing processor as a function.
  pub fn register_processor(&self, name: impl Into<String>, processor: ProcessorRef) -> SwitchyardResult<()> {
    self.functions.register(name, processor)
  }

  /// Registers a component under its own id.
  pub fn register_component(&self, component: Arc<dyn Component>) -> SwitchyardResult<()> {
    let id = component.id().to_string();
    self.components.register(id, component)
  }

  pub fn register_data_format(&self, name: impl Into<String>, format: Arc<dyn DataFormat>) -> SwitchyardResult<()> {
    self.data_formats.register(name, format)
  }

  /// Adds or replaces the converter between two kinds.
  pub fn register_converter<F>(&self, from: ValueKind, to: ValueKind, converter: F)
  where
    F: Fn(&Value, &ConverterParams) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    self.converters.register(from, to, converter);
  }

  pub fn converters(&self) -> &Arc<ConverterRegistry> {
    &self.converters
  }

  pub fn component(&self, id: &str) -> Option<Arc<dyn Component>> {
    self.components.get(id)
  }

  pub fn data_format(&self, name: &str) -> Option<Arc<dyn DataFormat>> {
    self.data_formats.get(name)
  }

  /// Sets the step hooks applied to routes registered from now on.
  pub fn set_hooks(&self, hooks: Hooks) {
    *self.hooks.write() = hooks;
  }

  // --- Routes ---

  /// Compiles and stores a route. On a started runtime its consumer starts right away.
  #[instrument(name = "Runtime::register_route", skip_all, fields(route = %definition.name), err(Display))]
  pub fn register_route(&self, definition: RouteDefinition) -> SwitchyardResult<()> {
    let state = self.state.read();
    if *state == LifecycleState::Stopped {
      return Err(SwitchyardError::Lifecycle(
        "cannot register routes on a stopped runtime".to_string(),
      ));
    }
    if self.routes.read().contains_key(&definition.name) {
      return Err(SwitchyardError::DuplicateRoute {
        name: definition.name.clone(),
      });
    }

    let context = CompileContext {
      functions: &self.functions,
      data_formats: &self.data_formats,
      converters: &self.converters,
      endpoints: &self.endpoints,
      hooks: self.hooks.read().clone(),
      track_history: self.config.track_history,
    };
    let route = compile(&definition, &context)?;

    let mut routes = self.routes.write();
    if routes.contains_key(route.name()) {
      return Err(SwitchyardError::DuplicateRoute {
        name: route.name().to_string(),
      });
    }
    if *state == LifecycleState::Started {
      let active = self.start_consumer(&route)?;
      self.consumers.lock().push(active);
    }
    event!(Level::INFO, from = %route.from(), "Route registered.");
    routes.insert(route.name().to_string(), route);
    Ok(())
  }

  /// Builds the route and registers it.
  pub fn add_route(&self, builder: RouteBuilder) -> SwitchyardResult<()> {
    self.register_route(builder.build()?)
  }

  pub fn route(&self, name: &str) -> Option<Route> {
    self.routes.read().get(name).cloned()
  }

  /// Registered route names, sorted.
  pub fn route_names(&self) -> Vec<String> {
    self.routes.read().keys().cloned().collect()
  }

  // --- Lifecycle ---

  fn start_consumer(&self, route: &Route) -> SwitchyardResult<ActiveConsumer> {
    let endpoint = self.endpoints.resolve(route.from())?;
    let mut consumer = endpoint.create_consumer(ConsumerContext {
      route: route.name().to_string(),
      processor: route.processor().clone(),
      scope: self.scope.clone(),
      exchange_timeout: self.config.exchange_timeout,
    })?;
    consumer.start()?;
    event!(Level::DEBUG, route = %route.name(), from = %route.from(), "Consumer started.");
    Ok(ActiveConsumer {
      route: route.name().to_string(),
      consumer,
    })
  }

  /// Starts a consumer for every registered route. If any fails, the ones already started
  /// are stopped again and the runtime stays un-started.
  #[instrument(name = "Runtime::start", skip_all, fields(runtime = %self.config.name), err(Display))]
  pub fn start(&self) -> SwitchyardResult<()> {
    let mut state = self.state.write();
    match *state {
      LifecycleState::Created => {}
      LifecycleState::Started => return Err(SwitchyardError::Lifecycle("runtime is already started".to_string())),
      LifecycleState::Stopped => {
        return Err(SwitchyardError::Lifecycle(
          "a stopped runtime cannot be started again".to_string(),
        ))
      }
    }

    let routes: Vec<Route> = self.routes.read().values().cloned().collect();
    let mut started: Vec<ActiveConsumer> = Vec::with_capacity(routes.len());
    for route in &routes {
      match self.start_consumer(route) {
        Ok(active) => started.push(active),
        Err(err) => {
          event!(Level::ERROR, route = %route.name(), error = %err, "Route failed to start, rolling back.");
          for mut active in started.into_iter().rev() {
            if let Err(stop_err) = active.consumer.stop() {
              event!(Level::WARN, route = %active.route, error = %stop_err, "Consumer failed to stop during rollback.");
            }
          }
          return Err(err);
        }
      }
    }

    self.consumers.lock().extend(started);
    *state = LifecycleState::Started;
    event!(Level::INFO, routes = routes.len(), "Runtime started.");
    Ok(())
  }

  /// Cancels the runtime scope, stops every consumer and clears all registries.
  /// Stopping twice is a no-op.
  #[instrument(name = "Runtime::stop", skip_all, fields(runtime = %self.config.name), err(Display))]
  pub fn stop(&self) -> SwitchyardResult<()> {
    let consumers = {
      let mut state = self.state.write();
      if *state == LifecycleState::Stopped {
        event!(Level::DEBUG, "Runtime already stopped.");
        return Ok(());
      }
      *state = LifecycleState::Stopped;
      self.scope.cancel();
      std::mem::take(&mut *self.consumers.lock())
    };

    let mut first_error: Option<SwitchyardError> = None;
    for mut active in consumers.into_iter().rev() {
      if let Err(err) = active.consumer.stop() {
        event!(Level::WARN, route = %active.route, error = %err, "Consumer failed to stop.");
        first_error.get_or_insert(err);
      }
    }

    self.routes.write().clear();
    self.functions.clear();
    self.components.clear();
    self.data_formats.clear();
    self.converters.clear();
    self.endpoints.clear();
    event!(Level::INFO, "Runtime stopped.");

    match first_error {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  // --- Synchronous dispatch ---

  /// A fresh exchange in a child of the runtime scope, carrying the configured deadline.
  pub fn new_exchange(&self) -> Exchange {
    match self.config.exchange_timeout {
      Some(timeout) => Exchange::new(&self.scope.with_timeout(timeout)),
      None => Exchange::new(&self.scope),
    }
  }

  /// Sends a new exchange, prepared by `configure`, to `uri` and returns it once processed.
  /// Errors raised while processing stay on the returned exchange.
  pub fn send<F>(&self, uri: &str, configure: F) -> SwitchyardResult<Exchange>
  where
    F: FnOnce(&mut Exchange),
  {
    let producer = {
      let state = self.state.read();
      if *state == LifecycleState::Stopped {
        return Err(SwitchyardError::Lifecycle("runtime is stopped".to_string()));
      }
      self.endpoints.resolve(uri)?.create_producer()?
    };

    let mut exchange = self.new_exchange();
    configure(&mut exchange);
    event!(Level::TRACE, uri, exchange_id = %exchange.id(), "Sending exchange.");
    invoke(producer.as_ref(), &mut exchange);
    Ok(exchange)
  }

  /// Sends `body` and returns the resulting body, or the error the exchange ended with.
  pub fn send_body(&self, uri: &str, body: impl Into<Value>) -> SwitchyardResult<Value> {
    let body = body.into();
    let exchange = self.send(uri, move |exchange| exchange.set_body(body))?;
    into_body(exchange)
  }

  /// Sends `body` with `headers` and returns the resulting body, or the exchange error.
  pub fn send_headers<I, K, V>(&self, uri: &str, body: impl Into<Value>, headers: I) -> SwitchyardResult<Value>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
  {
    let body = body.into();
    let exchange = self.send(uri, move |exchange| {
      for (name, value) in headers {
        exchange.set_header(name, value);
      }
      exchange.set_body(body);
    })?;
    into_body(exchange)
  }
}

fn into_body(mut exchange: Exchange) -> SwitchyardResult<Value> {
  if let Some(err) = exchange.take_error() {
    return Err(SwitchyardError::Exchange(err));
  }
  Ok(exchange.message_mut().take_body())
}

impl Drop for Runtime {
  fn drop(&mut self) {
    if *self.state.get_mut() == LifecycleState::Started {
      if let Err(err) = self.stop() {
        event!(Level::WARN, error = %err, "Runtime did not stop cleanly on drop.");
      }
    }
  }
}
