// switchyard/src/eip/steps.rs

//! Leaf processors: message edits, errors, delays, logging, endpoint calls, data formats
//! and type conversion.

use crate::converter::{ConverterParams, ConverterRegistry};
use crate::core::exchange::Exchange;
use crate::core::value::{Value, ValueKind};
use crate::dataformat::DataFormat;
use crate::error::{ExchangeError, SwitchyardError, SwitchyardResult};
use crate::expression::{Expression, Template};
use crate::processor::{Processor, Producer};
use crate::runtime::endpoints::EndpointRegistry;
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{event, Level};

/// Sets the exchange error from the expression result when evaluation fails.
fn eval_or_fail(expression: &dyn Expression, exchange: &mut Exchange) -> Option<Value> {
  match expression.eval(exchange) {
    Ok(value) => Some(value),
    Err(err) => {
      exchange.set_error(err);
      None
    }
  }
}

pub struct SetBody {
  expression: Arc<dyn Expression>,
}

impl SetBody {
  pub fn new(expression: Arc<dyn Expression>) -> Self {
    Self { expression }
  }
}

impl Processor for SetBody {
  fn process(&self, exchange: &mut Exchange) {
    if let Some(value) = eval_or_fail(self.expression.as_ref(), exchange) {
      exchange.set_body(value);
    }
  }
}

pub struct SetHeader {
  name: String,
  expression: Arc<dyn Expression>,
}

impl SetHeader {
  pub fn new(name: impl Into<String>, expression: Arc<dyn Expression>) -> Self {
    Self {
      name: name.into(),
      expression,
    }
  }
}

impl Processor for SetHeader {
  fn process(&self, exchange: &mut Exchange) {
    if let Some(value) = eval_or_fail(self.expression.as_ref(), exchange) {
      exchange.set_header(self.name.clone(), value);
    }
  }
}

pub struct SetProperty {
  name: String,
  expression: Arc<dyn Expression>,
}

impl SetProperty {
  pub fn new(name: impl Into<String>, expression: Arc<dyn Expression>) -> Self {
    Self {
      name: name.into(),
      expression,
    }
  }
}

impl Processor for SetProperty {
  fn process(&self, exchange: &mut Exchange) {
    if let Some(value) = eval_or_fail(self.expression.as_ref(), exchange) {
      exchange.set_property(self.name.clone(), value);
    }
  }
}

pub struct RemoveHeader(pub String);

impl Processor for RemoveHeader {
  fn process(&self, exchange: &mut Exchange) {
    exchange.remove_header(&self.0);
  }
}

pub struct RemoveProperty(pub String);

impl Processor for RemoveProperty {
  fn process(&self, exchange: &mut Exchange) {
    exchange.remove_property(&self.0);
  }
}

/// Raises an error: an `Error` value is set as-is, anything else becomes its message.
pub struct SetError {
  expression: Arc<dyn Expression>,
}

impl SetError {
  pub fn new(expression: Arc<dyn Expression>) -> Self {
    Self { expression }
  }
}

impl Processor for SetError {
  fn process(&self, exchange: &mut Exchange) {
    if let Some(value) = eval_or_fail(self.expression.as_ref(), exchange) {
      let err = match value {
        Value::Error(err) => err,
        other => ExchangeError::msg(other.to_string()),
      };
      exchange.set_error(err);
    }
  }
}

const DELAY_SLICE: Duration = Duration::from_millis(10);

/// Sleeps for a duration (a `Duration` value, or integer milliseconds), waking up every
/// few milliseconds to honour cancellation and deadlines.
pub struct Delay {
  expression: Arc<dyn Expression>,
}

impl Delay {
  pub fn new(expression: Arc<dyn Expression>) -> Self {
    Self { expression }
  }
}

impl Processor for Delay {
  fn process(&self, exchange: &mut Exchange) {
    let Some(value) = eval_or_fail(self.expression.as_ref(), exchange) else {
      return;
    };
    let duration = match value {
      Value::Duration(d) => d,
      Value::Int(ms) if ms >= 0 => Duration::from_millis(ms as u64),
      other => {
        exchange.set_error(SwitchyardError::Conversion {
          from: other.kind().to_string(),
          to: "duration".to_string(),
          message: format!("'{}' is not a delay", other),
        });
        return;
      }
    };

    let Some(until) = Instant::now().checked_add(duration) else {
      exchange.set_error(SwitchyardError::Conversion {
        from: "duration".to_string(),
        to: "deadline".to_string(),
        message: format!("delay of {:?} is out of range", duration),
      });
      return;
    };
    loop {
      if let Err(err) = exchange.check_cancel_or_timeout() {
        exchange.set_error(err);
        return;
      }
      let now = Instant::now();
      if now >= until {
        return;
      }
      std::thread::sleep((until - now).min(DELAY_SLICE));
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
  Trace,
  Debug,
  #[default]
  Info,
  Warn,
  Error,
}

impl FromStr for LogLevel {
  type Err = SwitchyardError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "trace" => Ok(LogLevel::Trace),
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      other => Err(SwitchyardError::Conversion {
        from: other.to_string(),
        to: "log level".to_string(),
        message: "expected trace, debug, info, warn or error".to_string(),
      }),
    }
  }
}

pub struct Log {
  route: String,
  template: Template,
  level: LogLevel,
}

impl Log {
  pub fn new(route: impl Into<String>, template: Template, level: LogLevel) -> Self {
    Self {
      route: route.into(),
      template,
      level,
    }
  }
}

impl Processor for Log {
  fn process(&self, exchange: &mut Exchange) {
    let message = match self.template.render(exchange) {
      Ok(message) => message,
      Err(err) => {
        exchange.set_error(err);
        return;
      }
    };
    let route = self.route.as_str();
    let exchange_id = exchange.id();
    match self.level {
      LogLevel::Trace => event!(Level::TRACE, route, exchange_id, "{}", message),
      LogLevel::Debug => event!(Level::DEBUG, route, exchange_id, "{}", message),
      LogLevel::Info => event!(Level::INFO, route, exchange_id, "{}", message),
      LogLevel::Warn => event!(Level::WARN, route, exchange_id, "{}", message),
      LogLevel::Error => event!(Level::ERROR, route, exchange_id, "{}", message),
    }
  }
}

/// Sends the exchange to an endpoint. The endpoint is resolved through the shared cache on
/// first use and its producer is kept for later dispatches.
pub struct To {
  uri: String,
  endpoints: Arc<EndpointRegistry>,
  producer: Mutex<Option<Producer>>,
}

impl To {
  pub fn new(uri: impl Into<String>, endpoints: Arc<EndpointRegistry>) -> Self {
    Self {
      uri: uri.into(),
      endpoints,
      producer: Mutex::new(None),
    }
  }

  fn producer(&self) -> SwitchyardResult<Producer> {
    let mut slot = self.producer.lock();
    if let Some(producer) = slot.as_ref() {
      return Ok(producer.clone());
    }
    let producer = self.endpoints.resolve(&self.uri)?.create_producer()?;
    *slot = Some(producer.clone());
    Ok(producer)
  }
}

impl Processor for To {
  fn process(&self, exchange: &mut Exchange) {
    match self.producer() {
      Ok(producer) => producer.process(exchange),
      Err(err) => {
        event!(Level::WARN, uri = %self.uri, error = %err, "Cannot obtain producer.");
        exchange.set_error(err);
      }
    }
  }
}

pub struct Marshal {
  format: Arc<dyn DataFormat>,
}

impl Marshal {
  pub fn new(format: Arc<dyn DataFormat>) -> Self {
    Self { format }
  }
}

impl Processor for Marshal {
  fn process(&self, exchange: &mut Exchange) {
    match self.format.marshal(exchange.body()) {
      Ok(text) => exchange.set_body(text),
      Err(err) => exchange.set_error(err),
    }
  }
}

pub struct Unmarshal {
  format: Arc<dyn DataFormat>,
  target: Option<ValueKind>,
}

impl Unmarshal {
  pub fn new(format: Arc<dyn DataFormat>, target: Option<ValueKind>) -> Self {
    Self { format, target }
  }
}

impl Processor for Unmarshal {
  fn process(&self, exchange: &mut Exchange) {
    let result = match exchange.body().as_bytes() {
      Some(bytes) => self.format.unmarshal(bytes, self.target),
      None => Err(SwitchyardError::DataFormat {
        format: self.format.name().to_string(),
        message: format!("cannot unmarshal a {} body", exchange.body().kind()),
      }),
    };
    match result {
      Ok(value) => exchange.set_body(value),
      Err(err) => exchange.set_error(err),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertTarget {
  Body,
  Header(String),
  Property(String),
}

/// Converts the body, a header or a property in place. A missing header or property is
/// left missing.
pub struct Convert {
  target: ConvertTarget,
  to: ValueKind,
  params: ConverterParams,
  converters: Arc<ConverterRegistry>,
}

impl Convert {
  pub fn new(target: ConvertTarget, to: ValueKind, params: ConverterParams, converters: Arc<ConverterRegistry>) -> Self {
    Self {
      target,
      to,
      params,
      converters,
    }
  }
}

impl Processor for Convert {
  fn process(&self, exchange: &mut Exchange) {
    let current = match &self.target {
      ConvertTarget::Body => Some(exchange.body()),
      ConvertTarget::Header(name) => exchange.header(name),
      ConvertTarget::Property(name) => exchange.property(name),
    };
    let Some(current) = current else {
      return;
    };
    match self.converters.convert(current, self.to, &self.params) {
      Ok(converted) => match &self.target {
        ConvertTarget::Body => exchange.set_body(converted),
        ConvertTarget::Header(name) => exchange.set_header(name.clone(), converted),
        ConvertTarget::Property(name) => exchange.set_property(name.clone(), converted),
      },
      Err(err) => exchange.set_error(err),
    }
  }
}
