// switchyard/src/component/direct.rs

//! `direct:` endpoints: synchronous in-process hand-off to the route consuming the name.

use super::{Component, Consumer, ConsumerContext, Endpoint, Uri};
use crate::core::exchange::Exchange;
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::processor::{Processor, ProcessorRef, Producer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

type ConsumerTable = Arc<RwLock<HashMap<String, ProcessorRef>>>;

#[derive(Default)]
pub struct DirectComponent {
  consumers: ConsumerTable,
}

impl DirectComponent {
  pub fn new() -> Self {
    Self::default()
  }

  /// Names with a running consumer.
  pub fn active(&self) -> Vec<String> {
    let mut names: Vec<String> = self.consumers.read().keys().cloned().collect();
    names.sort();
    names
  }
}

impl Component for DirectComponent {
  fn id(&self) -> &str {
    "direct"
  }

  fn create_endpoint(&self, uri: &Uri) -> SwitchyardResult<Arc<dyn Endpoint>> {
    let name = uri.name();
    if name.is_empty() {
      return Err(SwitchyardError::InvalidUri {
        uri: uri.to_string(),
        message: "direct endpoints need a name".to_string(),
      });
    }
    Ok(Arc::new(DirectEndpoint {
      uri: uri.clone(),
      name: name.to_string(),
      consumers: self.consumers.clone(),
    }))
  }
}

struct DirectEndpoint {
  uri: Uri,
  name: String,
  consumers: ConsumerTable,
}

impl Endpoint for DirectEndpoint {
  fn uri(&self) -> &Uri {
    &self.uri
  }

  fn create_consumer(&self, context: ConsumerContext) -> SwitchyardResult<Box<dyn Consumer>> {
    Ok(Box::new(DirectConsumer {
      name: self.name.clone(),
      processor: context.processor,
      consumers: self.consumers.clone(),
      started: false,
    }))
  }

  fn create_producer(&self) -> SwitchyardResult<Producer> {
    Ok(Arc::new(DirectProducer {
      uri: self.uri.to_string(),
      name: self.name.clone(),
      consumers: self.consumers.clone(),
    }))
  }
}

struct DirectConsumer {
  name: String,
  processor: ProcessorRef,
  consumers: ConsumerTable,
  started: bool,
}

impl Consumer for DirectConsumer {
  fn start(&mut self) -> SwitchyardResult<()> {
    let mut consumers = self.consumers.write();
    if consumers.contains_key(&self.name) {
      return Err(SwitchyardError::DuplicateRegistration {
        kind: "direct consumer",
        name: self.name.clone(),
      });
    }
    consumers.insert(self.name.clone(), self.processor.clone());
    self.started = true;
    event!(Level::DEBUG, endpoint = %self.name, "Direct consumer started.");
    Ok(())
  }

  fn stop(&mut self) -> SwitchyardResult<()> {
    if std::mem::take(&mut self.started) {
      self.consumers.write().remove(&self.name);
      event!(Level::DEBUG, endpoint = %self.name, "Direct consumer stopped.");
    }
    Ok(())
  }
}

struct DirectProducer {
  uri: String,
  name: String,
  consumers: ConsumerTable,
}

impl Processor for DirectProducer {
  fn process(&self, exchange: &mut Exchange) {
    // Clone out of the lock: the consumer may itself send to direct endpoints.
    let target = self.consumers.read().get(&self.name).cloned();
    match target {
      Some(processor) => processor.process(exchange),
      None => exchange.set_error(SwitchyardError::NoConsumer { uri: self.uri.clone() }),
    }
  }
}
