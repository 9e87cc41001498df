// switchyard/src/component/mod.rs

//! Transport contracts. A `Component` creates `Endpoint`s for URIs of its scheme; an
//! endpoint creates inbound `Consumer`s and outbound producers.

pub mod direct;
pub mod timer;
pub mod uri;

use crate::core::cancel::CancelScope;
use crate::core::exchange::Exchange;
use crate::error::SwitchyardResult;
use crate::processor::{ProcessorRef, Producer};
use std::sync::Arc;
use std::time::Duration;

pub use direct::DirectComponent;
pub use timer::TimerComponent;
pub use uri::Uri;

pub trait Component: Send + Sync {
  /// The URI scheme served by this component.
  fn id(&self) -> &str;

  fn create_endpoint(&self, uri: &Uri) -> SwitchyardResult<Arc<dyn Endpoint>>;
}

pub trait Endpoint: Send + Sync {
  fn uri(&self) -> &Uri;

  fn create_consumer(&self, context: ConsumerContext) -> SwitchyardResult<Box<dyn Consumer>>;

  fn create_producer(&self) -> SwitchyardResult<Producer>;
}

/// Owns its dispatch loop and runs the bound processor once per inbound unit.
pub trait Consumer: Send {
  fn start(&mut self) -> SwitchyardResult<()>;

  fn stop(&mut self) -> SwitchyardResult<()>;
}

/// What a consumer needs to dispatch: the route's processor and the way the runtime wants
/// inbound exchanges created.
#[derive(Clone)]
pub struct ConsumerContext {
  pub route: String,
  pub processor: ProcessorRef,
  pub scope: CancelScope,
  pub exchange_timeout: Option<Duration>,
}

impl ConsumerContext {
  /// A fresh exchange in a child of the runtime scope, with the configured deadline.
  pub fn new_exchange(&self) -> Exchange {
    match self.exchange_timeout {
      Some(timeout) => Exchange::new(&self.scope.with_timeout(timeout)),
      None => Exchange::new(&self.scope),
    }
  }
}
