// switchyard/src/route/mod.rs

//! Route definitions, the nested builder, and their compilation into processors.

pub mod builder;
pub mod compiler;
pub mod definition;

use crate::core::exchange::Exchange;
use crate::processor::ProcessorRef;
use std::fmt;

pub use builder::{aggregator, RouteBuilder};
pub use compiler::{compile, CompileContext};
pub use definition::{AggregatorDef, CatchDef, LoopDef, RouteDefinition, RouteStep, WhenDef};

/// A compiled route; immutable once built.
#[derive(Clone)]
pub struct Route {
  name: String,
  from: String,
  processor: ProcessorRef,
}

impl Route {
  pub(crate) fn new(name: String, from: String, processor: ProcessorRef) -> Self {
    Self { name, from, processor }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn from(&self) -> &str {
    &self.from
  }

  pub fn processor(&self) -> &ProcessorRef {
    &self.processor
  }

  /// Runs the route's processor directly, bypassing its source endpoint.
  pub fn process(&self, exchange: &mut Exchange) {
    self.processor.process(exchange);
  }
}

impl fmt::Debug for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Route")
      .field("name", &self.name)
      .field("from", &self.from)
      .finish()
  }
}
