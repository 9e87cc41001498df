// switchyard/src/processor/mod.rs

//! The uniform execution interface of every route step.
//!
//! `Processor::process` is synchronous and side-effecting. Failure is reported by setting
//! the exchange's error slot, never by returning or panicking.

pub mod decorator;
pub mod invoke;

use crate::core::exchange::Exchange;
use std::sync::Arc;

pub use decorator::{Decorated, Hook, Hooks, StepInfo};
pub use invoke::invoke;

pub trait Processor: Send + Sync {
  fn process(&self, exchange: &mut Exchange);
}

pub type ProcessorRef = Arc<dyn Processor>;

/// A producer fires exactly one exchange synchronously; it is just a processor.
pub type Producer = ProcessorRef;

impl<F> Processor for F
where
  F: Fn(&mut Exchange) + Send + Sync,
{
  fn process(&self, exchange: &mut Exchange) {
    self(exchange)
  }
}

/// Adapts a fallible user callback: an `Err` becomes the exchange error.
pub struct FnProcessor<F>(F);

impl<F> FnProcessor<F>
where
  F: Fn(&mut Exchange) -> anyhow::Result<()> + Send + Sync,
{
  pub fn new(f: F) -> Self {
    FnProcessor(f)
  }
}

impl<F> Processor for FnProcessor<F>
where
  F: Fn(&mut Exchange) -> anyhow::Result<()> + Send + Sync,
{
  fn process(&self, exchange: &mut Exchange) {
    if let Err(err) = (self.0)(exchange) {
      exchange.set_error(err);
    }
  }
}

/// Wraps a fallible callback as a shared processor.
pub fn from_fn<F>(f: F) -> ProcessorRef
where
  F: Fn(&mut Exchange) -> anyhow::Result<()> + Send + Sync + 'static,
{
  Arc::new(FnProcessor::new(f))
}
