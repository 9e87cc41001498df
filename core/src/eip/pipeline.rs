// switchyard/src/eip/pipeline.rs

use crate::core::exchange::Exchange;
use crate::processor::{Processor, ProcessorRef};
use tracing::{event, Level};

/// Runs steps strictly in sequence on one shared exchange.
///
/// With `stop_on_error`, the first step leaving the exchange in error ends the pipeline.
/// Without it every step runs, so later steps may inspect or clear the error.
pub struct Pipeline {
  steps: Vec<ProcessorRef>,
  stop_on_error: bool,
}

impl Pipeline {
  pub fn new(steps: Vec<ProcessorRef>, stop_on_error: bool) -> Self {
    Self { steps, stop_on_error }
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

impl Processor for Pipeline {
  fn process(&self, exchange: &mut Exchange) {
    for (step_idx, step) in self.steps.iter().enumerate() {
      step.process(exchange);
      if self.stop_on_error && exchange.is_error() {
        event!(
          Level::DEBUG,
          step_index = step_idx,
          remaining = self.steps.len() - step_idx - 1,
          "Pipeline stopped on error."
        );
        return;
      }
    }
  }
}
