// switchyard/src/eip/multicast.rs

//! Multicast: the same exchange sent to several outputs, each over its own copy.
//!
//! Every output receives a fork of the input exchange (independent data, child cancel
//! scope). Sequential mode runs outputs in order and honours `stop_on_error`; parallel
//! mode runs one thread per output and always waits for all of them. Branch results are
//! folded by the aggregator in declaration order, whatever order they finished in.

use crate::core::exchange::Exchange;
use crate::error::{ExchangeError, SwitchyardError};
use crate::processor::invoke::panic_message;
use crate::processor::{invoke, Processor, ProcessorRef};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{event, Level};

/// Combines branch results: called once per output, in order, as a left fold.
pub trait Aggregator: Send + Sync {
  fn aggregate(&self, accumulator: Option<Exchange>, next: Exchange) -> Exchange;
}

impl<F> Aggregator for F
where
  F: Fn(Option<Exchange>, Exchange) -> Exchange + Send + Sync,
{
  fn aggregate(&self, accumulator: Option<Exchange>, next: Exchange) -> Exchange {
    self(accumulator, next)
  }
}

pub type AggregatorRef = Arc<dyn Aggregator>;

impl Aggregator for AggregatorRef {
  fn aggregate(&self, accumulator: Option<Exchange>, next: Exchange) -> Exchange {
    (**self).aggregate(accumulator, next)
  }
}

pub struct Multicast {
  outputs: Vec<ProcessorRef>,
  parallel: bool,
  stop_on_error: bool,
  aggregator: Option<AggregatorRef>,
}

impl Multicast {
  pub fn new(
    outputs: Vec<ProcessorRef>,
    parallel: bool,
    stop_on_error: bool,
    aggregator: Option<AggregatorRef>,
  ) -> Self {
    Self {
      outputs,
      parallel,
      stop_on_error,
      aggregator,
    }
  }

  fn run_sequential(&self, exchange: &Exchange) -> (Vec<Exchange>, Option<ExchangeError>) {
    let mut branches = Vec::with_capacity(self.outputs.len());
    for (output_idx, output) in self.outputs.iter().enumerate() {
      let mut branch = exchange.fork();
      invoke(output.as_ref(), &mut branch);
      let failure = branch.error().cloned();
      branches.push(branch);
      if let Some(err) = failure {
        if self.stop_on_error {
          event!(
            Level::DEBUG,
            output_index = output_idx,
            error = %err,
            "Multicast stopped on branch error."
          );
          return (branches, Some(err));
        }
      }
    }
    (branches, None)
  }

  fn run_parallel(&self, exchange: &Exchange) -> Vec<Exchange> {
    thread::scope(|scope| {
      let handles: Vec<_> = self
        .outputs
        .iter()
        .map(|output| {
          let mut branch = exchange.fork();
          scope.spawn(move || {
            invoke(output.as_ref(), &mut branch);
            branch
          })
        })
        .collect();

      handles
        .into_iter()
        .map(|handle| {
          handle.join().unwrap_or_else(|payload| {
            // invoke contains processor panics; this only covers a failure of the branch thread itself.
            let mut lost = exchange.fork();
            lost.set_error(SwitchyardError::Panic {
              message: panic_message(payload.as_ref()),
            });
            lost
          })
        })
        .collect()
    })
  }
}

impl Processor for Multicast {
  fn process(&self, exchange: &mut Exchange) {
    event!(
      Level::DEBUG,
      outputs = self.outputs.len(),
      parallel = self.parallel,
      "Multicast dispatching."
    );

    let (branches, failure) = if self.parallel {
      (self.run_parallel(exchange), None)
    } else {
      self.run_sequential(exchange)
    };

    if let Some(aggregator) = &self.aggregator {
      let folded = catch_unwind(AssertUnwindSafe(|| {
        branches
          .into_iter()
          .fold(None, |accumulator, next| Some(aggregator.aggregate(accumulator, next)))
      }));
      match folded {
        Ok(Some(result)) => exchange.absorb(result),
        Ok(None) => {}
        Err(payload) => {
          let message = panic_message(payload.as_ref());
          event!(Level::ERROR, panic = %message, "Recovered panic from aggregator.");
          exchange.set_error(SwitchyardError::Panic { message });
          return;
        }
      }
    }

    if let Some(err) = failure {
      exchange.set_error(err);
    }
  }
}
