// switchyard/src/eip/loops.rs

//! Count-bounded and predicate-bounded loops.
//!
//! Each iteration runs the body over a copy of the working exchange (sharing its cancel
//! scope) that is merged back once the iteration ends. The zero-based iteration index is
//! exposed as the `CAMEL_LOOP_INDEX` property.

use crate::core::exchange::Exchange;
use crate::core::value::Value;
use crate::error::SwitchyardError;
use crate::expression::{Expression, Predicate};
use crate::processor::{invoke, Processor, ProcessorRef};
use std::sync::Arc;
use tracing::{event, Level};

pub const LOOP_INDEX_PROPERTY: &str = "CAMEL_LOOP_INDEX";

/// What a `while` loop does when its predicate fails to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopPredicateErrors {
  /// Stop looping and leave the exchange without error.
  #[default]
  ClearAndStop,
  /// Stop looping and set the evaluation error on the exchange.
  Propagate,
}

pub enum LoopMode {
  /// Evaluated once, before the first iteration.
  Count(Arc<dyn Expression>),
  While(Predicate, LoopPredicateErrors),
}

pub struct Loop {
  mode: LoopMode,
  body: ProcessorRef,
}

impl Loop {
  pub fn new(mode: LoopMode, body: ProcessorRef) -> Self {
    Self { mode, body }
  }

  /// Runs one iteration; returns `false` once the body left an error.
  fn iterate(&self, exchange: &mut Exchange, index: usize) -> bool {
    exchange.set_property(LOOP_INDEX_PROPERTY, index);
    let mut iteration = exchange.copy();
    invoke(self.body.as_ref(), &mut iteration);
    exchange.absorb(iteration);
    if let Some(err) = exchange.error() {
      event!(Level::DEBUG, iteration = index, error = %err, "Loop body failed.");
      return false;
    }
    true
  }

  fn run_count(&self, exchange: &mut Exchange, count: &Arc<dyn Expression>) {
    let times = match count.eval(exchange).and_then(|value| loop_count(&value)) {
      Ok(times) => times,
      Err(err) => {
        exchange.set_error(err);
        return;
      }
    };
    event!(Level::TRACE, times, "Count loop starting.");
    for index in 0..times {
      if !self.iterate(exchange, index) {
        return;
      }
    }
  }

  fn run_while(&self, exchange: &mut Exchange, predicate: &Predicate, on_error: LoopPredicateErrors) {
    let mut index = 0;
    loop {
      exchange.set_property(LOOP_INDEX_PROPERTY, index);
      match predicate.matches(exchange) {
        Ok(true) => {}
        Ok(false) => return,
        Err(err) => {
          event!(Level::DEBUG, iteration = index, error = %err, "Loop predicate failed.");
          match on_error {
            LoopPredicateErrors::ClearAndStop => exchange.clear_error(),
            LoopPredicateErrors::Propagate => exchange.set_error(err),
          }
          return;
        }
      }
      if !self.iterate(exchange, index) {
        return;
      }
      index += 1;
    }
  }
}

impl Processor for Loop {
  fn process(&self, exchange: &mut Exchange) {
    match &self.mode {
      LoopMode::Count(count) => self.run_count(exchange, count),
      LoopMode::While(predicate, on_error) => self.run_while(exchange, predicate, *on_error),
    }
  }
}

fn loop_count(value: &Value) -> Result<usize, SwitchyardError> {
  let invalid = |message: &str| SwitchyardError::Conversion {
    from: value.kind().to_string(),
    to: "loop count".to_string(),
    message: message.to_string(),
  };
  let count = match value {
    Value::Int(i) => *i,
    Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid("not an integer"))?,
    Value::Float(f) if f.fract() == 0.0 => *f as i64,
    _ => return Err(invalid("not an integer")),
  };
  usize::try_from(count).map_err(|_| invalid("must not be negative"))
}
