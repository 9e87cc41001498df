// switchyard/src/processor/invoke.rs

use super::Processor;
use crate::core::exchange::Exchange;
use crate::error::SwitchyardError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{event, Level};

/// Runs `processor` with fault containment.
///
/// A panic is recovered and turned into a `SwitchyardError::Panic` on the exchange.
/// Returns `true` if a panic occurred.
pub fn invoke(processor: &dyn Processor, exchange: &mut Exchange) -> bool {
  match catch_unwind(AssertUnwindSafe(|| processor.process(exchange))) {
    Ok(()) => false,
    Err(payload) => {
      let message = panic_message(payload.as_ref());
      event!(
        Level::ERROR,
        exchange_id = %exchange.id(),
        panic = %message,
        "Recovered panic from processor."
      );
      exchange.set_error(SwitchyardError::Panic { message });
      true
    }
  }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
