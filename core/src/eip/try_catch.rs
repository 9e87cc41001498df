// switchyard/src/eip/try_catch.rs

//! Structured error handling over the exchange error slot: try, catch, finally.

use crate::core::exchange::Exchange;
use crate::core::value::Value;
use crate::error::{ExchangeError, SwitchyardError};
use crate::processor::{invoke, ProcessorRef, Processor};
use regex::Regex;
use std::fmt;
use tracing::{event, Level};

/// Property holding the caught error while a catch handler runs.
pub const EXCEPTION_CAUGHT_PROPERTY: &str = "CAMEL_EXCEPTION_CAUGHT";

/// Decides whether a catch clause handles an error.
#[derive(Clone)]
pub enum ErrorMatcher {
  Any,
  /// Some message of the cause chain equals the text exactly.
  Equals(String),
  /// The full cause chain contains the text, ignoring case.
  Contains(String),
  /// Some error of the cause chain is of a given type.
  Is {
    type_name: &'static str,
    test: fn(&ExchangeError) -> bool,
  },
  /// The error is, or wraps, this exact error instance.
  Identity(ExchangeError),
  Regex(Regex),
}

fn is_type<E: std::error::Error + 'static>(err: &ExchangeError) -> bool {
  err.is::<E>()
}

impl ErrorMatcher {
  pub fn equals(text: impl Into<String>) -> Self {
    ErrorMatcher::Equals(text.into())
  }

  pub fn contains(text: impl Into<String>) -> Self {
    ErrorMatcher::Contains(text.into().to_lowercase())
  }

  pub fn is<E: std::error::Error + 'static>() -> Self {
    ErrorMatcher::Is {
      type_name: std::any::type_name::<E>(),
      test: is_type::<E>,
    }
  }

  pub fn identity(err: &ExchangeError) -> Self {
    ErrorMatcher::Identity(err.clone())
  }

  pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
    Regex::new(pattern).map(ErrorMatcher::Regex)
  }

  pub fn matches(&self, err: &ExchangeError) -> bool {
    match self {
      ErrorMatcher::Any => true,
      ErrorMatcher::Equals(text) => err.chain().any(|cause| cause.to_string() == *text),
      ErrorMatcher::Contains(text) => err.full_message().to_lowercase().contains(text.as_str()),
      ErrorMatcher::Is { test, .. } => test(err),
      ErrorMatcher::Identity(target) => err.wraps(target),
      ErrorMatcher::Regex(regex) => regex.is_match(&err.full_message()),
    }
  }
}

impl fmt::Debug for ErrorMatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ErrorMatcher::Any => f.write_str("Any"),
      ErrorMatcher::Equals(text) => f.debug_tuple("Equals").field(text).finish(),
      ErrorMatcher::Contains(text) => f.debug_tuple("Contains").field(text).finish(),
      ErrorMatcher::Is { type_name, .. } => f.debug_tuple("Is").field(type_name).finish(),
      ErrorMatcher::Identity(err) => f.debug_tuple("Identity").field(err).finish(),
      ErrorMatcher::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
    }
  }
}

pub struct CatchClause {
  pub matcher: ErrorMatcher,
  pub processor: ProcessorRef,
}

pub struct TryCatch {
  steps: Vec<ProcessorRef>,
  catches: Vec<CatchClause>,
  finally: Vec<ProcessorRef>,
}

impl TryCatch {
  pub fn new(steps: Vec<ProcessorRef>, catches: Vec<CatchClause>, finally: Vec<ProcessorRef>) -> Self {
    Self {
      steps,
      catches,
      finally,
    }
  }

  fn run_catch(&self, exchange: &mut Exchange, original: &ExchangeError) {
    let Some((clause_idx, clause)) = self
      .catches
      .iter()
      .enumerate()
      .find(|(_, clause)| clause.matcher.matches(original))
    else {
      return;
    };

    event!(
      Level::DEBUG,
      clause_index = clause_idx,
      error = %original,
      "Error caught."
    );
    exchange.set_property(EXCEPTION_CAUGHT_PROPERTY, Value::Error(original.clone()));
    invoke(clause.processor.as_ref(), exchange);
    // A handler that raised a different error keeps it.
    if exchange.error().map_or(false, |current| current.same(original)) {
      exchange.clear_error();
    }
  }

  fn run_finally(&self, exchange: &mut Exchange) {
    let pending = exchange.take_error();
    let mut finally_error: Option<ExchangeError> = None;
    for step in &self.finally {
      invoke(step.as_ref(), exchange);
      if let Some(err) = exchange.take_error() {
        finally_error.get_or_insert(err);
      }
    }

    match (pending, finally_error) {
      (Some(original), Some(finally)) => {
        event!(Level::WARN, error = %finally, original = %original, "Finally block failed.");
        exchange.set_error(SwitchyardError::FinallyFailed { original, finally });
      }
      (None, Some(finally)) => exchange.set_error(finally),
      (pending, None) => exchange.restore_error(pending),
    }
  }
}

impl Processor for TryCatch {
  fn process(&self, exchange: &mut Exchange) {
    for step in &self.steps {
      invoke(step.as_ref(), exchange);
      if exchange.is_error() {
        break;
      }
    }

    if let Some(original) = exchange.error().cloned() {
      self.run_catch(exchange, &original);
    }

    if !self.finally.is_empty() {
      self.run_finally(exchange);
    }
  }
}
