// switchyard/src/processor/decorator.rs

//! The decorator wrapped around every compiled processor, leaf or composite.
//!
//! In order, it:
//! 1. appends a message-history record when history tracking is on,
//! 2. short-circuits with the cancellation/deadline error of the exchange,
//! 3. runs the pre-hook, the wrapped processor and the post-hook.
//!
//! The post-hook and the history record are finalized even if the wrapped processor panics;
//! the panic then continues to the nearest `invoke` boundary.

use super::{Processor, ProcessorRef};
use crate::core::exchange::Exchange;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{event, Level};

/// Identifies a compiled step for hooks and history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
  pub route: String,
  pub step: String,
}

pub type Hook = Arc<dyn Fn(&StepInfo, &mut Exchange) + Send + Sync>;

/// Optional pre/post hooks applied to every step of the routes compiled afterwards.
#[derive(Clone, Default)]
pub struct Hooks {
  pub pre: Option<Hook>,
  pub post: Option<Hook>,
}

impl Hooks {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_pre<F>(mut self, hook: F) -> Self
  where
    F: Fn(&StepInfo, &mut Exchange) + Send + Sync + 'static,
  {
    self.pre = Some(Arc::new(hook));
    self
  }

  pub fn with_post<F>(mut self, hook: F) -> Self
  where
    F: Fn(&StepInfo, &mut Exchange) + Send + Sync + 'static,
  {
    self.post = Some(Arc::new(hook));
    self
  }
}

impl fmt::Debug for Hooks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hooks")
      .field("pre", &self.pre.is_some())
      .field("post", &self.post.is_some())
      .finish()
  }
}

pub struct Decorated {
  info: StepInfo,
  inner: ProcessorRef,
  hooks: Hooks,
  track_history: bool,
}

impl Decorated {
  pub fn new(info: StepInfo, inner: ProcessorRef, hooks: Hooks, track_history: bool) -> Self {
    Self {
      info,
      inner,
      hooks,
      track_history,
    }
  }

  pub fn info(&self) -> &StepInfo {
    &self.info
  }
}

impl Processor for Decorated {
  fn process(&self, exchange: &mut Exchange) {
    let started = Instant::now();
    let record = if self.track_history {
      exchange
        .history_mut()
        .map(|history| history.begin(&self.info.route, &self.info.step))
    } else {
      None
    };

    event!(
      Level::TRACE,
      route = %self.info.route,
      step = %self.info.step,
      exchange_id = %exchange.id(),
      "Entering step."
    );

    if let Err(err) = exchange.check_cancel_or_timeout() {
      event!(
        Level::DEBUG,
        route = %self.info.route,
        step = %self.info.step,
        error = %err,
        "Step short-circuited."
      );
      exchange.set_error(err);
      finish_record(exchange, record, started);
      return;
    }

    if let Some(pre) = &self.hooks.pre {
      pre(&self.info, exchange);
    }
    let outcome = catch_unwind(AssertUnwindSafe(|| self.inner.process(exchange)));
    if let Some(post) = &self.hooks.post {
      post(&self.info, exchange);
    }
    finish_record(exchange, record, started);

    if let Err(payload) = outcome {
      resume_unwind(payload);
    }
  }
}

fn finish_record(exchange: &mut Exchange, record: Option<usize>, started: Instant) {
  if let Some(index) = record {
    if let Some(history) = exchange.history_mut() {
      history.finish(index, started.elapsed());
    }
  }
}
