// switchyard/src/component/timer.rs

//! `timer:` endpoints fire an empty exchange every `period` milliseconds, after an initial
//! `delay`, `repeatCount` times (0 fires until stopped). Timers have no producer.

use super::{Component, Consumer, ConsumerContext, Endpoint, Uri};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::processor::{invoke, Producer};
use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{event, Level};

pub const TIMER_NAME_PROPERTY: &str = "CAMEL_TIMER_NAME";
pub const TIMER_COUNTER_PROPERTY: &str = "CAMEL_TIMER_COUNTER";
pub const TIMER_FIRED_TIME_PROPERTY: &str = "CAMEL_TIMER_FIRED_TIME";

pub struct TimerComponent {
  default_period: Duration,
}

impl TimerComponent {
  pub fn new(default_period: Duration) -> Self {
    Self { default_period }
  }
}

impl Default for TimerComponent {
  fn default() -> Self {
    Self::new(Duration::from_millis(1000))
  }
}

impl Component for TimerComponent {
  fn id(&self) -> &str {
    "timer"
  }

  fn create_endpoint(&self, uri: &Uri) -> SwitchyardResult<Arc<dyn Endpoint>> {
    let default_period = u64::try_from(self.default_period.as_millis()).unwrap_or(u64::MAX);
    let period = Duration::from_millis(uri.param_or("period", default_period)?);
    if period.is_zero() {
      return Err(SwitchyardError::InvalidUri {
        uri: uri.to_string(),
        message: "timer period must be positive".to_string(),
      });
    }
    Ok(Arc::new(TimerEndpoint {
      uri: uri.clone(),
      settings: TimerSettings {
        name: uri.name().to_string(),
        period,
        delay: Duration::from_millis(uri.param_or("delay", 0u64)?),
        repeat_count: uri.param_or("repeatCount", 0u64)?,
      },
    }))
  }
}

#[derive(Debug, Clone)]
struct TimerSettings {
  name: String,
  period: Duration,
  delay: Duration,
  repeat_count: u64,
}

struct TimerEndpoint {
  uri: Uri,
  settings: TimerSettings,
}

impl Endpoint for TimerEndpoint {
  fn uri(&self) -> &Uri {
    &self.uri
  }

  fn create_consumer(&self, context: ConsumerContext) -> SwitchyardResult<Box<dyn Consumer>> {
    Ok(Box::new(TimerConsumer {
      settings: self.settings.clone(),
      context,
      signal: Arc::new(StopSignal::default()),
      handle: None,
    }))
  }

  fn create_producer(&self) -> SwitchyardResult<Producer> {
    Err(SwitchyardError::Unsupported {
      uri: self.uri.to_string(),
      operation: "producing",
    })
  }
}

#[derive(Default)]
struct StopSignal {
  stopped: Mutex<bool>,
  wakeup: Condvar,
}

impl StopSignal {
  /// Waits for `duration` unless stopped first; returns whether a stop was requested.
  fn sleep(&self, duration: Duration) -> bool {
    let deadline = Instant::now().checked_add(duration);
    let mut stopped = self.stopped.lock();
    while !*stopped {
      match deadline {
        Some(deadline) => {
          if self.wakeup.wait_until(&mut stopped, deadline).timed_out() {
            break;
          }
        }
        // Out of range: only a stop ends the wait.
        None => self.wakeup.wait(&mut stopped),
      }
    }
    *stopped
  }

  fn stop(&self) {
    *self.stopped.lock() = true;
    self.wakeup.notify_all();
  }
}

struct TimerConsumer {
  settings: TimerSettings,
  context: ConsumerContext,
  signal: Arc<StopSignal>,
  handle: Option<JoinHandle<()>>,
}

fn run_timer(settings: TimerSettings, context: ConsumerContext, signal: Arc<StopSignal>) {
  if signal.sleep(settings.delay) {
    return;
  }
  let mut counter: u64 = 0;
  loop {
    if context.scope.is_cancelled() {
      return;
    }
    counter += 1;
    let mut exchange = context.new_exchange();
    exchange.set_property(TIMER_NAME_PROPERTY, settings.name.as_str());
    exchange.set_property(TIMER_COUNTER_PROPERTY, counter as i64);
    exchange.set_property(TIMER_FIRED_TIME_PROPERTY, Utc::now());

    invoke(context.processor.as_ref(), &mut exchange);
    if let Some(err) = exchange.error() {
      event!(
        Level::WARN,
        route = %context.route,
        timer = %settings.name,
        counter,
        error = %err,
        "Timer exchange failed."
      );
    }

    if settings.repeat_count > 0 && counter >= settings.repeat_count {
      event!(Level::DEBUG, timer = %settings.name, counter, "Timer reached its repeat count.");
      return;
    }
    if signal.sleep(settings.period) {
      return;
    }
  }
}

impl Consumer for TimerConsumer {
  fn start(&mut self) -> SwitchyardResult<()> {
    if self.handle.is_some() {
      return Err(SwitchyardError::Lifecycle(format!(
        "timer '{}' is already running",
        self.settings.name
      )));
    }
    let settings = self.settings.clone();
    let context = self.context.clone();
    let signal = self.signal.clone();
    let handle = thread::Builder::new()
      .name(format!("timer-{}", self.settings.name))
      .spawn(move || run_timer(settings, context, signal))
      .map_err(|e| SwitchyardError::Lifecycle(format!("cannot spawn timer thread: {}", e)))?;
    self.handle = Some(handle);
    event!(
      Level::DEBUG,
      timer = %self.settings.name,
      period_ms = self.settings.period.as_millis() as u64,
      "Timer consumer started."
    );
    Ok(())
  }

  fn stop(&mut self) -> SwitchyardResult<()> {
    self.signal.stop();
    if let Some(handle) = self.handle.take() {
      handle
        .join()
        .map_err(|_| SwitchyardError::Lifecycle(format!("timer '{}' thread panicked", self.settings.name)))?;
      event!(Level::DEBUG, timer = %self.settings.name, "Timer consumer stopped.");
    }
    Ok(())
  }
}

impl Drop for TimerConsumer {
  fn drop(&mut self) {
    self.signal.stop();
  }
}
