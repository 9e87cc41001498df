// switchyard/src/config.rs

use crate::error::{SwitchyardError, SwitchyardResult};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
  pub name: String,
  /// Record a `MessageHistory` on every exchange.
  pub track_history: bool,
  /// Deadline given to every exchange the runtime creates.
  pub exchange_timeout: Option<Duration>,
  /// Period of `timer:` endpoints that do not set one.
  pub timer_default_period: Duration,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      name: "switchyard".to_string(),
      track_history: false,
      exchange_timeout: None,
      timer_default_period: Duration::from_millis(1000),
    }
  }
}

impl RuntimeConfig {
  /// Reads `SWITCHYARD_NAME`, `SWITCHYARD_TRACK_HISTORY`, `SWITCHYARD_EXCHANGE_TIMEOUT_MS`
  /// and `SWITCHYARD_TIMER_PERIOD_MS`; unset variables keep their defaults.
  pub fn from_env() -> SwitchyardResult<Self> {
    let config = Self::from_lookup(|key| env::var(key).ok())?;
    tracing::info!(name = %config.name, "Runtime configuration loaded.");
    Ok(config)
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SwitchyardResult<Self> {
    let defaults = Self::default();
    let invalid = |key: &str, message: String| SwitchyardError::ConfigurationError {
      key: key.to_string(),
      message,
    };

    let name = lookup("SWITCHYARD_NAME").unwrap_or(defaults.name);

    let track_history = match lookup("SWITCHYARD_TRACK_HISTORY") {
      None => defaults.track_history,
      Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => return Err(invalid("SWITCHYARD_TRACK_HISTORY", format!("'{}' is not a boolean", other))),
      },
    };

    let millis = |key: &str| -> SwitchyardResult<Option<Duration>> {
      lookup(key)
        .map(|raw| {
          raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| invalid(key, format!("'{}': {}", raw, e)))
        })
        .transpose()
    };

    let exchange_timeout = millis("SWITCHYARD_EXCHANGE_TIMEOUT_MS")?.filter(|d| !d.is_zero());
    let timer_default_period = match millis("SWITCHYARD_TIMER_PERIOD_MS")? {
      Some(period) if period.is_zero() => {
        return Err(invalid("SWITCHYARD_TIMER_PERIOD_MS", "must be positive".to_string()))
      }
      Some(period) => period,
      None => defaults.timer_default_period,
    };

    Ok(Self {
      name,
      track_history,
      exchange_timeout,
      timer_default_period,
    })
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  pub fn with_history(mut self, track_history: bool) -> Self {
    self.track_history = track_history;
    self
  }

  pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
    self.exchange_timeout = Some(timeout);
    self
  }

  pub fn with_timer_default_period(mut self, period: Duration) -> Self {
    self.timer_default_period = period;
    self
  }
}
