// switchyard/src/core/history.rs

//! Message history: one record per decorated processor an exchange passed through.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Reserved header holding the `MessageHistory` of an exchange when tracking is enabled.
pub const MESSAGE_HISTORY_HEADER: &str = "CAMEL_MESSAGE_HISTORY";

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
  pub route: String,
  pub step: String,
  pub started_at: DateTime<Utc>,
  /// `None` while the step is still running.
  pub elapsed: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHistory {
  records: Vec<HistoryRecord>,
}

impl MessageHistory {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends an open record and returns its index for [`MessageHistory::finish`].
  pub fn begin(&mut self, route: &str, step: &str) -> usize {
    self.records.push(HistoryRecord {
      route: route.to_string(),
      step: step.to_string(),
      started_at: Utc::now(),
      elapsed: None,
    });
    self.records.len() - 1
  }

  pub fn finish(&mut self, index: usize, elapsed: Duration) {
    if let Some(record) = self.records.get_mut(index) {
      record.elapsed = Some(elapsed);
    }
  }

  pub fn records(&self) -> &[HistoryRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn steps(&self) -> impl Iterator<Item = &str> {
    self.records.iter().map(|r| r.step.as_str())
  }
}
