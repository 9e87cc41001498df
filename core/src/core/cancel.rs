// switchyard/src/core/cancel.rs

//! Cancellation scopes shared by the runtime and the exchanges it creates.

use crate::error::SwitchyardError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct ScopeInner {
  cancelled: AtomicBool,
  deadline: Option<Instant>,
  parent: Option<CancelScope>,
}

/// A cancellation signal with an optional deadline.
///
/// Scopes form a tree: a child observes the cancellation of every ancestor, while
/// cancelling a child leaves its parent and siblings untouched. A child always carries
/// the earliest deadline found on its path to the root.
#[derive(Clone)]
pub struct CancelScope {
  inner: Arc<ScopeInner>,
}

impl CancelScope {
  pub fn new() -> Self {
    Self::build(None, None)
  }

  fn build(parent: Option<CancelScope>, deadline: Option<Instant>) -> Self {
    let inherited = parent.as_ref().and_then(|p| p.deadline());
    let deadline = match (inherited, deadline) {
      (Some(a), Some(b)) => Some(a.min(b)),
      (a, b) => a.or(b),
    };
    CancelScope {
      inner: Arc::new(ScopeInner {
        cancelled: AtomicBool::new(false),
        deadline,
        parent,
      }),
    }
  }

  /// Forks a child scope inheriting this scope's deadline.
  pub fn child(&self) -> Self {
    Self::build(Some(self.clone()), None)
  }

  pub fn with_deadline(&self, deadline: Instant) -> Self {
    Self::build(Some(self.clone()), Some(deadline))
  }

  /// A timeout too large to express as an instant leaves the child without a deadline.
  pub fn with_timeout(&self, timeout: Duration) -> Self {
    match Instant::now().checked_add(timeout) {
      Some(deadline) => self.with_deadline(deadline),
      None => self.child(),
    }
  }

  pub fn cancel(&self) {
    self.inner.cancelled.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    let mut current = Some(self);
    while let Some(scope) = current {
      if scope.inner.cancelled.load(Ordering::Acquire) {
        return true;
      }
      current = scope.inner.parent.as_ref();
    }
    false
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.inner.deadline
  }

  pub fn is_expired(&self) -> bool {
    self.inner.deadline.map_or(false, |d| Instant::now() >= d)
  }

  /// Deadline comparison first, then the cancellation flags.
  pub fn check(&self) -> Result<(), SwitchyardError> {
    if self.is_expired() {
      return Err(SwitchyardError::DeadlineExceeded);
    }
    if self.is_cancelled() {
      return Err(SwitchyardError::Cancelled);
    }
    Ok(())
  }
}

impl Default for CancelScope {
  fn default() -> Self {
    Self::new()
  }
}

impl std::fmt::Debug for CancelScope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelScope")
      .field("cancelled", &self.is_cancelled())
      .field("deadline", &self.inner.deadline)
      .finish()
  }
}
