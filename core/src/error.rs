// switchyard/src/error.rs

//! Framework error type (`SwitchyardError`) and the exchange error handle (`ExchangeError`).

use anyhow::Error as AnyhowError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchyardError {
  #[error("Unknown function '{name}' referenced by route '{route}'")]
  UnknownFunction { route: String, name: String },

  #[error("Unknown data format '{name}' referenced by route '{route}'")]
  UnknownDataFormat { route: String, name: String },

  #[error("Unknown type '{name}' referenced by route '{route}'")]
  UnknownType { route: String, name: String },

  #[error("No component registered for scheme '{scheme}'")]
  UnknownComponent { scheme: String },

  #[error("Route '{name}' is already registered")]
  DuplicateRoute { name: String },

  #[error("Duplicate {kind} registration: '{name}'")]
  DuplicateRegistration { kind: &'static str, name: String },

  #[error("Route build error: {0}")]
  RouteBuild(String),

  #[error("Expression compile error at column {column} in '{expression}': {message}")]
  ExpressionCompile {
    expression: String,
    column: usize,
    message: String,
  },

  #[error("Expression evaluation failed: {0}")]
  Expression(String),

  #[error("Cannot convert {from} to {to}: {message}")]
  Conversion {
    from: String,
    to: String,
    message: String,
  },

  #[error("Exchange cancelled")]
  Cancelled,

  #[error("Exchange deadline exceeded")]
  DeadlineExceeded,

  #[error("Processor panicked: {message}")]
  Panic { message: String },

  #[error("Finally block failed: {finally} (original error: {original})")]
  FinallyFailed {
    #[source]
    original: ExchangeError,
    finally: ExchangeError,
  },

  #[error("Invalid endpoint URI '{uri}': {message}")]
  InvalidUri { uri: String, message: String },

  #[error("No consumer available on endpoint '{uri}'")]
  NoConsumer { uri: String },

  #[error("Endpoint '{uri}' does not support {operation}")]
  Unsupported { uri: String, operation: &'static str },

  #[error("Data format '{format}' failed: {message}")]
  DataFormat { format: String, message: String },

  #[error("Lifecycle error: {0}")]
  Lifecycle(String),

  #[error("Configuration error for '{key}': {message}")]
  ConfigurationError { key: String, message: String },

  #[error("Error in user-provided function or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  /// An exchange that completed in error, surfaced by the synchronous send API.
  #[error(transparent)]
  Exchange(#[from] ExchangeError),

  #[error("Internal switchyard error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for SwitchyardError {
  fn from(err: AnyhowError) -> Self {
    SwitchyardError::HandlerError { source: err }
  }
}

pub type SwitchyardResult<T, E = SwitchyardError> = std::result::Result<T, E>;

/// The error slot of an exchange.
///
/// A shared, immutable handle: copying an exchange shares its error rather than
/// duplicating it. The wrapped `anyhow::Error` keeps the full cause chain so catch
/// clauses can match on message text, on a concrete error type anywhere in the chain,
/// or on the identity of a previously observed `ExchangeError`.
#[derive(Clone)]
pub struct ExchangeError(Arc<AnyhowError>);

impl ExchangeError {
  pub fn new<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ExchangeError(Arc::new(AnyhowError::new(err)))
  }

  /// Builds an error from a plain message.
  pub fn msg<M>(message: M) -> Self
  where
    M: fmt::Display + fmt::Debug + Send + Sync + 'static,
  {
    ExchangeError(Arc::new(AnyhowError::msg(message)))
  }

  pub fn from_anyhow(err: AnyhowError) -> Self {
    ExchangeError(Arc::new(err))
  }

  /// Top-level message only.
  pub fn message(&self) -> String {
    self.0.to_string()
  }

  /// Every message of the cause chain, joined with `": "`.
  pub fn full_message(&self) -> String {
    format!("{:#}", self.0)
  }

  pub fn chain(&self) -> anyhow::Chain<'_> {
    self.0.chain()
  }

  /// True if any error of the cause chain is an `E`.
  pub fn is<E>(&self) -> bool
  where
    E: std::error::Error + 'static,
  {
    self.downcast_ref::<E>().is_some()
  }

  pub fn downcast_ref<E>(&self) -> Option<&E>
  where
    E: std::error::Error + 'static,
  {
    self.0.chain().find_map(|cause| cause.downcast_ref::<E>())
  }

  /// Identity comparison: both handles point at the same error instance.
  pub fn same(&self, other: &ExchangeError) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// True if `self` is `target` or wraps it somewhere in its cause chain.
  pub fn wraps(&self, target: &ExchangeError) -> bool {
    if self.same(target) {
      return true;
    }
    self
      .0
      .chain()
      .filter_map(|cause| cause.downcast_ref::<ExchangeError>())
      .any(|inner| inner.wraps(target))
  }
}

impl fmt::Debug for ExchangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("ExchangeError").field(&self.full_message()).finish()
  }
}

impl fmt::Display for ExchangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&*self.0, f)
  }
}

impl std::error::Error for ExchangeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self.0.source()
  }
}

impl From<SwitchyardError> for ExchangeError {
  fn from(err: SwitchyardError) -> Self {
    match err {
      SwitchyardError::Exchange(inner) => inner,
      other => ExchangeError::new(other),
    }
  }
}

impl From<AnyhowError> for ExchangeError {
  fn from(err: AnyhowError) -> Self {
    // Unwrap a HandlerError-style wrapper around an existing exchange error instead of nesting it.
    match err.downcast::<ExchangeError>() {
      Ok(inner) => inner,
      Err(other) => ExchangeError::from_anyhow(other),
    }
  }
}
