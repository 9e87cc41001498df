// switchyard/src/core/exchange.rs

//! Defines `Exchange`, the unit of work flowing through a route.
//!
//! An exchange is owned by exactly one processor chain at a time. Branching constructs
//! (multicast outputs, loop iterations) work on copies; a copy gets fresh identities for
//! both the exchange and its message, and never aliases mutable state with its source.

use crate::core::cancel::CancelScope;
use crate::core::history::{MessageHistory, MESSAGE_HISTORY_HEADER};
use crate::core::message::Message;
use crate::core::value::{Value, ValueMap};
use crate::error::{ExchangeError, SwitchyardError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Keys of the flat evaluation environment produced by [`Exchange::as_map`].
pub const ENVIRONMENT_KEYS: [&str; 6] = ["id", "exchangeId", "body", "header", "error", "property"];

#[derive(Debug)]
pub struct Exchange {
  id: String,
  created_at: DateTime<Utc>,
  properties: ValueMap,
  message: Message,
  error: Option<ExchangeError>,
  scope: CancelScope,
}

impl Exchange {
  /// Creates an exchange in a child of `parent`, inheriting its deadline and cancellation.
  pub fn new(parent: &CancelScope) -> Self {
    Self::with_message(parent, Message::new())
  }

  pub fn with_body(parent: &CancelScope, body: impl Into<Value>) -> Self {
    Self::with_message(parent, Message::with_body(body))
  }

  pub fn with_message(parent: &CancelScope, message: Message) -> Self {
    Exchange {
      id: Uuid::new_v4().to_string(),
      created_at: Utc::now(),
      properties: ValueMap::new(),
      message,
      error: None,
      scope: parent.child(),
    }
  }

  /// An exchange with its own root scope; convenient outside a runtime.
  pub fn detached() -> Self {
    Self::new(&CancelScope::new())
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  // --- Properties ---

  pub fn property(&self, name: &str) -> Option<&Value> {
    self.properties.get(name)
  }

  pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.properties.insert(name.into(), value.into());
  }

  pub fn remove_property(&mut self, name: &str) -> Option<Value> {
    self.properties.remove(name)
  }

  pub fn properties(&self) -> &ValueMap {
    &self.properties
  }

  pub fn properties_mut(&mut self) -> &mut ValueMap {
    &mut self.properties
  }

  // --- Message shortcuts ---

  pub fn message(&self) -> &Message {
    &self.message
  }

  pub fn message_mut(&mut self) -> &mut Message {
    &mut self.message
  }

  pub fn header(&self, name: &str) -> Option<&Value> {
    self.message.header(name)
  }

  pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.message.set_header(name, value);
  }

  pub fn remove_header(&mut self, name: &str) -> Option<Value> {
    self.message.remove_header(name)
  }

  pub fn body(&self) -> &Value {
    self.message.body()
  }

  pub fn set_body(&mut self, body: impl Into<Value>) {
    self.message.set_body(body);
  }

  // --- Error slot ---

  pub fn error(&self) -> Option<&ExchangeError> {
    self.error.as_ref()
  }

  pub fn set_error(&mut self, error: impl Into<ExchangeError>) {
    self.error = Some(error.into());
  }

  pub fn clear_error(&mut self) {
    self.error = None;
  }

  pub fn take_error(&mut self) -> Option<ExchangeError> {
    self.error.take()
  }

  pub(crate) fn restore_error(&mut self, error: Option<ExchangeError>) {
    self.error = error;
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  // --- Cancellation ---

  pub fn scope(&self) -> &CancelScope {
    &self.scope
  }

  /// Cancels this exchange's scope (and the scopes of copies that share it).
  pub fn cancel(&self) {
    self.scope.cancel();
  }

  pub fn check_cancel_or_timeout(&self) -> Result<(), SwitchyardError> {
    self.scope.check()
  }

  // --- History ---

  pub fn history(&self) -> Option<&MessageHistory> {
    self.header(MESSAGE_HISTORY_HEADER).and_then(|v| v.downcast_ref::<MessageHistory>())
  }

  /// Returns the history stored in the reserved header, attaching an empty one first if needed.
  pub(crate) fn history_mut(&mut self) -> Option<&mut MessageHistory> {
    let slot = self
      .message
      .headers_mut()
      .entry(MESSAGE_HISTORY_HEADER.to_string())
      .or_insert_with(|| Value::object(MessageHistory::new()));
    if slot.downcast_ref::<MessageHistory>().is_none() {
      *slot = Value::object(MessageHistory::new());
    }
    slot.downcast_mut::<MessageHistory>()
  }

  // --- Copying ---

  /// An independent copy sharing this exchange's cancellation scope.
  pub fn copy(&self) -> Exchange {
    self.copy_in(self.scope.clone())
  }

  /// An independent copy running in a forked child scope: cancelling the fork does not
  /// cancel this exchange, while cancelling this exchange still reaches the fork.
  pub fn fork(&self) -> Exchange {
    self.copy_in(self.scope.child())
  }

  fn copy_in(&self, scope: CancelScope) -> Exchange {
    Exchange {
      id: Uuid::new_v4().to_string(),
      created_at: self.created_at,
      properties: self.properties.clone(),
      message: self.message.copy(),
      error: self.error.clone(),
      scope,
    }
  }

  /// Takes over the message content, properties and error of `other`, keeping this
  /// exchange's identity and scope.
  pub fn absorb(&mut self, other: Exchange) {
    self.message.absorb(other.message);
    self.properties = other.properties;
    self.error = other.error;
  }

  // --- Evaluation environment ---

  /// Resolves one root name of the evaluation environment.
  pub fn lookup(&self, name: &str) -> Option<Value> {
    let value = match name {
      "id" => Value::String(self.message.id().to_string()),
      "exchangeId" => Value::String(self.id.clone()),
      "body" => self.message.body().clone(),
      "header" => Value::Map(to_tree(self.message.headers())),
      "error" => self.error.clone().map_or(Value::Null, Value::Error),
      "property" => Value::Map(to_tree(&self.properties)),
      _ => return None,
    };
    Some(value)
  }

  /// Projects the exchange into `{id, exchangeId, body, header, error, property}`.
  pub fn as_map(&self) -> BTreeMap<String, Value> {
    ENVIRONMENT_KEYS
      .iter()
      .filter_map(|key| self.lookup(key).map(|v| (key.to_string(), v)))
      .collect()
  }
}

fn to_tree(map: &ValueMap) -> BTreeMap<String, Value> {
  map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
