// switchyard/src/core/message.rs

use crate::core::value::{Value, ValueMap};
use uuid::Uuid;

/// The payload container of an exchange: identity, headers and a body.
#[derive(Debug)]
pub struct Message {
  id: String,
  headers: ValueMap,
  body: Value,
}

impl Message {
  pub fn new() -> Self {
    Self::with_body(Value::Null)
  }

  pub fn with_body(body: impl Into<Value>) -> Self {
    Message {
      id: Uuid::new_v4().to_string(),
      headers: ValueMap::new(),
      body: body.into(),
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn header(&self, name: &str) -> Option<&Value> {
    self.headers.get(name)
  }

  pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.headers.insert(name.into(), value.into());
  }

  pub fn remove_header(&mut self, name: &str) -> Option<Value> {
    self.headers.remove(name)
  }

  pub fn headers(&self) -> &ValueMap {
    &self.headers
  }

  pub fn headers_mut(&mut self) -> &mut ValueMap {
    &mut self.headers
  }

  pub fn body(&self) -> &Value {
    &self.body
  }

  pub fn body_mut(&mut self) -> &mut Value {
    &mut self.body
  }

  pub fn set_body(&mut self, body: impl Into<Value>) {
    self.body = body.into();
  }

  pub fn take_body(&mut self) -> Value {
    std::mem::take(&mut self.body)
  }

  /// Structural copy with a fresh identity.
  pub fn copy(&self) -> Message {
    Message {
      id: Uuid::new_v4().to_string(),
      headers: self.headers.clone(),
      body: self.body.clone(),
    }
  }

  /// Replaces headers and body with those of `other`, keeping this message's identity.
  pub(crate) fn absorb(&mut self, other: Message) {
    self.headers = other.headers;
    self.body = other.body;
  }
}

impl Default for Message {
  fn default() -> Self {
    Self::new()
  }
}
