// switchyard/src/core/value.rs

//! The dynamically typed `Value` carried by message bodies, headers and exchange properties.
//!
//! Copy rules applied by `Clone` (and therefore by `Exchange::copy`):
//! - scalars, strings, bytes, time values are copied;
//! - `List` and `Map` are cloned structurally;
//! - `Object` values implement [`CopyValue`] and clone themselves;
//! - `Shared` values and `Error` values are shared, never duplicated.

use crate::error::{ExchangeError, SwitchyardError};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// String-keyed map used for headers and properties.
pub type ValueMap = HashMap<String, Value>;

/// The "copy itself" capability for user payload types stored as `Value::Object`.
pub trait CopyValue: Any + Send + Sync + fmt::Debug {
  fn copy_value(&self) -> Box<dyn CopyValue>;
  fn as_any(&self) -> &dyn Any;
  fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> CopyValue for T
where
  T: Any + Clone + Send + Sync + fmt::Debug,
{
  fn copy_value(&self) -> Box<dyn CopyValue> {
    Box::new(self.clone())
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  Bytes(Vec<u8>),
  Time(DateTime<Utc>),
  Duration(Duration),
  Error(ExchangeError),
  List(Vec<Value>),
  Map(BTreeMap<String, Value>),
  Object(Box<dyn CopyValue>),
  Shared(Arc<dyn Any + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
  Null,
  Bool,
  Int,
  Float,
  String,
  Bytes,
  Time,
  Duration,
  Error,
  List,
  Map,
  Object,
  Shared,
}

impl ValueKind {
  pub fn name(&self) -> &'static str {
    match self {
      ValueKind::Null => "null",
      ValueKind::Bool => "bool",
      ValueKind::Int => "int",
      ValueKind::Float => "float",
      ValueKind::String => "string",
      ValueKind::Bytes => "bytes",
      ValueKind::Time => "time",
      ValueKind::Duration => "duration",
      ValueKind::Error => "error",
      ValueKind::List => "list",
      ValueKind::Map => "map",
      ValueKind::Object => "object",
      ValueKind::Shared => "shared",
    }
  }
}

impl fmt::Display for ValueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ValueKind {
  type Err = SwitchyardError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let kind = match s.trim().to_ascii_lowercase().as_str() {
      "null" | "nil" => ValueKind::Null,
      "bool" | "boolean" => ValueKind::Bool,
      "int" | "integer" | "i64" | "long" => ValueKind::Int,
      "float" | "double" | "f64" => ValueKind::Float,
      "string" | "str" => ValueKind::String,
      "bytes" | "[]byte" => ValueKind::Bytes,
      "time" | "datetime" | "timestamp" => ValueKind::Time,
      "duration" => ValueKind::Duration,
      "error" => ValueKind::Error,
      "list" | "array" => ValueKind::List,
      "map" | "object_map" => ValueKind::Map,
      "object" => ValueKind::Object,
      "shared" => ValueKind::Shared,
      other => {
        return Err(SwitchyardError::Conversion {
          from: other.to_string(),
          to: "type".to_string(),
          message: "unknown type name".to_string(),
        })
      }
    };
    Ok(kind)
  }
}

impl Value {
  pub fn kind(&self) -> ValueKind {
    match self {
      Value::Null => ValueKind::Null,
      Value::Bool(_) => ValueKind::Bool,
      Value::Int(_) => ValueKind::Int,
      Value::Float(_) => ValueKind::Float,
      Value::String(_) => ValueKind::String,
      Value::Bytes(_) => ValueKind::Bytes,
      Value::Time(_) => ValueKind::Time,
      Value::Duration(_) => ValueKind::Duration,
      Value::Error(_) => ValueKind::Error,
      Value::List(_) => ValueKind::List,
      Value::Map(_) => ValueKind::Map,
      Value::Object(_) => ValueKind::Object,
      Value::Shared(_) => ValueKind::Shared,
    }
  }

  /// Wraps a user payload that knows how to copy itself.
  pub fn object<T: CopyValue>(value: T) -> Self {
    Value::Object(Box::new(value))
  }

  /// Wraps a payload that is shared (not copied) between exchange copies.
  pub fn shared<T: Any + Send + Sync>(value: T) -> Self {
    Value::Shared(Arc::new(value))
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Float(f) => Some(*f),
      Value::Int(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_error(&self) -> Option<&ExchangeError> {
    match self {
      Value::Error(e) => Some(e),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
    match self {
      Value::Map(map) => Some(map),
      _ => None,
    }
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    match self {
      Value::Object(obj) => (**obj).as_any().downcast_ref::<T>(),
      Value::Shared(shared) => shared.downcast_ref::<T>(),
      _ => None,
    }
  }

  /// Mutable access is only possible for owned `Object` payloads.
  pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
    match self {
      Value::Object(obj) => (**obj).as_any_mut().downcast_mut::<T>(),
      _ => None,
    }
  }

  /// Bytes view used by data formats: `Bytes` as-is, `String` as UTF-8.
  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Value::Bytes(b) => Some(b),
      Value::String(s) => Some(s.as_bytes()),
      _ => None,
    }
  }
}

impl Clone for Value {
  fn clone(&self) -> Self {
    match self {
      Value::Null => Value::Null,
      Value::Bool(b) => Value::Bool(*b),
      Value::Int(i) => Value::Int(*i),
      Value::Float(f) => Value::Float(*f),
      Value::String(s) => Value::String(s.clone()),
      Value::Bytes(b) => Value::Bytes(b.clone()),
      Value::Time(t) => Value::Time(*t),
      Value::Duration(d) => Value::Duration(*d),
      Value::Error(e) => Value::Error(e.clone()),
      Value::List(items) => Value::List(items.clone()),
      Value::Map(map) => Value::Map(map.clone()),
      Value::Object(obj) => Value::Object((**obj).copy_value()),
      Value::Shared(shared) => Value::Shared(Arc::clone(shared)),
    }
  }
}

impl Default for Value {
  fn default() -> Self {
    Value::Null
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Bytes(a), Value::Bytes(b)) => a == b,
      (Value::Time(a), Value::Time(b)) => a == b,
      (Value::Duration(a), Value::Duration(b)) => a == b,
      (Value::Error(a), Value::Error(b)) => a.same(b),
      (Value::List(a), Value::List(b)) => a == b,
      (Value::Map(a), Value::Map(b)) => a == b,
      (Value::Shared(a), Value::Shared(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("Null"),
      Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
      Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
      Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
      Value::String(s) => f.debug_tuple("String").field(s).finish(),
      Value::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
      Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
      Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
      Value::Error(e) => f.debug_tuple("Error").field(e).finish(),
      Value::List(items) => f.debug_tuple("List").field(items).finish(),
      Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
      Value::Object(obj) => f.debug_tuple("Object").field(obj).finish(),
      Value::Shared(_) => f.write_str("Shared(..)"),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{}", b),
      Value::Int(i) => write!(f, "{}", i),
      Value::Float(x) => write!(f, "{}", x),
      Value::String(s) => f.write_str(s),
      Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
      Value::Time(t) => f.write_str(&t.to_rfc3339()),
      Value::Duration(d) => write!(f, "{:?}", d),
      Value::Error(e) => write!(f, "{}", e),
      Value::List(items) => {
        f.write_str("[")?;
        for (idx, item) in items.iter().enumerate() {
          if idx > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", item)?;
        }
        f.write_str("]")
      }
      Value::Map(map) => {
        f.write_str("{")?;
        for (idx, (key, item)) in map.iter().enumerate() {
          if idx > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}: {}", key, item)?;
        }
        f.write_str("}")
      }
      Value::Object(obj) => write!(f, "{:?}", obj),
      Value::Shared(_) => f.write_str("<shared>"),
    }
  }
}

macro_rules! value_from_int {
  ($($t:ty),*) => {
    $(
      impl From<$t> for Value {
        fn from(v: $t) -> Self {
          Value::Int(v as i64)
        }
      }
    )*
  };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<f32> for Value {
  fn from(v: f32) -> Self {
    Value::Float(v as f64)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::String(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::String(v)
  }
}

impl From<Vec<u8>> for Value {
  fn from(v: Vec<u8>) -> Self {
    Value::Bytes(v)
  }
}

impl From<DateTime<Utc>> for Value {
  fn from(v: DateTime<Utc>) -> Self {
    Value::Time(v)
  }
}

impl From<Duration> for Value {
  fn from(v: Duration) -> Self {
    Value::Duration(v)
  }
}

impl From<ExchangeError> for Value {
  fn from(v: ExchangeError) -> Self {
    Value::Error(v)
  }
}

impl From<Vec<Value>> for Value {
  fn from(v: Vec<Value>) -> Self {
    Value::List(v)
  }
}

impl From<BTreeMap<String, Value>> for Value {
  fn from(v: BTreeMap<String, Value>) -> Self {
    Value::Map(v)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map_or(Value::Null, Into::into)
  }
}
