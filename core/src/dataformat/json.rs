// switchyard/src/dataformat/json.rs

use super::DataFormat;
use crate::core::value::{Value, ValueKind};
use crate::error::{SwitchyardError, SwitchyardResult};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::BTreeMap;

/// JSON codec, registered by default under the name `"json"`.
#[derive(Debug, Clone, Default)]
pub struct JsonDataFormat {
  pretty: bool,
}

impl JsonDataFormat {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pretty() -> Self {
    Self { pretty: true }
  }
}

fn format_error(message: impl Into<String>) -> SwitchyardError {
  SwitchyardError::DataFormat {
    format: "json".to_string(),
    message: message.into(),
  }
}

/// Maps a value to JSON. Times become RFC 3339 strings, durations whole milliseconds and
/// errors their message; `Object` and `Shared` payloads have no JSON form.
pub fn to_json(value: &Value) -> SwitchyardResult<Json> {
  Ok(match value {
    Value::Null => Json::Null,
    Value::Bool(b) => Json::Bool(*b),
    Value::Int(i) => Json::Number(Number::from(*i)),
    Value::Float(f) => Number::from_f64(*f)
      .map(Json::Number)
      .ok_or_else(|| format_error(format!("{} has no JSON representation", f)))?,
    Value::String(s) => Json::String(s.clone()),
    Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
      Ok(text) => Json::String(text.to_string()),
      Err(_) => Json::Array(bytes.iter().map(|b| Json::Number(Number::from(*b))).collect()),
    },
    Value::Time(t) => Json::String(t.to_rfc3339()),
    Value::Duration(d) => Json::Number(Number::from(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))),
    Value::Error(err) => Json::String(err.message()),
    Value::List(items) => Json::Array(items.iter().map(to_json).collect::<SwitchyardResult<_>>()?),
    Value::Map(map) => {
      let mut object = JsonMap::new();
      for (key, item) in map {
        object.insert(key.clone(), to_json(item)?);
      }
      Json::Object(object)
    }
    other => return Err(format_error(format!("cannot marshal a {} value", other.kind()))),
  })
}

pub fn from_json(json: Json) -> Value {
  match json {
    Json::Null => Value::Null,
    Json::Bool(b) => Value::Bool(b),
    Json::Number(n) => match n.as_i64() {
      Some(i) => Value::Int(i),
      None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    },
    Json::String(s) => Value::String(s),
    Json::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
    Json::Object(object) => Value::Map(
      object
        .into_iter()
        .map(|(key, item)| (key, from_json(item)))
        .collect::<BTreeMap<_, _>>(),
    ),
  }
}

impl DataFormat for JsonDataFormat {
  fn name(&self) -> &str {
    "json"
  }

  fn marshal(&self, value: &Value) -> SwitchyardResult<String> {
    let json = to_json(value)?;
    let encoded = if self.pretty {
      serde_json::to_string_pretty(&json)
    } else {
      serde_json::to_string(&json)
    };
    encoded.map_err(|e| format_error(e.to_string()))
  }

  fn unmarshal(&self, data: &[u8], target: Option<ValueKind>) -> SwitchyardResult<Value> {
    let json: Json = serde_json::from_slice(data).map_err(|e| format_error(e.to_string()))?;
    let value = from_json(json);
    match (target, value) {
      (None, value) => Ok(value),
      (Some(ValueKind::Float), Value::Int(i)) => Ok(Value::Float(i as f64)),
      (Some(kind), value) if value.kind() == kind => Ok(value),
      (Some(kind), value) => Err(format_error(format!(
        "expected a {} document, found {}",
        kind,
        value.kind()
      ))),
    }
  }
}
