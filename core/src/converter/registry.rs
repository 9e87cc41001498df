// switchyard/src/converter/registry.rs

//! A directed graph of pointwise converters between `ValueKind`s.
//!
//! `convert` looks up the shortest chain of converters from the value's kind to the
//! target kind (breadth-first, neighbours in `ValueKind` order) and applies it hop by hop.
//! Paths are cached per `(from, to)` pair; registering a converter clears the cache.

use crate::core::value::{Value, ValueKind};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::expression::to_bool;
use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{event, Level};

/// Free-form converter options, e.g. `format` for time parsing and printing.
pub type ConverterParams = BTreeMap<String, String>;

pub type ConverterFn = Arc<dyn Fn(&Value, &ConverterParams) -> anyhow::Result<Value> + Send + Sync>;

type Edge = (ValueKind, ValueKind);

pub struct ConverterRegistry {
  converters: RwLock<HashMap<Edge, ConverterFn>>,
  paths: RwLock<HashMap<Edge, Option<Arc<[ValueKind]>>>>,
}

impl Default for ConverterRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ConverterRegistry {
  /// An empty registry.
  pub fn empty() -> Self {
    Self {
      converters: RwLock::new(HashMap::new()),
      paths: RwLock::new(HashMap::new()),
    }
  }

  /// A registry with the built-in scalar, string, bytes, time and duration converters.
  pub fn new() -> Self {
    let registry = Self::empty();
    registry.register_defaults();
    registry
  }

  /// Adds (or replaces) the converter for one edge of the graph.
  pub fn register<F>(&self, from: ValueKind, to: ValueKind, converter: F)
  where
    F: Fn(&Value, &ConverterParams) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    if self.converters.write().insert((from, to), Arc::new(converter)).is_some() {
      event!(Level::DEBUG, %from, %to, "Replaced converter.");
    }
    self.paths.write().clear();
  }

  pub fn clear(&self) {
    self.converters.write().clear();
    self.paths.write().clear();
  }

  pub fn can_convert(&self, from: ValueKind, to: ValueKind) -> bool {
    from == to || self.path(from, to).is_some()
  }

  pub fn convert(&self, value: &Value, to: ValueKind, params: &ConverterParams) -> SwitchyardResult<Value> {
    let from = value.kind();
    if from == to {
      return Ok(value.clone());
    }
    let path = self.path(from, to).ok_or_else(|| SwitchyardError::Conversion {
      from: from.to_string(),
      to: to.to_string(),
      message: "no converter path".to_string(),
    })?;

    let mut current = value.clone();
    for hop in path.windows(2) {
      let edge = (hop[0], hop[1]);
      let converter = self.converters.read().get(&edge).cloned().ok_or_else(|| {
        SwitchyardError::Internal(format!("converter {} -> {} vanished", edge.0, edge.1))
      })?;
      current = converter(&current, params).map_err(|e| SwitchyardError::Conversion {
        from: edge.0.to_string(),
        to: edge.1.to_string(),
        message: format!("{:#}", e),
      })?;
    }
    Ok(current)
  }

  fn path(&self, from: ValueKind, to: ValueKind) -> Option<Arc<[ValueKind]>> {
    if let Some(cached) = self.paths.read().get(&(from, to)) {
      return cached.clone();
    }
    let found = self.shortest_path(from, to).map(Arc::from);
    self.paths.write().insert((from, to), found.clone());
    found
  }

  fn shortest_path(&self, from: ValueKind, to: ValueKind) -> Option<Vec<ValueKind>> {
    let converters = self.converters.read();
    let mut neighbours: BTreeMap<ValueKind, Vec<ValueKind>> = BTreeMap::new();
    for (source, target) in converters.keys() {
      neighbours.entry(*source).or_default().push(*target);
    }
    for targets in neighbours.values_mut() {
      targets.sort();
    }

    let mut previous: HashMap<ValueKind, ValueKind> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    while let Some(kind) = queue.pop_front() {
      if kind == to {
        let mut path = vec![to];
        let mut cursor = to;
        while let Some(prev) = previous.get(&cursor) {
          path.push(*prev);
          cursor = *prev;
        }
        path.reverse();
        return Some(path);
      }
      for next in neighbours.get(&kind).into_iter().flatten() {
        if *next != from && !previous.contains_key(next) {
          previous.insert(*next, kind);
          queue.push_back(*next);
        }
      }
    }
    None
  }

  fn register_defaults(&self) {
    use ValueKind as K;

    for kind in [K::Int, K::Float, K::Bool, K::Duration, K::Error] {
      self.register(kind, K::String, |v, _| Ok(Value::String(v.to_string())));
    }
    self.register(K::Time, K::String, |v, params| match v {
      Value::Time(t) => Ok(Value::String(match params.get("format") {
        Some(format) => t.format(format).to_string(),
        None => t.to_rfc3339(),
      })),
      other => Err(unexpected(other)),
    });

    self.register(K::String, K::Int, |v, _| {
      let s = expect_str(v)?;
      s.trim()
        .parse::<i64>()
        .map(Value::Int)
        .with_context(|| format!("'{}' is not an integer", s))
    });
    self.register(K::String, K::Float, |v, _| {
      let s = expect_str(v)?;
      s.trim()
        .parse::<f64>()
        .map(Value::Float)
        .with_context(|| format!("'{}' is not a number", s))
    });
    self.register(K::String, K::Bool, |v, _| Ok(Value::Bool(to_bool(v)?)));
    self.register(K::String, K::Time, |v, params| {
      let s = expect_str(v)?.trim();
      let parsed = match params.get("format") {
        Some(format) => NaiveDateTime::parse_from_str(s, format)
          .map(|naive| Utc.from_utc_datetime(&naive))
          .with_context(|| format!("'{}' does not match format '{}'", s, format))?,
        None => DateTime::parse_from_rfc3339(s)
          .map(|t| t.with_timezone(&Utc))
          .with_context(|| format!("'{}' is not an RFC 3339 timestamp", s))?,
      };
      Ok(Value::Time(parsed))
    });
    self.register(K::String, K::Bytes, |v, _| Ok(Value::Bytes(expect_str(v)?.as_bytes().to_vec())));
    self.register(K::Bytes, K::String, |v, _| match v {
      Value::Bytes(bytes) => String::from_utf8(bytes.clone())
        .map(Value::String)
        .context("bytes are not valid UTF-8"),
      other => Err(unexpected(other)),
    });

    self.register(K::Int, K::Float, |v, _| match v {
      Value::Int(i) => Ok(Value::Float(*i as f64)),
      other => Err(unexpected(other)),
    });
    self.register(K::Float, K::Int, |v, _| match v {
      Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
      other => Err(unexpected(other)),
    });
    self.register(K::Int, K::Bool, |v, _| Ok(Value::Bool(to_bool(v)?)));
    self.register(K::Bool, K::Int, |v, _| match v {
      Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
      other => Err(unexpected(other)),
    });

    // Times and durations travel as integer milliseconds.
    self.register(K::Time, K::Int, |v, _| match v {
      Value::Time(t) => Ok(Value::Int(t.timestamp_millis())),
      other => Err(unexpected(other)),
    });
    self.register(K::Int, K::Time, |v, _| match v {
      Value::Int(ms) => Utc
        .timestamp_millis_opt(*ms)
        .single()
        .map(Value::Time)
        .ok_or_else(|| anyhow!("{} ms is out of range for a timestamp", ms)),
      other => Err(unexpected(other)),
    });
    self.register(K::Duration, K::Int, |v, _| match v {
      Value::Duration(d) => i64::try_from(d.as_millis())
        .map(Value::Int)
        .context("duration too large"),
      other => Err(unexpected(other)),
    });
    self.register(K::Int, K::Duration, |v, _| match v {
      Value::Int(ms) => u64::try_from(*ms)
        .map(|ms| Value::Duration(Duration::from_millis(ms)))
        .context("a duration cannot be negative"),
      other => Err(unexpected(other)),
    });
  }
}

fn expect_str(value: &Value) -> anyhow::Result<&str> {
  value.as_str().ok_or_else(|| unexpected(value))
}

fn unexpected(value: &Value) -> anyhow::Error {
  anyhow!("unexpected {} value", value.kind())
}
