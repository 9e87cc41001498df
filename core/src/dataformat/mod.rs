// switchyard/src/dataformat/mod.rs

//! Payload codecs consumed by the `Marshal` and `Unmarshal` steps.

pub mod json;

use crate::core::value::{Value, ValueKind};
use crate::error::SwitchyardResult;

pub use json::JsonDataFormat;

pub trait DataFormat: Send + Sync {
  fn name(&self) -> &str;

  fn marshal(&self, value: &Value) -> SwitchyardResult<String>;

  /// Decodes `data`; with a `target`, the decoded value must be of that kind.
  fn unmarshal(&self, data: &[u8], target: Option<ValueKind>) -> SwitchyardResult<Value>;
}
