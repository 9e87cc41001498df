// switchyard/src/runtime/registry.rs

//! A name-keyed registry owned by one runtime (functions, components, data formats).

use crate::error::{SwitchyardError, SwitchyardResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{event, Level};

pub struct NamedRegistry<T: Clone> {
  kind: &'static str,
  items: RwLock<HashMap<String, T>>,
}

impl<T: Clone> NamedRegistry<T> {
  pub fn new(kind: &'static str) -> Self {
    Self {
      kind,
      items: RwLock::new(HashMap::new()),
    }
  }

  /// A registry pre-filled with `items`; later duplicates replace earlier ones.
  pub fn with_items<I, S>(kind: &'static str, items: I) -> Self
  where
    I: IntoIterator<Item = (S, T)>,
    S: Into<String>,
  {
    Self {
      kind,
      items: RwLock::new(items.into_iter().map(|(name, item)| (name.into(), item)).collect()),
    }
  }

  pub fn kind(&self) -> &'static str {
    self.kind
  }

  /// Registers `item` under `name`; a name can only be registered once.
  pub fn register(&self, name: impl Into<String>, item: T) -> SwitchyardResult<()> {
    let name = name.into();
    let mut items = self.items.write();
    if items.contains_key(&name) {
      event!(Level::WARN, kind = self.kind, name = %name, "Duplicate registration rejected.");
      return Err(SwitchyardError::DuplicateRegistration { kind: self.kind, name });
    }
    event!(Level::DEBUG, kind = self.kind, name = %name, "Registered.");
    items.insert(name, item);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<T> {
    self.items.read().get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.items.read().contains_key(name)
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.items.read().keys().cloned().collect();
    names.sort();
    names
  }

  pub fn len(&self) -> usize {
    self.items.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.read().is_empty()
  }

  pub fn clear(&self) {
    self.items.write().clear();
  }
}
