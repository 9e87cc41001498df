// switchyard/src/runtime/endpoints.rs

//! Endpoints cached by URI, created at most once through the component registry.

use super::registry::NamedRegistry;
use crate::component::{Component, Endpoint, Uri};
use crate::error::{SwitchyardError, SwitchyardResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

pub struct EndpointRegistry {
  components: Arc<NamedRegistry<Arc<dyn Component>>>,
  endpoints: RwLock<HashMap<String, Arc<dyn Endpoint>>>,
}

impl EndpointRegistry {
  pub fn new(components: Arc<NamedRegistry<Arc<dyn Component>>>) -> Self {
    Self {
      components,
      endpoints: RwLock::new(HashMap::new()),
    }
  }

  /// Parses `uri` and checks that a component serves its scheme.
  pub fn validate(&self, uri: &str) -> SwitchyardResult<Uri> {
    let parsed = Uri::parse(uri)?;
    self.component(&parsed)?;
    Ok(parsed)
  }

  fn component(&self, uri: &Uri) -> SwitchyardResult<Arc<dyn Component>> {
    self
      .components
      .get(uri.component())
      .ok_or_else(|| SwitchyardError::UnknownComponent {
        scheme: uri.component().to_string(),
      })
  }

  /// Returns the cached endpoint for `uri`, creating it on first use.
  pub fn resolve(&self, uri: &str) -> SwitchyardResult<Arc<dyn Endpoint>> {
    if let Some(endpoint) = self.endpoints.read().get(uri) {
      return Ok(endpoint.clone());
    }

    let parsed = Uri::parse(uri)?;
    let component = self.component(&parsed)?;
    let mut endpoints = self.endpoints.write();
    // Another thread may have created it while the lock was released.
    if let Some(endpoint) = endpoints.get(uri) {
      return Ok(endpoint.clone());
    }
    let endpoint = component.create_endpoint(&parsed)?;
    event!(Level::DEBUG, uri = %uri, component = component.id(), "Endpoint created.");
    endpoints.insert(uri.to_string(), endpoint.clone());
    Ok(endpoint)
  }

  pub fn len(&self) -> usize {
    self.endpoints.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.endpoints.read().is_empty()
  }

  pub fn clear(&self) {
    self.endpoints.write().clear();
  }
}
