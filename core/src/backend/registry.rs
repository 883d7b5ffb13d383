// moonport/src/backend/registry.rs

//! Defines `DriverRegistry`, a moniker-keyed registry of backend driver
//! constructors. Adding a provider means registering a constructor here;
//! the dispatcher never changes.

use crate::backend::cloudbuild::{CloudBuildDriver, CLOUD_BUILD_MONIKER};
use crate::backend::driver::BuildBackendDriver;
use crate::config::BackendConfig;
use crate::error::{MoonportError, MoonportResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

/// Builds a driver from backend configuration. Must not touch the network.
pub type DriverFactory =
  Arc<dyn Fn(&BackendConfig) -> MoonportResult<Box<dyn BuildBackendDriver>> + Send + Sync + 'static>;

/// The driver registry.
pub struct DriverRegistry {
  factories: RwLock<HashMap<String, DriverFactory>>,
}

impl DriverRegistry {
  /// Creates a new, empty registry.
  pub fn new() -> Self {
    Self {
      factories: RwLock::new(HashMap::new()),
    }
  }

  /// Creates a registry with every built-in provider registered.
  pub fn new_default() -> Self {
    let registry = Self::new();
    registry.register(CLOUD_BUILD_MONIKER, |config| {
      let driver: Box<dyn BuildBackendDriver> = Box::new(CloudBuildDriver::new(config)?);
      Ok(driver)
    });
    registry
  }

  /// Registers (or replaces) the constructor for `moniker`.
  pub fn register<F>(&self, moniker: impl Into<String>, factory: F)
  where
    F: Fn(&BackendConfig) -> MoonportResult<Box<dyn BuildBackendDriver>> + Send + Sync + 'static,
  {
    let moniker = moniker.into();
    event!(Level::DEBUG, %moniker, "Registering backend driver.");
    if self.factories.write().insert(moniker.clone(), Arc::new(factory)).is_some() {
      event!(Level::WARN, %moniker, "Backend driver replaced an earlier registration.");
    }
  }

  pub fn contains(&self, moniker: &str) -> bool {
    self.factories.read().contains_key(moniker)
  }

  /// Registered monikers, sorted.
  pub fn monikers(&self) -> Vec<String> {
    let mut monikers: Vec<String> = self.factories.read().keys().cloned().collect();
    monikers.sort();
    monikers
  }

  /// Constructs the driver registered under `moniker`.
  ///
  /// An unknown moniker fails immediately with a configuration error.
  pub fn create(&self, moniker: &str, config: &BackendConfig) -> MoonportResult<Box<dyn BuildBackendDriver>> {
    let registered = self.factories.read().get(moniker).cloned();
    let factory = registered.ok_or_else(|| {
      event!(Level::ERROR, %moniker, "No backend driver registered.");
      MoonportError::configuration(
        "DriverRegistry::create",
        format!("unknown build driver '{}' (known: {})", moniker, self.monikers().join(", ")),
      )
    })?;

    factory(config).map_err(|e| e.context(format!("creating {} backend driver", moniker)))
  }
}

impl Default for DriverRegistry {
  fn default() -> Self {
    Self::new_default()
  }
}
