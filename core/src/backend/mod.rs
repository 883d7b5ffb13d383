// moonport/src/backend/mod.rs

//! Backend dispatch: picks a driver by moniker and forwards pipeline runs to it.

pub mod cloudbuild;
pub mod driver;
pub mod registry;

pub use cloudbuild::{CloudBuildDriver, CLOUD_BUILD_MONIKER};
pub use driver::{env_pairs, prepare_request, BuildBackendDriver, BuildRequest, BuildStep};
pub use registry::{DriverFactory, DriverRegistry};

use crate::config::BackendConfig;
use crate::core::JobData;
use crate::error::{MoonportError, MoonportResult};
use crate::pipeline::Pipeline;
use std::time::Duration;
use tracing::{event, instrument, Level};

/// A configured build backend wrapping one driver.
pub struct BuildBackend {
  driver: Box<dyn BuildBackendDriver>,
  submit_timeout: Duration,
}

impl BuildBackend {
  /// Builds the backend for `moniker` from the built-in providers.
  pub fn new(moniker: &str, config: &BackendConfig) -> MoonportResult<Self> {
    Self::with_registry(moniker, &DriverRegistry::new_default(), config)
  }

  pub fn with_registry(moniker: &str, registry: &DriverRegistry, config: &BackendConfig) -> MoonportResult<Self> {
    let driver = registry.create(moniker, config)?;
    Ok(Self::from_driver(driver, config))
  }

  pub fn from_driver(driver: Box<dyn BuildBackendDriver>, config: &BackendConfig) -> Self {
    Self {
      driver,
      submit_timeout: config.submit_timeout,
    }
  }

  pub fn moniker(&self) -> &str {
    self.driver.moniker()
  }

  /// Hands `pipeline` to the driver and returns the accepted job.
  ///
  /// The whole driver call is bounded by the configured submit timeout.
  #[instrument(
        name = "BuildBackend::run_pipeline",
        skip_all,
        fields(provider = %self.moniker(), pipeline = %pipeline.name()),
        err(Display)
    )]
  pub async fn run_pipeline(&self, pipeline: &mut Pipeline) -> MoonportResult<JobData> {
    event!(Level::INFO, "Launching pipeline using backend");
    match tokio::time::timeout(self.submit_timeout, self.driver.create_pipeline(pipeline)).await {
      Ok(result) => result,
      Err(_) => {
        event!(Level::ERROR, timeout = ?self.submit_timeout, "Backend submission timed out.");
        Err(MoonportError::Timeout {
          provider: self.moniker().to_string(),
          after: self.submit_timeout,
        })
      }
    }
  }
}

impl std::fmt::Debug for BuildBackend {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BuildBackend")
      .field("moniker", &self.moniker())
      .field("submit_timeout", &self.submit_timeout)
      .finish()
  }
}
