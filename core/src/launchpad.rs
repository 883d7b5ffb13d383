// moonport/src/launchpad.rs

//! Defines `Launchpad`, the single entry point external callers use to run a
//! pipeline against a configured build backend.

use crate::backend::{BuildBackend, DriverRegistry};
use crate::config::BackendConfig;
use crate::core::JobData;
use crate::error::{MoonportError, MoonportResult};
use crate::pipeline::Pipeline;
use tracing::{event, instrument, Level};

/// Owns one build backend for its whole lifetime.
///
/// A backend that cannot be built makes construction fail; there is no way
/// to attach one later.
#[derive(Debug, Default)]
pub struct Launchpad {
  backend: Option<BuildBackend>,
}

impl Launchpad {
  /// Creates a launchpad for `moniker` using the built-in drivers.
  pub fn new(moniker: &str, config: &BackendConfig) -> MoonportResult<Self> {
    let backend = BuildBackend::new(moniker, config).map_err(|e| e.context("creating build backend"))?;
    Ok(Self::from_backend(backend))
  }

  pub fn with_registry(moniker: &str, registry: &DriverRegistry, config: &BackendConfig) -> MoonportResult<Self> {
    let backend =
      BuildBackend::with_registry(moniker, registry, config).map_err(|e| e.context("creating build backend"))?;
    Ok(Self::from_backend(backend))
  }

  pub fn from_backend(backend: BuildBackend) -> Self {
    event!(Level::DEBUG, provider = %backend.moniker(), "Launchpad ready.");
    Self { backend: Some(backend) }
  }

  /// Moniker of the configured backend, if any.
  pub fn backend_moniker(&self) -> Option<&str> {
    self.backend.as_ref().map(BuildBackend::moniker)
  }

  /// Runs `pipeline` on the configured backend and returns its job handle.
  ///
  /// The backend's result is passed through unchanged.
  #[instrument(name = "Launchpad::run", skip_all, fields(pipeline = %pipeline.name()), err(Display))]
  pub async fn run(&self, pipeline: &mut Pipeline) -> MoonportResult<JobData> {
    let backend = self.backend.as_ref().ok_or_else(|| {
      MoonportError::configuration("Launchpad::run", "launchpad does not have a valid backend")
    })?;
    backend.run_pipeline(pipeline).await
  }
}
