// moonport/src/backend/driver.rs

//! Defines the `BuildBackendDriver` trait every build provider implements, and
//! the provider-agnostic `BuildRequest` drivers translate into their native
//! submission.

use crate::catalog::load_step_sources;
use crate::core::JobData;
use crate::error::{MoonportError, MoonportResult, ResultExt};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use tracing::{event, instrument, Level};

/// A provider-specific capability that submits a resolved pipeline to a
/// remote build service.
///
/// Implementations must:
/// 1. re-validate the pipeline themselves (see `prepare_request`), whatever
///    the caller already did;
/// 2. resolve every step reference before submitting anything;
/// 3. return as soon as the backend acknowledges the build, without waiting
///    for it to finish;
/// 4. only return `JobData` carrying the id the backend assigned.
#[async_trait]
pub trait BuildBackendDriver: Send + Sync {
  /// Short provider name this driver is registered under (e.g. `gcb`).
  fn moniker(&self) -> &str;

  async fn create_pipeline(&self, pipeline: &mut Pipeline) -> MoonportResult<JobData>;
}

/// A single resolved build step, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
  pub stage: String,
  pub label: String,
  pub image: String,
  pub bundle: Option<String>,
  pub args: Vec<String>,
  /// Pipeline environment as `KEY=VALUE`, sorted by key.
  pub env: Vec<String>,
}

/// The flattened, fully resolved form of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub pipeline_name: String,
  pub repository: String,
  pub service_account: String,
  pub env: Vec<String>,
  pub steps: Vec<BuildStep>,
}

impl BuildRequest {
  /// Flattens stages then steps in declared order, resolving every reference
  /// against the pipeline's catalog.
  ///
  /// Fails with `UnresolvedStep` on the first label the catalog lacks; no
  /// partial request is ever returned.
  #[instrument(name = "BuildRequest::assemble", skip_all, fields(pipeline = %pipeline.name()), err(Display))]
  pub fn assemble(pipeline: &Pipeline) -> MoonportResult<Self> {
    let env = env_pairs(pipeline);
    let mut steps = Vec::new();

    for stage in pipeline.stages() {
      event!(Level::INFO, "Building stage {}", stage.name);
      for spec in &stage.steps {
        let step = pipeline.get_step(&spec.step_label).ok_or_else(|| {
          event!(Level::ERROR, stage = %stage.name, label = %spec.step_label, "Unable to find step.");
          MoonportError::UnresolvedStep {
            stage: stage.name.clone(),
            label: spec.step_label.clone(),
          }
        })?;
        steps.push(BuildStep {
          stage: stage.name.clone(),
          label: spec.step_label.clone(),
          image: step.spec.image.clone(),
          bundle: step.spec.bundle.clone(),
          args: step.spec.args.clone(),
          env: env.clone(),
        });
      }
    }

    Ok(Self {
      pipeline_name: pipeline.name().to_string(),
      repository: pipeline.spec().repository.clone(),
      service_account: pipeline.spec().service_account.clone(),
      env,
      steps,
    })
  }

  pub fn step_labels(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.label.as_str()).collect()
  }
}

/// The pipeline environment in `KEY=VALUE` form. Key order is stable.
pub fn env_pairs(pipeline: &Pipeline) -> Vec<String> {
  pipeline
    .env_vars()
    .iter()
    .map(|(key, value)| format!("{}={}", key, value))
    .collect()
}

/// Re-validates `pipeline` and assembles its build request.
///
/// Every driver calls this first; a driver must not trust validation done by
/// its caller. The catalog is reloaded on the blocking pool.
pub async fn prepare_request(pipeline: &mut Pipeline) -> MoonportResult<BuildRequest> {
  revalidate(pipeline)
    .await
    .context("while validating pipeline before launch")?;
  BuildRequest::assemble(pipeline)
}

async fn revalidate(pipeline: &mut Pipeline) -> MoonportResult<()> {
  pipeline.validated = false;
  let sources = pipeline.step_sources().to_vec();
  let catalog = tokio::task::spawn_blocking(move || load_step_sources(&sources))
    .await
    .map_err(|e| MoonportError::configuration("prepare_request", format!("step catalog reload aborted: {}", e)))?
    .context("loading step catalog")?;
  pipeline.validate_with_catalog(catalog)
}
