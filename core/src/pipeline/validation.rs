// moonport/src/pipeline/validation.rs

//! Contains `Pipeline::validate()`, which resolves the step catalog and
//! checks that every stage can be turned into concrete build steps.

use crate::catalog::{load_step_sources, StepCatalog};
use crate::error::{MoonportError, MoonportResult, ResultExt};
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, Level};

impl Pipeline {
  /// Checks whether the pipeline can run. Must succeed before dispatch.
  ///
  /// 1. Loads the step catalog from `options.step_sources` and keeps it.
  /// 2. Rejects an empty catalog.
  /// 3. Rejects any step reference with an empty label, naming its stage and position.
  /// 4. With `strict_references` (the default), rejects labels missing from the catalog.
  #[instrument(
        name = "Pipeline::validate",
        skip_all,
        fields(
            pipeline = %self.name(),
            num_stages = self.stages().len(),
            num_sources = self.options.step_sources.len(),
        ),
        err(Display)
    )]
  pub fn validate(&mut self) -> MoonportResult<()> {
    self.validated = false;
    let catalog = load_step_sources(&self.options.step_sources).context("loading step catalog")?;
    self.validate_with_catalog(catalog)
  }

  /// Runs the checks of `validate()` against a catalog loaded elsewhere.
  pub(crate) fn validate_with_catalog(&mut self, catalog: StepCatalog) -> MoonportResult<()> {
    self.validated = false;
    let catalog = self.catalog.insert(catalog);

    if catalog.is_empty() {
      return Err(MoonportError::configuration(
        "Pipeline::validate",
        "step catalog is empty, this pipeline does not know how to do anything",
      ));
    }

    for stage in &self.definition.spec.stages {
      event!(Level::INFO, "Verifying stage {} ({} steps)", stage.name, stage.steps.len());
      for (position, spec) in stage.steps.iter().enumerate() {
        if spec.step_label.is_empty() {
          return Err(MoonportError::configuration(
            format!("stage '{}'", stage.name),
            format!("step #{} from stage {} has no label", position, stage.name),
          ));
        }
        if self.options.strict_references && !catalog.contains(&spec.step_label) {
          event!(Level::ERROR, stage = %stage.name, label = %spec.step_label, "Unknown step reference.");
          return Err(MoonportError::UnresolvedStep {
            stage: stage.name.clone(),
            label: spec.step_label.clone(),
          });
        }
      }
    }

    self.validated = true;
    event!(Level::DEBUG, steps = catalog.len(), "Pipeline validated.");
    Ok(())
  }
}
