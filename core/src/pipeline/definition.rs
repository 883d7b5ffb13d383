// moonport/src/pipeline/definition.rs

//! Contains the `Pipeline` struct, its serialized form, and constructors for
//! building one from a file, a YAML string, or in memory.

use crate::catalog::StepCatalog;
use crate::config::Options;
use crate::core::{Metadata, Step, StepSpec};
use crate::error::{MoonportError, MoonportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

/// The serialized pipeline: top-level `metadata` and `spec` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDefinition {
  #[serde(default)]
  pub metadata: Metadata,
  #[serde(default)]
  pub spec: PipelineSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
  #[serde(rename = "repo", default)]
  pub repository: String,
  #[serde(rename = "service-account", default)]
  pub service_account: String,
  /// Sorted by key so every translation of it is deterministic.
  #[serde(rename = "env", default)]
  pub env_vars: BTreeMap<String, String>,
  /// Stages in declaration order. Written as a name-keyed mapping in YAML.
  #[serde(default, with = "stage_map")]
  pub stages: Vec<Stage>,
}

/// A named, ordered group of step references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
  pub name: String,
  pub comment: Option<String>,
  pub steps: Vec<StepSpec>,
}

impl Stage {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn comment(mut self, comment: impl Into<String>) -> Self {
    self.comment = Some(comment.into());
    self
  }

  pub fn step(mut self, label: impl Into<String>) -> Self {
    self.steps.push(StepSpec::new(label));
    self
  }
}

impl PipelineDefinition {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      metadata: Metadata::named(name),
      spec: PipelineSpec::default(),
    }
  }

  pub fn repository(mut self, repo: impl Into<String>) -> Self {
    self.spec.repository = repo.into();
    self
  }

  pub fn service_account(mut self, account: impl Into<String>) -> Self {
    self.spec.service_account = account.into();
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.spec.env_vars.insert(key.into(), value.into());
    self
  }

  pub fn stage(mut self, stage: Stage) -> Self {
    self.spec.stages.push(stage);
    self
  }
}

/// A pipeline definition bound to the options it resolves steps with.
///
/// The step catalog is populated by `validate()` and lives only as long as
/// this value; it is never serialized or shared with other pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
  pub(crate) definition: PipelineDefinition,
  pub(crate) options: Options,
  pub(crate) catalog: Option<StepCatalog>,
  pub(crate) validated: bool,
}

impl Pipeline {
  pub fn new(definition: PipelineDefinition, options: Options) -> Self {
    if !definition.metadata.has_name() {
      event!(Level::DEBUG, "Pipeline constructed without a name.");
    }
    Self {
      definition,
      options,
      catalog: None,
      validated: false,
    }
  }

  /// Decodes a pipeline from YAML text. `origin` only labels errors.
  pub fn from_yaml_str(text: &str, origin: impl AsRef<Path>, options: Options) -> MoonportResult<Self> {
    let definition: PipelineDefinition =
      serde_yaml::from_str(text).map_err(|e| MoonportError::decode(origin.as_ref(), e))?;
    Ok(Self::new(definition, options))
  }

  /// Reads a pipeline configuration file.
  pub fn from_file(path: impl AsRef<Path>, options: Options) -> MoonportResult<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .map_err(|e| MoonportError::io(path, e))
      .map_err(|e| e.context("reading pipeline file"))?;
    let pipeline = Self::from_yaml_str(&text, path, options).map_err(|e| e.context("decoding pipeline file"))?;

    event!(
      Level::INFO,
      "Successfully loaded pipeline {} ({} stages)",
      pipeline.name(),
      pipeline.stages().len()
    );
    Ok(pipeline)
  }

  pub fn definition(&self) -> &PipelineDefinition {
    &self.definition
  }

  pub fn metadata(&self) -> &Metadata {
    &self.definition.metadata
  }

  pub fn name(&self) -> &str {
    &self.definition.metadata.name
  }

  pub fn spec(&self) -> &PipelineSpec {
    &self.definition.spec
  }

  pub fn stages(&self) -> &[Stage] {
    &self.definition.spec.stages
  }

  pub fn env_vars(&self) -> &BTreeMap<String, String> {
    &self.definition.spec.env_vars
  }

  pub fn options(&self) -> &Options {
    &self.options
  }

  pub fn step_sources(&self) -> &[PathBuf] {
    &self.options.step_sources
  }

  /// The resolved catalog, present once `validate()` has loaded it.
  pub fn catalog(&self) -> Option<&StepCatalog> {
    self.catalog.as_ref()
  }

  /// True only after the most recent `validate()` call succeeded.
  pub fn is_validated(&self) -> bool {
    self.validated
  }

  /// Looks a step up in the resolved catalog. Never fabricates a default.
  pub fn get_step(&self, label: &str) -> Option<&Step> {
    self.catalog.as_ref().and_then(|catalog| catalog.get(label))
  }
}

/// (De)serializes `Vec<Stage>` as a YAML mapping while keeping document order.
mod stage_map {
  use super::Stage;
  use crate::core::StepSpec;
  use serde::de::{self, MapAccess, Visitor};
  use serde::ser::SerializeMap;
  use serde::{Deserialize, Deserializer, Serialize, Serializer};
  use std::fmt;

  #[derive(Deserialize)]
  struct StageBody {
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    steps: Vec<StepSpec>,
  }

  #[derive(Serialize)]
  struct StageBodyRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a String>,
    steps: &'a [StepSpec],
  }

  struct StagesVisitor;

  impl<'de> Visitor<'de> for StagesVisitor {
    type Value = Vec<Stage>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str("a mapping of stage names to stages")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
      Ok(Vec::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
      let mut stages: Vec<Stage> = Vec::with_capacity(map.size_hint().unwrap_or(0));
      while let Some((name, body)) = map.next_entry::<String, StageBody>()? {
        if stages.iter().any(|s| s.name == name) {
          return Err(de::Error::custom(format!("duplicate stage '{}'", name)));
        }
        stages.push(Stage {
          name,
          comment: body.comment,
          steps: body.steps,
        });
      }
      Ok(stages)
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Stage>, D::Error> {
    deserializer.deserialize_map(StagesVisitor)
  }

  #[allow(clippy::ptr_arg)]
  pub fn serialize<S: Serializer>(stages: &Vec<Stage>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(stages.len()))?;
    for stage in stages {
      map.serialize_entry(
        &stage.name,
        &StageBodyRef {
          comment: stage.comment.as_ref(),
          steps: &stage.steps,
        },
      )?;
    }
    map.end()
  }
}
