// moonport/src/core/step.rs

//! Step templates (catalog entries) and the by-name references stages hold.

use super::Metadata;
use serde::{Deserialize, Serialize};

/// A reusable unit of work: run `image` with `args`.
///
/// Steps live in their own files and know nothing about the pipelines that use them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
  #[serde(default)]
  pub metadata: Metadata,
  #[serde(default)]
  pub spec: StepTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTemplate {
  #[serde(default)]
  pub image: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bundle: Option<String>,
  #[serde(default)]
  pub args: Vec<String>,
}

impl Step {
  pub fn new(name: impl Into<String>, image: impl Into<String>, args: &[&str]) -> Self {
    Self {
      metadata: Metadata::named(name),
      spec: StepTemplate {
        image: image.into(),
        bundle: None,
        args: args.iter().map(|a| (*a).to_string()).collect(),
      },
    }
  }

  pub fn name(&self) -> &str {
    &self.metadata.name
  }
}

/// A stage's reference to a catalog step. Serialized as `{step: <label>}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
  #[serde(rename = "step", default)]
  pub step_label: String,
}

impl StepSpec {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      step_label: label.into(),
    }
  }
}
