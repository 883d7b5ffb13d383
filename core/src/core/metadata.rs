// moonport/src/core/metadata.rs

//! Identifying metadata shared by pipelines and step templates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name plus free-form labels and annotations.
///
/// For a step template the name doubles as its key in the step catalog, so a
/// step without a name can never be referenced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub labels: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub annotations: BTreeMap<String, String>,
}

impl Metadata {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn has_name(&self) -> bool {
    !self.name.is_empty()
  }
}
