// moonport/src/catalog.rs

//! Loads step templates from YAML files and merges them into a single
//! name-keyed `StepCatalog`.
//!
//! Merge rules:
//!  - Inside one file or one source directory, a later definition silently
//!    replaces an earlier one with the same name.
//!  - Across source directories, later sources still win, but every collision
//!    is logged at WARN and recorded in `StepCatalog::duplicates`.
//!  - Documents without `metadata.name` are skipped with a WARN and recorded in
//!    `StepCatalog::skipped`.
//!
//! Any unreadable path or malformed document fails the whole load; callers
//! never see a partially merged catalog.

use crate::core::Step;
use crate::error::{MoonportError, MoonportResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{event, instrument, Level};

const STEP_FILE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A step name that was defined by more than one source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateStep {
  pub name: String,
  /// File holding the definition that was replaced.
  pub overridden: PathBuf,
  /// File holding the definition that won.
  pub winner: PathBuf,
}

/// A document that was ignored because it has no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
  pub file: PathBuf,
  /// Zero-based position of the document inside `file`.
  pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
  steps: BTreeMap<String, Step>,
  origins: BTreeMap<String, PathBuf>,
  duplicates: Vec<DuplicateStep>,
  skipped: Vec<SkippedDocument>,
}

impl StepCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&Step> {
    self.steps.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.steps.contains_key(name)
  }

  /// Step names in sorted order.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.steps.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Step)> {
    self.steps.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// File the named step was loaded from, if it came from disk.
  pub fn origin(&self, name: &str) -> Option<&Path> {
    self.origins.get(name).map(PathBuf::as_path)
  }

  pub fn duplicates(&self) -> &[DuplicateStep] {
    &self.duplicates
  }

  pub fn skipped(&self) -> &[SkippedDocument] {
    &self.skipped
  }

  /// Adds a step programmatically, replacing any step with the same name.
  /// Unnamed steps are rejected with a configuration error.
  pub fn insert(&mut self, step: Step) -> MoonportResult<Option<Step>> {
    if !step.metadata.has_name() {
      return Err(MoonportError::configuration(
        "StepCatalog::insert",
        "step has no metadata name",
      ));
    }
    self.origins.remove(step.name());
    Ok(self.steps.insert(step.name().to_string(), step))
  }

  fn insert_from(&mut self, step: Step, origin: &Path) -> Option<PathBuf> {
    let name = step.name().to_string();
    let previous = self.origins.insert(name.clone(), origin.to_path_buf());
    self.steps.insert(name, step);
    previous
  }

  /// Merges `other` into `self` with `other` winning every collision.
  /// Collisions are silent; use `merge_source` when they must be reported.
  fn absorb(&mut self, other: StepCatalog) {
    self.skipped.extend(other.skipped);
    self.duplicates.extend(other.duplicates);
    for (name, step) in other.steps {
      let origin = other.origins.get(&name).cloned().unwrap_or_default();
      if let Some(previous) = self.insert_from(step, &origin) {
        event!(Level::DEBUG, step = %name, previous = %previous.display(), "Step redefined within the same source.");
      }
    }
  }

  /// Merges a whole source location, warning about every name it redefines.
  fn merge_source(&mut self, other: StepCatalog) {
    let mut incoming = other;
    self.skipped.append(&mut incoming.skipped);
    self.duplicates.append(&mut incoming.duplicates);
    for (name, step) in incoming.steps {
      let winner = incoming.origins.get(&name).cloned().unwrap_or_default();
      if self.steps.contains_key(&name) {
        let overridden = self.origins.get(&name).cloned().unwrap_or_default();
        event!(
          Level::WARN,
          step = %name,
          overridden = %overridden.display(),
          winner = %winner.display(),
          "Duplicate step '{}', later definition wins.",
          name
        );
        self.duplicates.push(DuplicateStep {
          name: name.clone(),
          overridden,
          winner: winner.clone(),
        });
      }
      self.insert_from(step, &winner);
    }
  }
}

impl FromIterator<Step> for StepCatalog {
  /// Builds a catalog in memory. Unnamed steps are dropped.
  fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
    let mut catalog = StepCatalog::new();
    for step in iter.into_iter().filter(|s| s.metadata.has_name()) {
      catalog.steps.insert(step.name().to_string(), step);
    }
    catalog
  }
}

/// Reads every step document in a YAML file.
///
/// The file may hold several `---`-separated documents; blank documents are
/// ignored and unnamed ones are skipped with a warning.
#[instrument(name = "catalog::load_step_file", skip_all, fields(file = %path.display()), err(Display))]
pub fn load_step_file(path: &Path) -> MoonportResult<StepCatalog> {
  let content = std::fs::read_to_string(path).map_err(|e| MoonportError::io(path, e))?;
  let mut catalog = StepCatalog::new();

  for (index, document) in serde_yaml::Deserializer::from_str(&content).enumerate() {
    let step = match Option::<Step>::deserialize(document).map_err(|e| MoonportError::decode(path, e))? {
      Some(step) => step,
      None => {
        event!(Level::DEBUG, index, "Blank document, nothing to load.");
        continue;
      }
    };

    if !step.metadata.has_name() {
      event!(
        Level::WARN,
        index,
        "Ignoring step #{} from {} as it does not have a name",
        index,
        path.display()
      );
      catalog.skipped.push(SkippedDocument {
        file: path.to_path_buf(),
        index,
      });
      continue;
    }

    if catalog.insert_from(step, path).is_some() {
      event!(Level::DEBUG, index, "Step redefined within the same file.");
    }
  }

  event!(Level::DEBUG, steps = catalog.len(), "Step file loaded.");
  Ok(catalog)
}

/// Recursively loads every `.yaml`/`.yml` file below `dir`.
///
/// Files are visited in lexicographic path order; a later file silently
/// replaces same-named steps from an earlier one.
#[instrument(name = "catalog::load_step_directory", skip_all, fields(dir = %dir.display()), err(Display))]
pub fn load_step_directory(dir: &Path) -> MoonportResult<StepCatalog> {
  let mut files = Vec::new();
  collect_step_files(dir, &mut files)?;
  files.sort();

  let mut catalog = StepCatalog::new();
  for file in &files {
    let file_catalog = load_step_file(file).map_err(|e| e.context(format!("reading steps from {}", file.display())))?;
    catalog.absorb(file_catalog);
  }

  event!(Level::DEBUG, files = files.len(), steps = catalog.len(), "Step directory loaded.");
  Ok(catalog)
}

fn collect_step_files(dir: &Path, files: &mut Vec<PathBuf>) -> MoonportResult<()> {
  let entries = std::fs::read_dir(dir).map_err(|e| MoonportError::io(dir, e))?;
  for entry in entries {
    let entry = entry.map_err(|e| MoonportError::io(dir, e))?;
    let path = entry.path();
    let file_type = entry.file_type().map_err(|e| MoonportError::io(&path, e))?;

    if file_type.is_dir() {
      collect_step_files(&path, files)?;
    } else if is_step_file(&path) {
      files.push(path);
    }
  }
  Ok(())
}

fn is_step_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| STEP_FILE_EXTENSIONS.contains(&ext))
}

/// Loads and merges several source directories in order.
///
/// Later sources win on name collisions; each collision is logged at WARN and
/// recorded in the returned catalog's `duplicates`.
#[instrument(name = "catalog::load_step_sources", skip_all, fields(num_sources = sources.len()), err(Display))]
pub fn load_step_sources<P: AsRef<Path>>(sources: &[P]) -> MoonportResult<StepCatalog> {
  let mut catalog = StepCatalog::new();
  for source in sources {
    let source = source.as_ref();
    let dir_catalog =
      load_step_directory(source).map_err(|e| e.context(format!("reading files from {}", source.display())))?;
    catalog.merge_source(dir_catalog);
  }

  event!(
    Level::INFO,
    steps = catalog.len(),
    duplicates = catalog.duplicates.len(),
    skipped = catalog.skipped.len(),
    "Step catalog loaded."
  );
  Ok(catalog)
}
