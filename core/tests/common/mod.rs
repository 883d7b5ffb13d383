// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use moonport::backend::prepare_request;
use moonport::{BuildBackendDriver, BuildRequest, JobData, MoonportResult, Options, Pipeline};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tempfile::TempDir;
use tracing::Level;

// --- Step and pipeline fixtures ---

pub fn step_yaml(name: &str, image: &str, args: &[&str]) -> String {
  let args = args.iter().map(|a| format!("\"{}\"", a)).collect::<Vec<_>>().join(", ");
  format!(
    "metadata:\n  name: {name}\nspec:\n  image: {image}\n  args: [{args}]\n",
    name = name,
    image = image,
    args = args
  )
}

/// Joins step documents into one multi-document YAML stream.
pub fn multi_doc(docs: &[String]) -> String {
  docs.join("---\n")
}

pub fn write_file(dir: &Path, relative: &str, content: &str) {
  let path = dir.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, content).unwrap();
}

/// A temporary step source directory holding `files` (relative path, content).
pub fn step_dir(files: &[(&str, String)]) -> TempDir {
  let dir = TempDir::new().unwrap();
  for (relative, content) in files {
    write_file(dir.path(), relative, content);
  }
  dir
}

/// Step source with `stepA` and `stepB`.
pub fn ab_step_dir() -> TempDir {
  step_dir(&[
    ("a.yaml", step_yaml("stepA", "alpine:3", &["echo", "a"])),
    ("b.yml", step_yaml("stepB", "golang:1.22", &["go", "build", "./..."])),
  ])
}

pub const BUILD_PIPELINE: &str = r#"
metadata:
  name: build-pipeline
spec:
  repo: https://github.com/example/app
  service-account: builder@example.iam.gserviceaccount.com
  env:
    B_VAR: two
    A_VAR: one
  stages:
    build:
      comment: compile
      steps:
        - step: stepA
        - step: stepB
"#;

pub fn pipeline_from(yaml: &str, sources: &[&Path]) -> Pipeline {
  Pipeline::from_yaml_str(yaml, "test-pipeline.yaml", Options::with_step_sources(sources.iter().copied())).unwrap()
}

pub fn lenient_pipeline_from(yaml: &str, sources: &[&Path]) -> Pipeline {
  let options = Options::with_step_sources(sources.iter().copied()).strict_references(false);
  Pipeline::from_yaml_str(yaml, "test-pipeline.yaml", options).unwrap()
}

// --- Fake drivers ---

/// Records every request it would have submitted.
#[derive(Clone)]
pub struct RecordingDriver {
  pub moniker: String,
  pub job_id: String,
  pub requests: Arc<Mutex<Vec<BuildRequest>>>,
  pub calls: Arc<AtomicUsize>,
}

impl RecordingDriver {
  pub fn new(moniker: &str, job_id: &str) -> Self {
    Self {
      moniker: moniker.to_string(),
      job_id: job_id.to_string(),
      requests: Arc::new(Mutex::new(Vec::new())),
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn submitted(&self) -> Vec<BuildRequest> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl BuildBackendDriver for RecordingDriver {
  fn moniker(&self) -> &str {
    &self.moniker
  }

  async fn create_pipeline(&self, pipeline: &mut Pipeline) -> MoonportResult<JobData> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let request = prepare_request(pipeline).await?;
    self.requests.lock().push(request);
    Ok(JobData::new(self.job_id.clone(), self.moniker.clone()))
  }
}

/// Never answers within a reasonable deadline.
pub struct StalledDriver {
  pub delay: Duration,
}

#[async_trait]
impl BuildBackendDriver for StalledDriver {
  fn moniker(&self) -> &str {
    "stalled"
  }

  async fn create_pipeline(&self, _pipeline: &mut Pipeline) -> MoonportResult<JobData> {
    tokio::time::sleep(self.delay).await;
    Ok(JobData::new("too-late", "stalled"))
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
