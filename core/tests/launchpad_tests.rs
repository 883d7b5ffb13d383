// tests/launchpad_tests.rs
mod common;

use common::*;
use mockito::Server;
use moonport::{BackendConfig, BuildBackend, DriverRegistry, Launchpad};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_default_launchpad_has_no_backend() {
  setup_tracing();
  let steps = ab_step_dir();
  let mut pipeline = pipeline_from(BUILD_PIPELINE, &[steps.path()]);

  let launchpad = Launchpad::default();
  assert!(launchpad.backend_moniker().is_none());

  let err = launchpad.run(&mut pipeline).await.unwrap_err();
  assert!(err.is_configuration());
  assert!(err.to_string().contains("does not have a valid backend"));
}

#[test]
fn test_unknown_moniker_fails_without_building_anything() {
  setup_tracing();
  let built = Arc::new(AtomicUsize::new(0));
  let registry = DriverRegistry::new();
  let counter = built.clone();
  registry.register("counting", move |_config| {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(RecordingDriver::new("counting", "id")) as _)
  });

  let err = Launchpad::with_registry("nonexistent", &registry, &BackendConfig::default()).unwrap_err();
  assert!(err.is_configuration());
  assert!(err.to_string().starts_with("creating build backend"));
  assert_eq!(built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_moniker_with_builtin_drivers() {
  setup_tracing();
  let err = Launchpad::new("nonexistent", &BackendConfig::default()).unwrap_err();
  assert!(err.is_configuration());
  assert!(err.to_string().contains("unknown build driver 'nonexistent'"));
  assert!(err.to_string().contains("gcb"));
}

#[test]
fn test_cloud_build_without_project_is_configuration_error() {
  setup_tracing();
  let config = BackendConfig::default().with_access_token("tok");
  let err = Launchpad::new("gcb", &config).unwrap_err();
  assert!(err.is_configuration());
}

#[tokio::test]
async fn test_job_data_passes_through_unchanged() {
  setup_tracing();
  let steps = ab_step_dir();
  let mut pipeline = pipeline_from(BUILD_PIPELINE, &[steps.path()]);

  let driver = RecordingDriver::new("fake", "job-7");
  let launchpad = Launchpad::from_backend(BuildBackend::from_driver(
    Box::new(driver.clone()),
    &BackendConfig::default(),
  ));
  assert_eq!(launchpad.backend_moniker(), Some("fake"));

  let data = launchpad.run(&mut pipeline).await.unwrap();
  assert_eq!(data.job_id, "job-7");
  assert_eq!(data.provider, "fake");
  assert_eq!(driver.call_count(), 1);
}

#[tokio::test]
async fn test_backend_errors_pass_through_unchanged() {
  setup_tracing();
  let steps = ab_step_dir();
  let yaml = "metadata: {name: broken}\nspec:\n  stages:\n    build: {steps: [{step: nowhere}]}\n";
  let mut pipeline = lenient_pipeline_from(yaml, &[steps.path()]);

  let launchpad = Launchpad::from_backend(BuildBackend::from_driver(
    Box::new(RecordingDriver::new("fake", "never")),
    &BackendConfig::default(),
  ));
  let err = launchpad.run(&mut pipeline).await.unwrap_err();
  assert!(err.is_resolution());
}

#[tokio::test]
async fn test_end_to_end_on_cloud_build() {
  setup_tracing();
  let mut server = Server::new_async().await;
  let mock = server
    .mock("POST", "/v1/projects/proj/builds")
    .match_header("authorization", "Bearer tok")
    .with_status(200)
    .with_header("content-type", "application/json")
    .with_body(r#"{"name": "operations/build/proj/op", "metadata": {"build": {"id": "build-e2e"}}}"#)
    .create_async()
    .await;

  let steps = ab_step_dir();
  let mut pipeline = pipeline_from(BUILD_PIPELINE, &[steps.path()]);
  pipeline.validate().unwrap();

  let config = BackendConfig::new("proj")
    .with_endpoint(server.url())
    .with_access_token("tok");
  let launchpad = Launchpad::new("gcb", &config).unwrap();
  assert_eq!(launchpad.backend_moniker(), Some("gcb"));

  let data = launchpad.run(&mut pipeline).await.unwrap();
  assert_eq!(data.to_string(), "gcb/build-e2e");
  mock.assert_async().await;
}
