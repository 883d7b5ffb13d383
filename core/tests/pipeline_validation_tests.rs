// tests/pipeline_validation_tests.rs
mod common;

use common::*;
use moonport::{MoonportError, Options, Pipeline, PipelineDefinition, Stage};
use tempfile::TempDir;

#[test]
fn test_pipeline_file_is_decoded() {
  setup_tracing();
  let dir = TempDir::new().unwrap();
  write_file(dir.path(), "pipeline.yaml", BUILD_PIPELINE);

  let pipeline = Pipeline::from_file(dir.path().join("pipeline.yaml"), Options::default()).unwrap();
  assert_eq!(pipeline.name(), "build-pipeline");
  assert_eq!(pipeline.spec().repository, "https://github.com/example/app");
  assert_eq!(pipeline.spec().service_account, "builder@example.iam.gserviceaccount.com");
  assert_eq!(pipeline.env_vars().get("A_VAR").map(String::as_str), Some("one"));
  assert_eq!(pipeline.stages().len(), 1);

  let build = &pipeline.stages()[0];
  assert_eq!(build.name, "build");
  assert_eq!(build.comment.as_deref(), Some("compile"));
  assert_eq!(
    build.steps.iter().map(|s| s.step_label.as_str()).collect::<Vec<_>>(),
    vec!["stepA", "stepB"]
  );
  assert!(pipeline.catalog().is_none());
  assert!(!pipeline.is_validated());
}

#[test]
fn test_stage_order_follows_the_file() {
  setup_tracing();
  let yaml = r#"
metadata: {name: ordered}
spec:
  stages:
    test: {steps: [{step: stepA}]}
    build: {steps: [{step: stepB}]}
    deploy: {steps: []}
"#;
  let pipeline = Pipeline::from_yaml_str(yaml, "ordered.yaml", Options::default()).unwrap();
  let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name.as_str()).collect();
  assert_eq!(names, vec!["test", "build", "deploy"]);
}

#[test]
fn test_duplicate_stage_names_are_rejected() {
  setup_tracing();
  let yaml = "spec:\n  stages:\n    build: {steps: []}\n    build: {steps: []}\n";
  let err = Pipeline::from_yaml_str(yaml, "dup.yaml", Options::default()).unwrap_err();
  assert!(matches!(err, MoonportError::Decode { .. }), "got {:?}", err);
}

#[test]
fn test_missing_pipeline_file_is_an_io_error() {
  setup_tracing();
  let err = Pipeline::from_file("/no/such/pipeline.yaml", Options::default()).unwrap_err();
  assert!(err.is_io());
  assert!(err.to_string().contains("/no/such/pipeline.yaml"));
}

#[test]
fn test_validate_resolves_catalog() {
  setup_tracing();
  let steps = ab_step_dir();
  let mut pipeline = pipeline_from(BUILD_PIPELINE, &[steps.path()]);

  assert!(pipeline.get_step("stepA").is_none());
  pipeline.validate().unwrap();

  assert!(pipeline.is_validated());
  assert_eq!(pipeline.catalog().unwrap().len(), 2);
  assert_eq!(pipeline.get_step("stepA").unwrap().spec.image, "alpine:3");
  assert!(pipeline.get_step("stepC").is_none());
}

#[test]
fn test_validate_rejects_empty_catalog() {
  setup_tracing();
  let empty = TempDir::new().unwrap();
  write_file(empty.path(), "notes.md", "no steps here");
  let mut pipeline = pipeline_from(BUILD_PIPELINE, &[empty.path()]);

  let err = pipeline.validate().unwrap_err();
  assert!(err.is_configuration(), "got {:?}", err);
  assert!(err.to_string().contains("step catalog is empty"));
  assert!(!pipeline.is_validated());
}

#[test]
fn test_validate_rejects_empty_catalog_without_stages() {
  setup_tracing();
  let mut pipeline = Pipeline::new(PipelineDefinition::new("nothing"), Options::default());
  assert!(pipeline.validate().unwrap_err().is_configuration());
}

#[test]
fn test_validate_rejects_unlabeled_reference() {
  setup_tracing();
  let steps = ab_step_dir();
  let definition = PipelineDefinition::new("unlabeled")
    .stage(Stage::new("build").step("stepA"))
    .stage(Stage::new("package").step("stepB").step(""));
  let mut pipeline = Pipeline::new(definition, Options::with_step_sources([steps.path()]));

  let err = pipeline.validate().unwrap_err();
  assert!(err.is_configuration());
  let message = err.to_string();
  assert!(message.contains("package"), "stage missing from '{}'", message);
  assert!(message.contains("#1"), "position missing from '{}'", message);
}

#[test]
fn test_validate_rejects_unknown_label_when_strict() {
  setup_tracing();
  let steps = ab_step_dir();
  let definition = PipelineDefinition::new("typo").stage(Stage::new("build").step("stepA").step("stepZ"));
  let mut pipeline = Pipeline::new(definition, Options::with_step_sources([steps.path()]));

  let err = pipeline.validate().unwrap_err();
  assert!(err.is_resolution());
  match err {
    MoonportError::UnresolvedStep { stage, label } => {
      assert_eq!(stage, "build");
      assert_eq!(label, "stepZ");
    }
    other => panic!("Expected UnresolvedStep, got {:?}", other),
  }
}

#[test]
fn test_validate_defers_unknown_label_when_lenient() {
  setup_tracing();
  let steps = ab_step_dir();
  let definition = PipelineDefinition::new("typo").stage(Stage::new("build").step("stepZ"));
  let options = Options::with_step_sources([steps.path()]).strict_references(false);
  let mut pipeline = Pipeline::new(definition, options);

  pipeline.validate().unwrap();
  assert!(pipeline.get_step("stepZ").is_none());
}

#[test]
fn test_validate_wraps_catalog_errors() {
  setup_tracing();
  let mut pipeline = Pipeline::new(
    PipelineDefinition::new("lost"),
    Options::with_step_sources(["/missing/steps/dir"]),
  );

  let err = pipeline.validate().unwrap_err();
  assert!(err.is_io());
  assert!(err.to_string().starts_with("loading step catalog"));
}

#[test]
fn test_unnamed_pipeline_is_permitted() {
  setup_tracing();
  let steps = ab_step_dir();
  let yaml = "spec:\n  stages:\n    only: {steps: [{step: stepA}]}\n";
  let mut pipeline = pipeline_from(yaml, &[steps.path()]);
  assert_eq!(pipeline.name(), "");
  pipeline.validate().unwrap();
}

#[test]
fn test_definition_round_trips_stage_order() {
  let definition = PipelineDefinition::new("rt")
    .env("K", "V")
    .stage(Stage::new("zeta").comment("first").step("a"))
    .stage(Stage::new("alpha").step("b"));

  let yaml = serde_yaml::to_string(&definition).unwrap();
  let zeta = yaml.find("zeta").unwrap();
  let alpha = yaml.find("alpha").unwrap();
  assert!(zeta < alpha, "stage order lost in:\n{}", yaml);

  let decoded: PipelineDefinition = serde_yaml::from_str(&yaml).unwrap();
  assert_eq!(decoded, definition);
}
