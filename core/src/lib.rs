// src/lib.rs

//! moonport: resolve declarative build pipelines and dispatch them to
//! pluggable remote build backends.
//!
//! A pipeline is a list of named stages, each referencing reusable step
//! templates kept in separate YAML files. moonport:
//!  - Loads step templates from one or more source directories into a catalog.
//!  - Validates that every stage reference resolves against that catalog.
//!  - Flattens stages into an ordered list of build steps.
//!  - Submits them through a backend driver picked by moniker (e.g. `gcb`),
//!    returning the backend's job id without waiting for the build.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod launchpad;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::{JobData, Metadata, Step, StepSpec, StepTemplate};

pub use crate::catalog::{load_step_directory, load_step_file, load_step_sources, StepCatalog};

pub use crate::pipeline::{Pipeline, PipelineDefinition, PipelineSpec, Stage};

pub use crate::backend::{BuildBackend, BuildBackendDriver, BuildRequest, BuildStep, DriverRegistry};

pub use crate::config::{BackendConfig, Options};

pub use crate::error::{MoonportError, MoonportResult};

// The orchestrator most callers start from
pub use crate::launchpad::Launchpad;

/*
    Typical flow:
    1. Build `Options` with the step source directories.
    2. Load a `Pipeline` with `Pipeline::from_file(path, options)`.
    3. Call `pipeline.validate()` to resolve the step catalog early.
    4. Create a `Launchpad` with a backend moniker and a `BackendConfig`.
    5. `launchpad.run(&mut pipeline).await` returns the remote `JobData`.
*/
