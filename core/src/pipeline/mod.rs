// moonport/src/pipeline/mod.rs

//! Defines the `Pipeline` struct, its construction, and validation logic.

pub mod definition;
pub mod validation;

// Re-export the main Pipeline struct
pub use definition::{Pipeline, PipelineDefinition, PipelineSpec, Stage};
