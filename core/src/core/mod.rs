// moonport/src/core/mod.rs

pub mod job;
pub mod metadata;
pub mod step;

// Re-export key types for easier access from other moonport modules (and lib.rs)
pub use job::JobData;
pub use metadata::Metadata;
pub use step::{Step, StepSpec, StepTemplate};
