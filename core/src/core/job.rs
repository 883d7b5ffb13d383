// moonport/src/core/job.rs

//! Defines the outcome of a successful pipeline submission.

use serde::{Deserialize, Serialize};

/// Handle to a job accepted by a remote build backend.
///
/// Only drivers construct this, and only after the backend acknowledged the
/// submission. The job itself may still be queued or running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobData {
  pub job_id: String,
  /// Moniker of the backend that accepted the job.
  pub provider: String,
}

impl JobData {
  pub fn new(job_id: impl Into<String>, provider: impl Into<String>) -> Self {
    Self {
      job_id: job_id.into(),
      provider: provider.into(),
    }
  }
}

impl std::fmt::Display for JobData {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.provider, self.job_id)
  }
}
