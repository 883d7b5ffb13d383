// moonport/src/config.rs

//! Explicit configuration values handed to the catalog loader, the validator
//! and the backend drivers. Nothing here is global: callers build a value and
//! pass it along.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GCB_ENDPOINT: &str = "https://cloudbuild.googleapis.com";
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Options governing how a pipeline resolves its steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
  /// Directories scanned for step definitions. Later entries override earlier ones.
  pub step_sources: Vec<PathBuf>,
  /// Reject references to unknown step labels during validation instead of
  /// leaving them for the backend driver to discover.
  pub strict_references: bool,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      step_sources: Vec::new(),
      strict_references: true,
    }
  }
}

impl Options {
  pub fn with_step_sources<I, P>(sources: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    Self {
      step_sources: sources.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn strict_references(mut self, strict: bool) -> Self {
    self.strict_references = strict;
    self
  }

  /// Reads `MOONPORT_STEP_SOURCES`, a `:`-separated directory list.
  pub fn from_env() -> Self {
    let step_sources = std::env::var("MOONPORT_STEP_SOURCES")
      .map(|raw| parse_source_list(&raw))
      .unwrap_or_default();
    Self {
      step_sources,
      ..Default::default()
    }
  }
}

fn parse_source_list(raw: &str) -> Vec<PathBuf> {
  raw
    .split(':')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(PathBuf::from)
    .collect()
}

/// Settings a backend driver needs to reach its build service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
  /// Project the builds are created in.
  pub project_id: Option<String>,
  /// Base URL of the build service API.
  pub endpoint: String,
  /// OAuth2 bearer token sent with every request.
  pub access_token: Option<String>,
  /// Upper bound on a whole driver call, validation and submission included.
  pub submit_timeout: Duration,
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self {
      project_id: None,
      endpoint: DEFAULT_GCB_ENDPOINT.to_string(),
      access_token: None,
      submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
    }
  }
}

impl BackendConfig {
  pub fn new(project_id: impl Into<String>) -> Self {
    Self {
      project_id: Some(project_id.into()),
      ..Default::default()
    }
  }

  pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into().trim_end_matches('/').to_string();
    self
  }

  pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
    self.access_token = Some(token.into());
    self
  }

  pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
    self.submit_timeout = timeout;
    self
  }

  /// Creates configuration from environment variables
  ///
  /// - MOONPORT_PROJECT_ID (optional)
  /// - MOONPORT_GCB_ENDPOINT (optional, default: https://cloudbuild.googleapis.com)
  /// - MOONPORT_ACCESS_TOKEN (optional)
  /// - MOONPORT_SUBMIT_TIMEOUT (optional, seconds, default: 60)
  ///
  /// Missing values are only an error once a driver that needs them is built.
  pub fn from_env() -> Self {
    let project_id = non_empty_var("MOONPORT_PROJECT_ID");
    let endpoint = non_empty_var("MOONPORT_GCB_ENDPOINT")
      .map(|e| e.trim_end_matches('/').to_string())
      .unwrap_or_else(|| DEFAULT_GCB_ENDPOINT.to_string());
    let access_token = non_empty_var("MOONPORT_ACCESS_TOKEN");
    let submit_timeout = std::env::var("MOONPORT_SUBMIT_TIMEOUT")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(DEFAULT_SUBMIT_TIMEOUT);

    Self {
      project_id,
      endpoint,
      access_token,
      submit_timeout,
    }
  }
}

fn non_empty_var(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
