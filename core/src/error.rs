// moonport/src/error.rs
use anyhow::Error as AnyhowError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoonportError {
  /// Structurally invalid or incomplete pipeline, catalog or backend setup.
  /// Always detected before any network call.
  #[error("Configuration error in {context}: {message}")]
  Configuration { context: String, message: String },

  #[error("I/O error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Malformed document in {}: {source}", path.display())]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("Stage '{stage}' references step '{label}' which is not in the step catalog")]
  UnresolvedStep { stage: String, label: String },

  #[error("Backend '{provider}' failed to submit pipeline '{pipeline}'. Source: {source}")]
  Backend {
    provider: String,
    pipeline: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Backend '{provider}' did not acknowledge the submission within {after:?}")]
  Timeout { provider: String, after: Duration },

  #[error("{context}: {source}")]
  Context {
    context: String,
    #[source]
    source: Box<MoonportError>,
  },
}

impl MoonportError {
  pub fn configuration(context: impl Into<String>, message: impl Into<String>) -> Self {
    MoonportError::Configuration {
      context: context.into(),
      message: message.into(),
    }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    MoonportError::Io {
      path: path.into(),
      source,
    }
  }

  pub fn decode(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
    MoonportError::Decode {
      path: path.into(),
      source,
    }
  }

  pub fn backend(provider: impl Into<String>, pipeline: impl Into<String>, source: AnyhowError) -> Self {
    MoonportError::Backend {
      provider: provider.into(),
      pipeline: pipeline.into(),
      source,
    }
  }

  /// Wraps `self` with the name of the operation it surfaced from.
  pub fn context(self, context: impl Into<String>) -> Self {
    MoonportError::Context {
      context: context.into(),
      source: Box::new(self),
    }
  }

  /// The innermost error, looking through any `Context` layers.
  pub fn root(&self) -> &MoonportError {
    match self {
      MoonportError::Context { source, .. } => source.root(),
      other => other,
    }
  }

  pub fn is_configuration(&self) -> bool {
    matches!(self.root(), MoonportError::Configuration { .. })
  }

  /// True for both unreadable paths and malformed documents.
  pub fn is_io(&self) -> bool {
    matches!(self.root(), MoonportError::Io { .. } | MoonportError::Decode { .. })
  }

  pub fn is_resolution(&self) -> bool {
    matches!(self.root(), MoonportError::UnresolvedStep { .. })
  }

  pub fn is_backend(&self) -> bool {
    matches!(self.root(), MoonportError::Backend { .. } | MoonportError::Timeout { .. })
  }
}

// Foreign errors that reach us without provider context still count as backend failures.
impl From<AnyhowError> for MoonportError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<MoonportError>() {
      Ok(inner) => inner,
      Err(err) => MoonportError::Backend {
        provider: "unknown".to_string(),
        pipeline: String::new(),
        source: err,
      },
    }
  }
}

/// Attaches operation context to a `MoonportResult`, in the spirit of `anyhow::Context`.
pub trait ResultExt<T> {
  fn context(self, context: &str) -> MoonportResult<T>;
}

impl<T> ResultExt<T> for MoonportResult<T> {
  fn context(self, context: &str) -> MoonportResult<T> {
    self.map_err(|e| e.context(context))
  }
}

pub type MoonportResult<T, E = MoonportError> = std::result::Result<T, E>;
