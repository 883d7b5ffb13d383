// moonport/src/backend/cloudbuild.rs

//! Google Cloud Build driver.
//!
//! Submits builds through the REST API
//! (`POST {endpoint}/v1/projects/{project}/builds`) and returns as soon as the
//! long-running operation is created. The build id is read from the
//! operation metadata; the operation itself is never polled.

use crate::backend::driver::{prepare_request, BuildBackendDriver, BuildRequest};
use crate::config::BackendConfig;
use crate::core::JobData;
use crate::error::{MoonportError, MoonportResult};
use crate::pipeline::Pipeline;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

pub const CLOUD_BUILD_MONIKER: &str = "gcb";

/// Body of a `projects.builds.create` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudBuildRequest {
  pub steps: Vec<CloudBuildStep>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub service_account: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudBuildStep {
  /// Container image the step runs in.
  pub name: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub args: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub env: Vec<String>,
}

impl CloudBuildRequest {
  pub fn from_request(request: &BuildRequest, project_id: &str) -> Self {
    let steps = request
      .steps
      .iter()
      .map(|step| CloudBuildStep {
        name: step.image.clone(),
        args: step.args.clone(),
        env: step.env.clone(),
      })
      .collect();

    let service_account = match request.service_account.as_str() {
      "" => None,
      sa if sa.starts_with("projects/") => Some(sa.to_string()),
      sa => Some(format!("projects/{}/serviceAccounts/{}", project_id, sa)),
    };

    let tags = sanitize_tag(&request.pipeline_name).into_iter().collect();

    Self {
      steps,
      service_account,
      tags,
    }
  }
}

/// Cloud Build tags must match `[\w][\w.-]{0,127}`.
fn sanitize_tag(name: &str) -> Option<String> {
  let tag: String = name
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' { c } else { '_' })
    .skip_while(|c| *c == '.' || *c == '-')
    .take(128)
    .collect();
  (!tag.is_empty()).then_some(tag)
}

#[derive(Debug, Deserialize)]
struct Operation {
  #[serde(default)]
  name: String,
  #[serde(default)]
  metadata: Option<OperationMetadata>,
}

#[derive(Debug, Deserialize)]
struct OperationMetadata {
  #[serde(default)]
  build: Option<BuildInfo>,
}

#[derive(Debug, Deserialize)]
struct BuildInfo {
  #[serde(default)]
  id: Option<String>,
}

pub struct CloudBuildDriver {
  client: Client,
  endpoint: String,
  project_id: String,
  access_token: String,
}

impl CloudBuildDriver {
  /// Builds the driver and its HTTP client. Makes no network call.
  pub fn new(config: &BackendConfig) -> MoonportResult<Self> {
    let project_id = config
      .project_id
      .clone()
      .ok_or_else(|| MoonportError::configuration("CloudBuildDriver::new", "no project id configured"))?;
    let access_token = config
      .access_token
      .clone()
      .ok_or_else(|| MoonportError::configuration("CloudBuildDriver::new", "no access token configured"))?;
    let client = Client::builder().build().map_err(|e| {
      MoonportError::configuration("CloudBuildDriver::new", format!("getting new Cloud Build client: {}", e))
    })?;

    Ok(Self {
      client,
      endpoint: config.endpoint.trim_end_matches('/').to_string(),
      project_id,
      access_token,
    })
  }

  pub fn project_id(&self) -> &str {
    &self.project_id
  }

  fn builds_url(&self) -> String {
    format!("{}/v1/projects/{}/builds", self.endpoint, self.project_id)
  }

  async fn submit(&self, body: &CloudBuildRequest) -> anyhow::Result<String> {
    let response = self
      .client
      .post(self.builds_url())
      .bearer_auth(&self.access_token)
      .json(body)
      .send()
      .await
      .context("creating Cloud Build operation")?;

    let status = response.status();
    if !status.is_success() {
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
      return Err(anyhow!("API error (status {}): {}", status.as_u16(), error_text));
    }

    let operation: Operation = response.json().await.context("decoding Cloud Build operation")?;
    operation
      .metadata
      .and_then(|md| md.build)
      .and_then(|build| build.id)
      .filter(|id| !id.is_empty())
      .ok_or_else(|| anyhow!("operation '{}' carries no build id", operation.name))
  }
}

#[async_trait]
impl BuildBackendDriver for CloudBuildDriver {
  fn moniker(&self) -> &str {
    CLOUD_BUILD_MONIKER
  }

  #[instrument(
        name = "CloudBuildDriver::create_pipeline",
        skip_all,
        fields(project = %self.project_id, pipeline = %pipeline.name()),
        err(Display)
    )]
  async fn create_pipeline(&self, pipeline: &mut Pipeline) -> MoonportResult<JobData> {
    let request = prepare_request(pipeline).await?;

    event!(Level::INFO, steps = request.steps.len(), "Building Cloud Build request");
    let body = CloudBuildRequest::from_request(&request, &self.project_id);

    let build_id = self
      .submit(&body)
      .await
      .map_err(|e| MoonportError::backend(CLOUD_BUILD_MONIKER, pipeline.name(), e))?;

    event!(Level::INFO, build_id = %build_id, "Successfully launched build {}", build_id);
    Ok(JobData::new(build_id, CLOUD_BUILD_MONIKER))
  }
}
