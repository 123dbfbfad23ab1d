//! Stateless HTTP facade over the backend's REST endpoints.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateProjectRequest, CreateProjectResponse, HouseObject, Project, Tool};

/// Answer to `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// HTTP client for the DIY backend.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    base: reqwest::Url,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let base = reqwest::Url::parse(&base_url)
            .map_err(|e| ApiError::Config(format!("invalid API base URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Config(format!("API base URL cannot take a path: {}", base_url)));
        }

        Ok(Self {
            base_url,
            base,
            client: builder.build()?,
        })
    }

    /// Base address requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded as one segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<reqwest::Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("API base URL cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create a project from a free-text description.
    ///
    /// Blank descriptions are rejected before any request is made.
    pub async fn create_project(&self, description: &str) -> ApiResult<CreateProjectResponse> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ApiError::EmptyDescription);
        }

        let request = CreateProjectRequest {
            description: description.to_string(),
        };
        debug!("Creating project ({} chars)", description.len());

        let response = self
            .client
            .post(self.endpoint(&["api", "projects"])?)
            .json(&request)
            .send()
            .await?;

        decode(response, "create project").await
    }

    /// List every project.
    pub async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.get_json(&["api", "projects"], "fetch projects").await
    }

    /// List every tool in the toolroom.
    pub async fn list_tools(&self) -> ApiResult<Vec<Tool>> {
        self.get_json(&["api", "tools"], "fetch tools").await
    }

    /// List every house object.
    pub async fn list_house_objects(&self) -> ApiResult<Vec<HouseObject>> {
        self.get_json(&["api", "house-objects"], "fetch house objects").await
    }

    /// Look a project up by id.
    pub async fn find_project(&self, project_id: &str) -> ApiResult<Project> {
        self.list_projects()
            .await?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| ApiError::ProjectNotFound(project_id.to_string()))
    }

    /// Ask the backend to generate execution steps for a project.
    ///
    /// The result shape is backend-defined; an empty body yields `Null`.
    /// The id is sent as a single escaped path segment.
    pub async fn generate_steps(&self, project_id: &str) -> ApiResult<serde_json::Value> {
        let url = self.endpoint(&["api", "projects", project_id, "generate-steps"])?;
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let operation = "generate steps";
        let body = check(response, operation).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }

    /// Backend liveness check.
    pub async fn health(&self) -> ApiResult<HealthStatus> {
        self.get_json(&["health"], "check health").await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], operation: &str) -> ApiResult<T> {
        let response = self.client.get(self.endpoint(segments)?).send().await?;
        decode(response, operation).await
    }
}

/// Turn a non-2xx response into [`ApiError::Status`].
async fn check(response: reqwest::Response, operation: &str) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_text = status.canonical_reason().unwrap_or("Unknown Status").to_string();
    error!("Failed to {}: {} {}", operation, status.as_u16(), status_text);
    Err(ApiError::Status {
        operation: operation.to_string(),
        status: status.as_u16(),
        status_text,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, operation: &str) -> ApiResult<T> {
    let body = check(response, operation).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}
