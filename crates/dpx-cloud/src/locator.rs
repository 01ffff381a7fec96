//! REST-backed cluster locator
//!
//! Talks to the Dataproc v1 API for clusters and jobs and to the Compute
//! Engine v1 API for instance status. Every call is a single GET; failures
//! are reported as-is without retrying.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use dpx_core::config::ApiConfig;
use dpx_core::traits::ClusterLocator;
use dpx_core::{LocatorError, NodeLocation, NodeStatus};

use crate::auth::AccessToken;

/// Cluster locator over the Google Cloud REST APIs
pub struct RestLocator {
    client: reqwest::Client,
    dataproc_endpoint: String,
    compute_endpoint: String,
    token: AccessToken,
}

impl RestLocator {
    /// Create a locator for the configured endpoints
    pub fn new(api: &ApiConfig, token: AccessToken) -> Result<Self, LocatorError> {
        let client = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .build()
            .map_err(|e| LocatorError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            dataproc_endpoint: api.dataproc_endpoint.trim_end_matches('/').to_string(),
            compute_endpoint: api.compute_endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        kind: &'static str,
        name: &str,
    ) -> Result<T, LocatorError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(|e| LocatorError::Transport(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LocatorError::NotFound {
                kind,
                name: name.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LocatorError::Transport(format!(
                "{}, {}",
                status,
                api_error_message(&body)
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LocatorError::Transport(format!("invalid response from {}: {}", url, e)))
    }
}

#[async_trait]
impl ClusterLocator for RestLocator {
    async fn resolve_by_cluster(
        &self,
        project: &str,
        region: &str,
        cluster: &str,
    ) -> Result<NodeLocation, LocatorError> {
        let url = format!(
            "{}/v1/projects/{}/regions/{}/clusters/{}",
            self.dataproc_endpoint, project, region, cluster
        );
        let resource: ClusterResource = self.get_json(&url, "cluster", cluster).await?;
        resource.master_location()
    }

    async fn resolve_by_job(
        &self,
        project: &str,
        region: &str,
        job_id: &str,
    ) -> Result<String, LocatorError> {
        let url = format!(
            "{}/v1/projects/{}/regions/{}/jobs/{}",
            self.dataproc_endpoint, project, region, job_id
        );
        let resource: JobResource = self.get_json(&url, "job", job_id).await?;
        resource
            .placement
            .and_then(|p| p.cluster_name)
            .filter(|name| !name.is_empty())
            .ok_or(LocatorError::MissingField("placement.clusterName"))
    }

    async fn node_status(
        &self,
        project: &str,
        zone: &str,
        node: &str,
    ) -> Result<NodeStatus, LocatorError> {
        let url = format!(
            "{}/compute/v1/projects/{}/zones/{}/instances/{}",
            self.compute_endpoint, project, zone, node
        );
        let resource: InstanceResource = self.get_json(&url, "instance", node).await?;
        resource
            .status
            .map(NodeStatus)
            .ok_or(LocatorError::MissingField("status"))
    }
}

/// Extract `error.message` from a Google API error body, if present
fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ApiError,
    }
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "no error details".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterResource {
    config: Option<ClusterConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterConfig {
    master_config: Option<InstanceGroupConfig>,
    gce_cluster_config: Option<GceClusterConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceGroupConfig {
    #[serde(default)]
    instance_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceClusterConfig {
    zone_uri: Option<String>,
}

impl ClusterResource {
    fn master_location(self) -> Result<NodeLocation, LocatorError> {
        let config = self.config.ok_or(LocatorError::MissingField("config"))?;

        let hostname = config
            .master_config
            .and_then(|m| m.instance_names.into_iter().next())
            .ok_or(LocatorError::MissingField("config.masterConfig.instanceNames"))?;

        // zoneUri may be a full resource URL or a bare zone name
        let zone = config
            .gce_cluster_config
            .and_then(|g| g.zone_uri)
            .and_then(|uri| uri.rsplit('/').next().map(str::to_string))
            .filter(|zone| !zone.is_empty())
            .ok_or(LocatorError::MissingField("config.gceClusterConfig.zoneUri"))?;

        Ok(NodeLocation { hostname, zone })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    placement: Option<JobPlacement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobPlacement {
    cluster_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceResource {
    status: Option<String>,
}
