//! Cluster lookup trait

use async_trait::async_trait;

use crate::error::LocatorError;
use crate::types::{NodeLocation, NodeStatus};

/// Read-only lookups against the cluster and compute APIs.
///
/// All calls are idempotent and side-effect free. Implementations must not
/// retry internally; the session decides what a failure means.
#[async_trait]
pub trait ClusterLocator: Send + Sync {
    /// Master node hostname and zone of a cluster
    async fn resolve_by_cluster(
        &self,
        project: &str,
        region: &str,
        cluster: &str,
    ) -> Result<NodeLocation, LocatorError>;

    /// Name of the cluster a job was placed on
    async fn resolve_by_job(
        &self,
        project: &str,
        region: &str,
        job_id: &str,
    ) -> Result<String, LocatorError>;

    /// Run status of a node
    async fn node_status(
        &self,
        project: &str,
        zone: &str,
        node: &str,
    ) -> Result<NodeStatus, LocatorError>;
}
