//! Cluster handles and the directory that resolves them.
//!
//! A cluster group never owns cluster lifecycle — members are weak
//! references resolved lazily through a [`ClusterDirectory`]. Every call on
//! a [`Cluster`] handle may hit the network (readiness probe, kubeconfig
//! retrieval, status query) and is therefore async.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier of a cluster, assigned by the platform that owns it.
pub type ClusterId = u64;

/// Identifier of the organization a cluster or group belongs to.
pub type OrgId = u64;

/// Live status reported by a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub status: String,
}

/// Errors from cluster resolution or cluster calls.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster not found: {0}")]
    NotFound(String),

    #[error("cluster call failed: {0}")]
    Upstream(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Handle to a single externally managed cluster.
#[async_trait]
pub trait Cluster: Send + Sync + std::fmt::Debug {
    fn id(&self) -> ClusterId;

    fn name(&self) -> &str;

    /// Whether the cluster currently reports itself ready to take members.
    async fn is_ready(&self) -> ClusterResult<bool>;

    /// Kubeconfig bytes for driving workloads onto the cluster.
    async fn kube_config(&self) -> ClusterResult<Vec<u8>>;

    /// Live status as reported by the cluster itself.
    async fn status(&self) -> ClusterResult<ClusterStatus>;
}

/// Resolves cluster references to live [`Cluster`] handles.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// Resolve a cluster by id alone, regardless of organization.
    async fn get_by_id_only(&self, cluster_id: ClusterId) -> ClusterResult<Arc<dyn Cluster>>;

    /// Resolve a cluster by name within an organization.
    async fn get_by_name(
        &self,
        organization_id: OrgId,
        name: &str,
    ) -> ClusterResult<Arc<dyn Cluster>>;
}
