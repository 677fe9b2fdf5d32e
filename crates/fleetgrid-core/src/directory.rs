//! Static, inventory-backed cluster directory.
//!
//! Stands in for a full cluster-management platform: clusters are declared
//! up front (daemon inventory file, or test setup) and resolved from memory.
//! Real integrations implement [`ClusterDirectory`] against their own
//! backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cluster::{
    Cluster, ClusterDirectory, ClusterError, ClusterId, ClusterResult, ClusterStatus, OrgId,
};

/// A cluster with fixed identity and state.
#[derive(Debug, Clone)]
pub struct StaticCluster {
    id: ClusterId,
    organization_id: OrgId,
    name: String,
    ready: bool,
    status: String,
    kube_config: Vec<u8>,
}

impl StaticCluster {
    pub fn new(id: ClusterId, organization_id: OrgId, name: &str) -> Self {
        Self {
            id,
            organization_id,
            name: name.to_string(),
            ready: true,
            status: "RUNNING".to_string(),
            kube_config: Vec::new(),
        }
    }

    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_kube_config(mut self, kube_config: Vec<u8>) -> Self {
        self.kube_config = kube_config;
        self
    }

    pub fn organization_id(&self) -> OrgId {
        self.organization_id
    }
}

#[async_trait]
impl Cluster for StaticCluster {
    fn id(&self) -> ClusterId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_ready(&self) -> ClusterResult<bool> {
        Ok(self.ready)
    }

    async fn kube_config(&self) -> ClusterResult<Vec<u8>> {
        Ok(self.kube_config.clone())
    }

    async fn status(&self) -> ClusterResult<ClusterStatus> {
        Ok(ClusterStatus {
            status: self.status.clone(),
        })
    }
}

/// Directory over a fixed set of [`StaticCluster`]s.
#[derive(Default)]
pub struct StaticDirectory {
    by_id: HashMap<ClusterId, Arc<StaticCluster>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cluster to the directory. Last registration for an id wins.
    pub fn register(&mut self, cluster: StaticCluster) {
        self.by_id.insert(cluster.id, Arc::new(cluster));
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[async_trait]
impl ClusterDirectory for StaticDirectory {
    async fn get_by_id_only(&self, cluster_id: ClusterId) -> ClusterResult<Arc<dyn Cluster>> {
        self.by_id
            .get(&cluster_id)
            .map(|c| c.clone() as Arc<dyn Cluster>)
            .ok_or_else(|| ClusterError::NotFound(format!("cluster id {cluster_id}")))
    }

    async fn get_by_name(
        &self,
        organization_id: OrgId,
        name: &str,
    ) -> ClusterResult<Arc<dyn Cluster>> {
        self.by_id
            .values()
            .find(|c| c.organization_id == organization_id && c.name == name)
            .map(|c| c.clone() as Arc<dyn Cluster>)
            .ok_or_else(|| ClusterError::NotFound(format!("cluster {name} in org {organization_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_directory() -> StaticDirectory {
        let mut dir = StaticDirectory::new();
        dir.register(StaticCluster::new(1, 10, "alpha"));
        dir.register(StaticCluster::new(2, 10, "beta").with_ready(false));
        dir.register(StaticCluster::new(3, 20, "alpha"));
        dir
    }

    #[tokio::test]
    async fn resolves_by_id() {
        let dir = test_directory();
        let cluster = dir.get_by_id_only(1).await.unwrap();
        assert_eq!(cluster.name(), "alpha");
        assert_eq!(cluster.id(), 1);
    }

    #[tokio::test]
    async fn resolves_by_name_scoped_to_org() {
        let dir = test_directory();
        let cluster = dir.get_by_name(20, "alpha").await.unwrap();
        assert_eq!(cluster.id(), 3);
    }

    #[tokio::test]
    async fn unknown_cluster_is_not_found() {
        let dir = test_directory();
        let err = dir.get_by_id_only(99).await.unwrap_err();
        assert!(matches!(err, ClusterError::NotFound(_)));

        let err = dir.get_by_name(10, "gamma").await.unwrap_err();
        assert!(matches!(err, ClusterError::NotFound(_)));
    }

    #[tokio::test]
    async fn readiness_and_status_reflect_registration() {
        let dir = test_directory();
        let beta = dir.get_by_id_only(2).await.unwrap();
        assert!(!beta.is_ready().await.unwrap());

        let alpha = dir.get_by_id_only(1).await.unwrap();
        assert_eq!(alpha.status().await.unwrap().status, "RUNNING");
    }
}
