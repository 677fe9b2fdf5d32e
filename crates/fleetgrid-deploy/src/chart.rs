//! Chart engine contract.
//!
//! The engine that resolves and installs versioned packages on a single
//! cluster is an external collaborator; the coordinator only needs these
//! three calls. Errors are opaque (`anyhow`) — the coordinator turns them
//! into per-member status strings or a fail-fast resolution error.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Everything the engine needs to install one release on one cluster.
#[derive(Debug, Clone)]
pub struct ChartInstall {
    pub chart_name: String,
    pub chart_version: String,
    /// Raw package bytes when the chart is supplied inline; empty means
    /// the engine resolves the chart from its repositories.
    pub package: Vec<u8>,
    pub namespace: String,
    pub release_name: String,
    pub dry_run: bool,
    pub kube_config: Vec<u8>,
    pub organization_name: String,
    pub wait: bool,
    pub timeout_secs: i64,
    /// Effective values for this cluster (base merged with overrides).
    pub values: Value,
}

/// An installed release as reported by a member cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub name: String,
    pub status: String,
}

/// External package-deployment engine, one call per cluster.
#[async_trait]
pub trait ChartEngine: Send + Sync {
    /// Validate that the requested chart resolves, before any cluster is
    /// touched or anything is persisted.
    async fn resolve(
        &self,
        release_name: &str,
        chart_name: &str,
        chart_version: &str,
        package: &[u8],
        organization_name: &str,
    ) -> anyhow::Result<()>;

    /// Install (or upgrade) one release on the cluster behind `kube_config`.
    async fn install(&self, install: &ChartInstall) -> anyhow::Result<Release>;

    /// Releases matching a name filter on the cluster behind `kube_config`.
    async fn list_releases(
        &self,
        name_filter: &str,
        kube_config: &[u8],
    ) -> anyhow::Result<Vec<Release>>;
}

/// Chart engine that accepts every request without installing anything.
///
/// Lets the daemon run end to end before a real packaging backend is wired
/// in; also convenient in tests.
#[derive(Debug, Default)]
pub struct DryRunChartEngine;

impl DryRunChartEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChartEngine for DryRunChartEngine {
    async fn resolve(
        &self,
        _release_name: &str,
        chart_name: &str,
        chart_version: &str,
        _package: &[u8],
        _organization_name: &str,
    ) -> anyhow::Result<()> {
        info!(chart = %chart_name, version = %chart_version, "dry-run chart resolve");
        Ok(())
    }

    async fn install(&self, install: &ChartInstall) -> anyhow::Result<Release> {
        info!(
            release = %install.release_name,
            chart = %install.chart_name,
            namespace = %install.namespace,
            "dry-run chart install"
        );
        Ok(Release {
            name: install.release_name.clone(),
            status: "deployed".to_string(),
        })
    }

    async fn list_releases(
        &self,
        _name_filter: &str,
        _kube_config: &[u8],
    ) -> anyhow::Result<Vec<Release>> {
        Ok(Vec::new())
    }
}
