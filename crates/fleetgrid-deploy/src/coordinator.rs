//! Deployment coordinator — persist once, install everywhere.
//!
//! `create_deployment` is fail-fast only up to chart resolution; once the
//! record is persisted, per-member install failures are data in the
//! returned statuses, never call-level errors. Live status is always
//! re-derived by querying member clusters — it is never cached on the
//! record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fleetgrid_core::{Cluster, GroupView};
use fleetgrid_dispatch::fan_out;
use fleetgrid_state::{DeploymentRecord, StateStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::chart::{ChartEngine, ChartInstall};
use crate::error::{DeployError, DeployResult};
use crate::values::merge_values;

/// A request to deploy one release onto every member of a group.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentRequest {
    pub chart_name: String,
    #[serde(default)]
    pub chart_version: String,
    #[serde(default)]
    pub package: Vec<u8>,
    pub release_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub reuse_values: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub timeout_secs: i64,
    #[serde(default)]
    pub values: Value,
    /// Per-cluster value overrides, keyed by cluster name.
    #[serde(default)]
    pub value_overrides: HashMap<String, Value>,
}

/// Outcome of one operation on one member cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub cluster_id: u64,
    pub cluster_name: String,
    pub status: String,
}

/// Full detail of a stored deployment plus live per-member status.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentDetails {
    pub release_name: String,
    pub chart_name: String,
    pub chart_version: String,
    pub namespace: String,
    pub values: Value,
    pub value_overrides: HashMap<u64, Value>,
    pub created_at: u64,
    pub updated_at: u64,
    pub target_clusters: Vec<TargetStatus>,
}

/// Summary row for deployment listings; no live status.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentSummary {
    pub release_name: String,
    pub chart_name: String,
    pub chart_version: String,
    pub namespace: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Coordinates chart installs across a group's members.
pub struct DeploymentCoordinator {
    store: StateStore,
    chart: Arc<dyn ChartEngine>,
}

impl DeploymentCoordinator {
    pub fn new(store: StateStore, chart: Arc<dyn ChartEngine>) -> Self {
        Self { store, chart }
    }

    /// Create a deployment and install it on every member cluster.
    ///
    /// The chart is resolved before anything is persisted or any cluster
    /// touched. Returns one status per member, `"SUCCEEDED"` or
    /// `"FAILED: <reason>"`; the record persists regardless of per-member
    /// outcomes.
    pub async fn create_deployment(
        &self,
        group: &GroupView,
        organization_name: &str,
        request: &DeploymentRequest,
    ) -> DeployResult<Vec<TargetStatus>> {
        if request.release_name.is_empty() {
            return Err(DeployError::InvalidRequest("release name is required".into()));
        }
        if request.chart_name.is_empty() {
            return Err(DeployError::InvalidRequest("chart name is required".into()));
        }

        self.chart
            .resolve(
                &request.release_name,
                &request.chart_name,
                &request.chart_version,
                &request.package,
                organization_name,
            )
            .await
            .map_err(|e| DeployError::ChartResolution(e.to_string()))?;

        let record = self.record_from_request(group, organization_name, request);
        self.store.put_deployment(&record)?;
        info!(
            group = %group.name,
            release = %request.release_name,
            chart = %request.chart_name,
            "deployment record stored, installing on members"
        );

        let install = ChartInstall {
            chart_name: request.chart_name.clone(),
            chart_version: request.chart_version.clone(),
            package: request.package.clone(),
            namespace: request.namespace.clone(),
            release_name: request.release_name.clone(),
            dry_run: request.dry_run,
            kube_config: Vec::new(),
            organization_name: organization_name.to_string(),
            wait: request.wait,
            timeout_secs: request.timeout_secs,
            values: request.values.clone(),
        };
        let overrides = request.value_overrides.clone();
        let chart = self.chart.clone();

        let results = fan_out(&group.member_clusters, move |cluster| {
            let chart = chart.clone();
            let mut install = install.clone();
            let overrides = overrides.clone();
            async move {
                if let Some(cluster_overrides) = overrides.get(cluster.name()) {
                    install.values = merge_values(&install.values, cluster_overrides);
                }
                match install_on_cluster(chart, cluster, install).await {
                    Ok(()) => "SUCCEEDED".to_string(),
                    Err(e) => format!("FAILED: {e}"),
                }
            }
        })
        .await;

        Ok(results
            .into_iter()
            .map(|r| {
                if r.outcome != "SUCCEEDED" {
                    warn!(cluster = %r.cluster_name, status = %r.outcome, "member install failed");
                }
                TargetStatus {
                    cluster_id: r.cluster_id,
                    cluster_name: r.cluster_name,
                    status: r.outcome,
                }
            })
            .collect())
    }

    /// Load a stored deployment and query each member for its live status.
    pub async fn get_deployment(
        &self,
        group: &GroupView,
        release_name: &str,
    ) -> DeployResult<DeploymentDetails> {
        let record = self
            .store
            .get_deployment(&group.id, release_name)?
            .ok_or_else(|| DeployError::DeploymentNotFound {
                group_id: group.id.clone(),
                release_name: release_name.to_string(),
            })?;

        let chart = self.chart.clone();
        let release = release_name.to_string();
        let results = fan_out(&group.member_clusters, move |cluster| {
            let chart = chart.clone();
            let release = release.clone();
            async move {
                match release_status_on_cluster(chart, cluster, &release).await {
                    Ok(status) => status,
                    Err(e) => format!("Failed to get status: {e}"),
                }
            }
        })
        .await;

        Ok(DeploymentDetails {
            release_name: record.release_name,
            chart_name: record.chart_name,
            chart_version: record.chart_version,
            namespace: record.namespace,
            values: record.values,
            value_overrides: record.value_overrides,
            created_at: record.created_at,
            updated_at: record.updated_at,
            target_clusters: results
                .into_iter()
                .map(|r| TargetStatus {
                    cluster_id: r.cluster_id,
                    cluster_name: r.cluster_name,
                    status: r.outcome,
                })
                .collect(),
        })
    }

    /// All stored deployments of a group. Repository read only — no
    /// per-member status is derived here.
    pub fn list_deployments(&self, group: &GroupView) -> DeployResult<Vec<DeploymentSummary>> {
        let records = self.store.list_deployments_for_group(&group.id)?;
        Ok(records
            .into_iter()
            .map(|r| DeploymentSummary {
                release_name: r.release_name,
                chart_name: r.chart_name,
                chart_version: r.chart_version,
                namespace: r.namespace,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect())
    }

    /// Upgrading a stored deployment is not implemented; rejected rather
    /// than silently accepted.
    pub async fn upgrade_deployment(
        &self,
        _group: &GroupView,
        _release_name: &str,
        _request: &DeploymentRequest,
    ) -> DeployResult<Vec<TargetStatus>> {
        Err(DeployError::NotSupported("upgrade"))
    }

    /// Deleting a stored deployment is not implemented; rejected rather
    /// than silently accepted.
    pub async fn delete_deployment(
        &self,
        _group: &GroupView,
        _release_name: &str,
    ) -> DeployResult<Vec<TargetStatus>> {
        Err(DeployError::NotSupported("delete"))
    }

    fn record_from_request(
        &self,
        group: &GroupView,
        organization_name: &str,
        request: &DeploymentRequest,
    ) -> DeploymentRecord {
        // Overrides are keyed by cluster name in the request but by
        // cluster id in the record, so a later rename cannot orphan them.
        let value_overrides = group
            .members
            .iter()
            .filter_map(|m| {
                request
                    .value_overrides
                    .get(&m.name)
                    .map(|v| (m.id, v.clone()))
            })
            .collect();

        let now = epoch_secs();
        DeploymentRecord {
            group_id: group.id.clone(),
            release_name: request.release_name.clone(),
            chart_name: request.chart_name.clone(),
            chart_version: request.chart_version.clone(),
            package: request.package.clone(),
            namespace: request.namespace.clone(),
            organization_name: organization_name.to_string(),
            reuse_values: request.reuse_values,
            wait: request.wait,
            timeout_secs: request.timeout_secs,
            values: request.values.clone(),
            value_overrides,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Install one release on one cluster.
async fn install_on_cluster(
    chart: Arc<dyn ChartEngine>,
    cluster: Arc<dyn Cluster>,
    mut install: ChartInstall,
) -> anyhow::Result<()> {
    info!(cluster = %cluster.name(), release = %install.release_name, "installing deployment");
    install.kube_config = cluster
        .kube_config()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let release = chart.install(&install).await?;
    info!(
        cluster = %cluster.name(),
        release = %release.name,
        status = %release.status,
        "deployment installed"
    );
    Ok(())
}

/// Query one cluster for the status of one release.
///
/// `"unknown"` when the release is not present on the cluster.
async fn release_status_on_cluster(
    chart: Arc<dyn ChartEngine>,
    cluster: Arc<dyn Cluster>,
    release_name: &str,
) -> anyhow::Result<String> {
    let kube_config = cluster
        .kube_config()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let releases = chart.list_releases(release_name, &kube_config).await?;
    Ok(releases
        .into_iter()
        .find(|r| r.name == release_name)
        .map(|r| r.status)
        .unwrap_or_else(|| "unknown".to_string()))
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
