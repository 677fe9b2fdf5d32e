//! Persisted record types for the FleetGrid state store.
//!
//! These are the durable shapes only — rehydrated views with live cluster
//! handles live in `fleetgrid-core`. All types are serializable to/from
//! JSON for storage in redb tables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for a cluster group.
pub type GroupId = String;

// ── Groups ─────────────────────────────────────────────────────────

/// Durable record of a cluster group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRecord {
    pub id: GroupId,
    /// Stable public identifier, distinct from the storage key.
    pub uid: String,
    pub organization_id: u64,
    /// Unique within the organization.
    pub name: String,
    /// Cluster ids of current members.
    pub member_ids: Vec<u64>,
    /// Unix timestamp (seconds) when this group was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) when this group was last updated.
    pub updated_at: u64,
}

impl GroupRecord {
    pub fn table_key(&self) -> String {
        self.id.clone()
    }
}

// ── Features ───────────────────────────────────────────────────────

/// Persisted state of one feature on one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRecord {
    pub group_id: GroupId,
    pub name: String,
    pub enabled: bool,
    /// Opaque, feature-specific configuration document.
    pub properties: Value,
}

impl FeatureRecord {
    pub fn table_key(&self) -> String {
        feature_key(&self.group_id, &self.name)
    }
}

/// Composite key for a feature record.
pub fn feature_key(group_id: &str, feature_name: &str) -> String {
    format!("{group_id}/{feature_name}")
}

// ── Deployments ────────────────────────────────────────────────────

/// Durable record of a multi-cluster deployment.
///
/// Append-only: live per-cluster status is always re-derived by querying
/// the member clusters, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentRecord {
    pub group_id: GroupId,
    /// Identity of the deployment within the group.
    pub release_name: String,
    pub chart_name: String,
    pub chart_version: String,
    /// Raw package bytes, when the chart was supplied inline.
    pub package: Vec<u8>,
    pub namespace: String,
    pub organization_name: String,
    pub reuse_values: bool,
    pub wait: bool,
    pub timeout_secs: i64,
    /// Base values applied on every member.
    pub values: Value,
    /// Per-cluster value overrides keyed by cluster id.
    pub value_overrides: HashMap<u64, Value>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl DeploymentRecord {
    pub fn table_key(&self) -> String {
        deployment_key(&self.group_id, &self.release_name)
    }
}

/// Composite key for a deployment record.
pub fn deployment_key(group_id: &str, release_name: &str) -> String {
    format!("{group_id}/{release_name}")
}
