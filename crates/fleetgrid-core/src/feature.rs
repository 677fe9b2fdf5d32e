//! Cross-cluster feature contract.
//!
//! A feature is an optional, named behavior toggled per group (federation,
//! service mesh, ...). The engine persists the desired state; a registered
//! [`FeatureHandler`] is driven to match it whenever membership or
//! configuration changes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::group::GroupView;

/// Desired state of one feature on one group, as handed to a handler.
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    pub name: String,
    pub enabled: bool,
    /// Opaque, feature-specific configuration document.
    pub properties: Value,
    /// The group the feature applies to, with resolved member handles.
    #[serde(skip_serializing)]
    pub group: GroupView,
}

/// Capability set every cross-cluster feature implements.
///
/// Handlers are registered once at startup under a feature name; new
/// behaviors plug in without touching the coordinators. Handler errors are
/// opaque to the engine, hence `anyhow`.
#[async_trait]
pub trait FeatureHandler: Send + Sync {
    /// Drive the feature's cross-cluster side effects to match `feature`.
    ///
    /// Called after membership changes and after enable/disable flips;
    /// `feature.enabled == false` means tear down.
    async fn reconcile_state(&self, feature: &Feature) -> anyhow::Result<()>;

    /// Per-member status of the feature, keyed by cluster name.
    async fn members_status(&self, feature: &Feature) -> anyhow::Result<HashMap<String, String>>;
}
