//! Feature reconciler — keeps handlers in sync with persisted state.
//!
//! The reconciler owns the persisted `(group, feature)` records and the
//! handler registry. Reconciliation is isolated per feature: one handler
//! failing must not prevent the remaining features from reconciling, so
//! handler errors are logged and swallowed here. The one exception is
//! [`FeatureReconciler::disable_features`], the group-delete path, where
//! failures are collected and surfaced so the deletion can abort.

use std::collections::HashMap;
use std::sync::Arc;

use fleetgrid_core::{Feature, GroupView};
use fleetgrid_state::{FeatureRecord, StateStore};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FeatureError, FeatureResult};
use crate::registry::HandlerRegistry;

/// Persists feature state and drives registered handlers.
pub struct FeatureReconciler {
    store: StateStore,
    registry: Arc<HandlerRegistry>,
}

impl FeatureReconciler {
    pub fn new(store: StateStore, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    /// Upsert the persisted state of a feature.
    ///
    /// Does not invoke any handler — callers reconcile explicitly, so a
    /// property change can be batched with a later reconcile.
    pub fn set_feature_params(
        &self,
        group: &GroupView,
        feature_name: &str,
        enabled: bool,
        properties: Value,
    ) -> FeatureResult<()> {
        let record = FeatureRecord {
            group_id: group.id.clone(),
            name: feature_name.to_string(),
            enabled,
            properties,
        };
        self.store.put_feature(&record)?;
        debug!(group = %group.name, feature = %feature_name, enabled, "feature params set");
        Ok(())
    }

    /// Get one feature's persisted state.
    pub fn get_feature(&self, group: &GroupView, feature_name: &str) -> FeatureResult<Feature> {
        match self.store.get_feature(&group.id, feature_name)? {
            Some(record) => Ok(self.to_feature(group, record)),
            None => Err(FeatureError::NotFound {
                group_id: group.id.clone(),
                feature: feature_name.to_string(),
            }),
        }
    }

    /// All persisted features of a group, keyed by name.
    pub fn get_features(&self, group: &GroupView) -> FeatureResult<HashMap<String, Feature>> {
        let records = self.store.list_features_for_group(&group.id)?;
        Ok(records
            .into_iter()
            .map(|r| (r.name.clone(), self.to_feature(group, r)))
            .collect())
    }

    /// The enabled subset of a group's features, keyed by name.
    pub fn get_enabled_features(
        &self,
        group: &GroupView,
    ) -> FeatureResult<HashMap<String, Feature>> {
        let mut features = self.get_features(group)?;
        features.retain(|_, f| f.enabled);
        Ok(features)
    }

    /// Reconcile a group's features after a membership or config change.
    ///
    /// With `only_enabled`, disabled features are skipped. A feature with
    /// no registered handler is skipped silently — unknown feature names
    /// must not block membership operations. Handler errors are logged per
    /// feature and not propagated, so the remaining features still
    /// reconcile.
    pub async fn reconcile_features(
        &self,
        group: &GroupView,
        only_enabled: bool,
    ) -> FeatureResult<()> {
        debug!(group = %group.name, only_enabled, "reconciling features");

        let features = self.get_features(group)?;
        for (name, feature) in features {
            if !feature.enabled && only_enabled {
                continue;
            }
            let Some(handler) = self.registry.get(&name) else {
                debug!(feature = %name, "no handler registered for feature");
                continue;
            };
            if let Err(e) = handler.reconcile_state(&feature).await {
                warn!(group = %group.name, feature = %name, error = %e, "feature reconcile failed");
            }
        }

        Ok(())
    }

    /// Tear down every enabled feature ahead of group deletion.
    ///
    /// Flips `enabled` to false in-memory only (the records are about to be
    /// cascade-deleted) and invokes each handler. All handlers are
    /// attempted; any failure aborts the deletion via
    /// [`FeatureError::DisableFailed`].
    pub async fn disable_features(&self, group: &GroupView) -> FeatureResult<()> {
        debug!(group = %group.name, "disabling features");

        let features = self.get_enabled_features(group)?;
        let mut failed = Vec::new();
        for (name, mut feature) in features {
            let Some(handler) = self.registry.get(&name) else {
                debug!(feature = %name, "no handler registered for feature");
                continue;
            };
            feature.enabled = false;
            if let Err(e) = handler.reconcile_state(&feature).await {
                warn!(group = %group.name, feature = %name, error = %e, "feature disable failed");
                failed.push(name);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            failed.sort();
            Err(FeatureError::DisableFailed {
                group_id: group.id.clone(),
                features: failed,
            })
        }
    }

    /// Per-member status of a feature, from its handler.
    ///
    /// `None` (not an error) when the feature has no registered handler —
    /// status is optional, absence is not failure.
    pub async fn get_feature_status(
        &self,
        feature: &Feature,
    ) -> FeatureResult<Option<HashMap<String, String>>> {
        match self.registry.get(&feature.name) {
            Some(handler) => Ok(Some(handler.members_status(feature).await?)),
            None => Ok(None),
        }
    }

    fn to_feature(&self, group: &GroupView, record: FeatureRecord) -> Feature {
        Feature {
            name: record.name,
            enabled: record.enabled,
            properties: record.properties,
            group: group.clone(),
        }
    }
}
