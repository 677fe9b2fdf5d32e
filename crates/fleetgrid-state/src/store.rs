//! StateStore — redb-backed persistence for FleetGrid.
//!
//! Provides typed CRUD operations over groups, member claims, feature
//! states, and deployment records. All values are JSON-serialized into
//! redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(GROUPS).map_err(map_err!(Table))?;
        txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        txn.open_table(FEATURES).map_err(map_err!(Table))?;
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Groups ─────────────────────────────────────────────────────

    /// Insert or update a group record, claiming its members.
    ///
    /// The member-claim table is reconciled in the same write transaction:
    /// claims this group no longer holds are released, new members are
    /// claimed. A cluster already claimed by a different group fails the
    /// whole save with [`StateError::MemberConflict`] — nothing is written.
    pub fn put_group(&self, record: &GroupRecord) -> StateResult<()> {
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;

            for &cluster_id in &record.member_ids {
                if let Some(guard) = members.get(cluster_id).map_err(map_err!(Read))? {
                    let owner = guard.value().to_string();
                    if owner != record.id {
                        // Dropping the uncommitted transaction aborts it.
                        return Err(StateError::MemberConflict { cluster_id, owner });
                    }
                }
            }

            // Release claims this group no longer holds.
            let stale: Vec<u64> = members
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| {
                    let (k, v) = entry.ok()?;
                    let cluster_id = k.value();
                    (v.value() == record.id.as_str() && !record.member_ids.contains(&cluster_id))
                        .then_some(cluster_id)
                })
                .collect();
            for cluster_id in stale {
                members.remove(cluster_id).map_err(map_err!(Write))?;
            }

            for &cluster_id in &record.member_ids {
                members
                    .insert(cluster_id, record.id.as_str())
                    .map_err(map_err!(Write))?;
            }

            let mut groups = txn.open_table(GROUPS).map_err(map_err!(Table))?;
            groups
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, members = record.member_ids.len(), "group stored");
        Ok(())
    }

    /// Get a group by id.
    pub fn get_group(&self, group_id: &str) -> StateResult<Option<GroupRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPS).map_err(map_err!(Table))?;
        match table.get(group_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: GroupRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Find a group by organization and name.
    pub fn find_group_by_name(
        &self,
        organization_id: u64,
        name: &str,
    ) -> StateResult<Option<GroupRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPS).map_err(map_err!(Table))?;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: GroupRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if record.organization_id == organization_id && record.name == name {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// List all groups.
    pub fn list_groups(&self) -> StateResult<Vec<GroupRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: GroupRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Delete a group and cascade to its claims, features, and deployments.
    /// Returns true if the group existed.
    pub fn delete_group(&self, group_id: &str) -> StateResult<bool> {
        let prefix = format!("{group_id}/");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut groups = txn.open_table(GROUPS).map_err(map_err!(Table))?;
            existed = groups.remove(group_id).map_err(map_err!(Write))?.is_some();

            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            let claims: Vec<u64> = members
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| {
                    let (k, v) = entry.ok()?;
                    (v.value() == group_id).then_some(k.value())
                })
                .collect();
            for cluster_id in claims {
                members.remove(cluster_id).map_err(map_err!(Write))?;
            }

            let mut features = txn.open_table(FEATURES).map_err(map_err!(Table))?;
            for key in collect_prefixed_keys(&features, &prefix)? {
                features.remove(key.as_str()).map_err(map_err!(Write))?;
            }

            let mut deployments = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            for key in collect_prefixed_keys(&deployments, &prefix)? {
                deployments.remove(key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%group_id, existed, "group deleted");
        Ok(existed)
    }

    /// The group currently claiming a cluster, if any.
    pub fn member_owner(&self, cluster_id: u64) -> StateResult<Option<GroupId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        Ok(table
            .get(cluster_id)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_string()))
    }

    // ── Features ───────────────────────────────────────────────────

    /// Insert or update a feature record.
    pub fn put_feature(&self, record: &FeatureRecord) -> StateResult<()> {
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, enabled = record.enabled, "feature stored");
        Ok(())
    }

    /// Get a feature record by group id and feature name.
    pub fn get_feature(
        &self,
        group_id: &str,
        feature_name: &str,
    ) -> StateResult<Option<FeatureRecord>> {
        let key = feature_key(group_id, feature_name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: FeatureRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all feature records for a group.
    pub fn list_features_for_group(&self, group_id: &str) -> StateResult<Vec<FeatureRecord>> {
        let prefix = format!("{group_id}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(FEATURES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let record: FeatureRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    // ── Deployments ────────────────────────────────────────────────

    /// Insert or update a deployment record.
    pub fn put_deployment(&self, record: &DeploymentRecord) -> StateResult<()> {
        let key = record.table_key();
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "deployment stored");
        Ok(())
    }

    /// Get a deployment record by group id and release name.
    pub fn get_deployment(
        &self,
        group_id: &str,
        release_name: &str,
    ) -> StateResult<Option<DeploymentRecord>> {
        let key = deployment_key(group_id, release_name);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: DeploymentRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all deployment records for a group.
    pub fn list_deployments_for_group(&self, group_id: &str) -> StateResult<Vec<DeploymentRecord>> {
        let prefix = format!("{group_id}/");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(&prefix) {
                let record: DeploymentRecord =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }
}

/// Collect keys matching a prefix from a `&str`-keyed table.
fn collect_prefixed_keys<T>(table: &T, prefix: &str) -> StateResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    table
        .iter()
        .map_err(map_err!(Read))?
        .filter_map(|entry| {
            let (key, _) = entry.ok()?;
            let k = key.value().to_string();
            k.starts_with(prefix).then_some(k)
        })
        .map(Ok)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_group(id: &str, org: u64, name: &str, member_ids: &[u64]) -> GroupRecord {
        GroupRecord {
            id: id.to_string(),
            uid: format!("{id}-uid"),
            organization_id: org,
            name: name.to_string(),
            member_ids: member_ids.to_vec(),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    fn test_feature(group_id: &str, name: &str, enabled: bool) -> FeatureRecord {
        FeatureRecord {
            group_id: group_id.to_string(),
            name: name.to_string(),
            enabled,
            properties: serde_json::json!({"replicas": 2}),
        }
    }

    fn test_deployment(group_id: &str, release: &str) -> DeploymentRecord {
        DeploymentRecord {
            group_id: group_id.to_string(),
            release_name: release.to_string(),
            chart_name: "nginx".to_string(),
            chart_version: "1.2.3".to_string(),
            package: Vec::new(),
            namespace: "default".to_string(),
            organization_name: "acme".to_string(),
            reuse_values: false,
            wait: true,
            timeout_secs: 300,
            values: serde_json::json!({"image": "nginx"}),
            value_overrides: HashMap::new(),
            created_at: 1000,
            updated_at: 1000,
        }
    }

    // ── Group CRUD ─────────────────────────────────────────────────

    #[test]
    fn group_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let record = test_group("grp-1", 1, "prod", &[10, 11]);

        store.put_group(&record).unwrap();
        let retrieved = store.get_group("grp-1").unwrap();

        assert_eq!(retrieved, Some(record));
    }

    #[test]
    fn group_get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_group("nope").unwrap().is_none());
    }

    #[test]
    fn group_find_by_name_scoped_to_org() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10])).unwrap();
        store.put_group(&test_group("grp-2", 2, "prod", &[11])).unwrap();

        let found = store.find_group_by_name(2, "prod").unwrap().unwrap();
        assert_eq!(found.id, "grp-2");
        assert!(store.find_group_by_name(3, "prod").unwrap().is_none());
    }

    #[test]
    fn group_update_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        let mut record = test_group("grp-1", 1, "prod", &[10]);
        store.put_group(&record).unwrap();

        record.name = "staging".to_string();
        record.updated_at = 2000;
        store.put_group(&record).unwrap();

        let retrieved = store.get_group("grp-1").unwrap().unwrap();
        assert_eq!(retrieved.name, "staging");
        assert_eq!(retrieved.updated_at, 2000);
        assert_eq!(store.list_groups().unwrap().len(), 1);
    }

    // ── Member claims ──────────────────────────────────────────────

    #[test]
    fn members_claimed_on_save() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10, 11])).unwrap();

        assert_eq!(store.member_owner(10).unwrap(), Some("grp-1".to_string()));
        assert_eq!(store.member_owner(11).unwrap(), Some("grp-1".to_string()));
        assert_eq!(store.member_owner(12).unwrap(), None);
    }

    #[test]
    fn conflicting_claim_fails_and_writes_nothing() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10])).unwrap();

        let err = store
            .put_group(&test_group("grp-2", 1, "staging", &[10, 11]))
            .unwrap_err();
        assert!(matches!(
            err,
            StateError::MemberConflict { cluster_id: 10, .. }
        ));

        // The losing save must not be visible, not even partially.
        assert!(store.get_group("grp-2").unwrap().is_none());
        assert_eq!(store.member_owner(10).unwrap(), Some("grp-1".to_string()));
        assert_eq!(store.member_owner(11).unwrap(), None);
    }

    #[test]
    fn update_releases_dropped_members() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10, 11])).unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[11, 12])).unwrap();

        assert_eq!(store.member_owner(10).unwrap(), None);
        assert_eq!(store.member_owner(11).unwrap(), Some("grp-1".to_string()));
        assert_eq!(store.member_owner(12).unwrap(), Some("grp-1".to_string()));

        // The released cluster is claimable by another group now.
        store.put_group(&test_group("grp-2", 1, "staging", &[10])).unwrap();
        assert_eq!(store.member_owner(10).unwrap(), Some("grp-2".to_string()));
    }

    // ── Cascade delete ─────────────────────────────────────────────

    #[test]
    fn delete_group_cascades() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10])).unwrap();
        store.put_feature(&test_feature("grp-1", "federation", true)).unwrap();
        store.put_deployment(&test_deployment("grp-1", "web")).unwrap();

        assert!(store.delete_group("grp-1").unwrap());

        assert!(store.get_group("grp-1").unwrap().is_none());
        assert_eq!(store.member_owner(10).unwrap(), None);
        assert!(store.list_features_for_group("grp-1").unwrap().is_empty());
        assert!(store.list_deployments_for_group("grp-1").unwrap().is_empty());
    }

    #[test]
    fn delete_group_leaves_other_groups_alone() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_group(&test_group("grp-1", 1, "prod", &[10])).unwrap();
        store.put_group(&test_group("grp-2", 1, "staging", &[11])).unwrap();
        store.put_feature(&test_feature("grp-2", "federation", true)).unwrap();

        store.delete_group("grp-1").unwrap();

        assert!(store.get_group("grp-2").unwrap().is_some());
        assert_eq!(store.member_owner(11).unwrap(), Some("grp-2".to_string()));
        assert_eq!(store.list_features_for_group("grp-2").unwrap().len(), 1);
    }

    #[test]
    fn delete_nonexistent_group_returns_false() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(!store.delete_group("nope").unwrap());
    }

    // ── Feature CRUD ───────────────────────────────────────────────

    #[test]
    fn feature_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let record = test_feature("grp-1", "federation", true);

        store.put_feature(&record).unwrap();
        let retrieved = store.get_feature("grp-1", "federation").unwrap();

        assert_eq!(retrieved, Some(record));
    }

    #[test]
    fn feature_properties_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        let mut record = test_feature("grp-1", "servicemesh", false);
        record.properties = serde_json::json!({"mtls": true, "version": "1.4"});

        store.put_feature(&record).unwrap();
        let retrieved = store.get_feature("grp-1", "servicemesh").unwrap().unwrap();

        assert_eq!(retrieved.properties["mtls"], serde_json::json!(true));
        assert!(!retrieved.enabled);
    }

    #[test]
    fn feature_list_for_group_only() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_feature(&test_feature("grp-1", "federation", true)).unwrap();
        store.put_feature(&test_feature("grp-1", "servicemesh", false)).unwrap();
        store.put_feature(&test_feature("grp-2", "federation", true)).unwrap();

        assert_eq!(store.list_features_for_group("grp-1").unwrap().len(), 2);
        assert_eq!(store.list_features_for_group("grp-2").unwrap().len(), 1);
    }

    // ── Deployment CRUD ────────────────────────────────────────────

    #[test]
    fn deployment_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let record = test_deployment("grp-1", "web");

        store.put_deployment(&record).unwrap();
        let retrieved = store.get_deployment("grp-1", "web").unwrap();

        assert_eq!(retrieved, Some(record));
    }

    #[test]
    fn deployment_overrides_round_trip() {
        let store = StateStore::open_in_memory().unwrap();
        let mut record = test_deployment("grp-1", "web");
        record
            .value_overrides
            .insert(10, serde_json::json!({"replicas": 5}));

        store.put_deployment(&record).unwrap();
        let retrieved = store.get_deployment("grp-1", "web").unwrap().unwrap();

        assert_eq!(
            retrieved.value_overrides.get(&10),
            Some(&serde_json::json!({"replicas": 5}))
        );
    }

    #[test]
    fn deployment_list_for_group() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_deployment(&test_deployment("grp-1", "web")).unwrap();
        store.put_deployment(&test_deployment("grp-1", "db")).unwrap();
        store.put_deployment(&test_deployment("grp-2", "web")).unwrap();

        assert_eq!(store.list_deployments_for_group("grp-1").unwrap().len(), 2);
        assert_eq!(store.list_deployments_for_group("grp-2").unwrap().len(), 1);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_group(&test_group("grp-1", 1, "prod", &[10])).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let record = store.get_group("grp-1").unwrap();
        assert!(record.is_some());
        assert_eq!(store.member_owner(10).unwrap(), Some("grp-1".to_string()));
    }

    // ── Edge cases ─────────────────────────────────────────────────

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_groups().unwrap().is_empty());
        assert!(store.list_features_for_group("any").unwrap().is_empty());
        assert!(store.list_deployments_for_group("any").unwrap().is_empty());
        assert!(store.get_feature("any", "federation").unwrap().is_none());
        assert!(store.get_deployment("any", "web").unwrap().is_none());
        assert!(store.member_owner(1).unwrap().is_none());
    }
}
