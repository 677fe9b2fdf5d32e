//! Group coordinator — membership lifecycle and invariants.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use fleetgrid_core::{Cluster, ClusterDirectory, GroupId, GroupView, MemberCluster, OrgId};
use fleetgrid_feature::{DEPLOYMENT_FEATURE, FeatureReconciler};
use fleetgrid_state::{FeatureRecord, GroupRecord, StateError, StateStore};
use tracing::{info, warn};

use crate::error::{GroupError, GroupResult};

/// Owns group lifecycle and the membership invariants.
pub struct GroupCoordinator {
    directory: Arc<dyn ClusterDirectory>,
    store: StateStore,
    features: Arc<FeatureReconciler>,
}

impl GroupCoordinator {
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        store: StateStore,
        features: Arc<FeatureReconciler>,
    ) -> Self {
        Self {
            directory,
            store,
            features,
        }
    }

    /// Create a group from a list of member references (cluster names or
    /// numeric ids).
    ///
    /// Resolution is all-or-nothing: any unresolvable reference fails the
    /// call. Admission is best-effort among resolved clusters: only ready
    /// ones join, and zero ready members fails the call. Nothing is
    /// persisted on any failure path. On success the `deployment` feature
    /// is seeded enabled.
    pub async fn create_group(
        &self,
        organization_id: OrgId,
        name: &str,
        member_refs: &[String],
    ) -> GroupResult<GroupId> {
        if name.is_empty() {
            return Err(GroupError::InvalidName);
        }
        if self.store.find_group_by_name(organization_id, name)?.is_some() {
            return Err(GroupError::AlreadyExists {
                organization_id,
                name: name.to_string(),
            });
        }

        let admitted = self
            .resolve_and_admit(organization_id, name, member_refs, None)
            .await?;

        let now = epoch_secs();
        let record = GroupRecord {
            id: generate_group_id(organization_id, name),
            uid: generate_group_uid(organization_id, name),
            organization_id,
            name: name.to_string(),
            member_ids: admitted.iter().map(|c| c.id()).collect(),
            created_at: now,
            updated_at: now,
        };
        self.put_group_mapping_conflicts(organization_id, &record, &admitted)?;

        // Every group can take deployments from day one.
        self.store.put_feature(&FeatureRecord {
            group_id: record.id.clone(),
            name: DEPLOYMENT_FEATURE.to_string(),
            enabled: true,
            properties: serde_json::Value::Null,
        })?;

        info!(
            group = %name,
            group_id = %record.id,
            org = organization_id,
            members = record.member_ids.len(),
            "cluster group created"
        );
        Ok(record.id)
    }

    /// Update a group's name and member set.
    ///
    /// The new member list is resolved exactly like create (the ownership
    /// check excludes this group itself). The new state is persisted
    /// first; enabled features are then reconciled against the updated
    /// membership.
    pub async fn update_group(
        &self,
        organization_id: OrgId,
        group_id: &str,
        new_name: &str,
        member_refs: &[String],
    ) -> GroupResult<()> {
        let record = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| GroupError::GroupNotFound(group_id.to_string()))?;

        let admitted = self
            .resolve_and_admit(organization_id, &record.name, member_refs, Some(group_id))
            .await?;

        let old_ids: HashSet<u64> = record.member_ids.iter().copied().collect();
        let new_ids: HashSet<u64> = admitted.iter().map(|c| c.id()).collect();
        for cluster in &admitted {
            if !old_ids.contains(&cluster.id()) {
                info!(cluster = %cluster.name(), group = %record.name, "cluster joining group");
            }
        }
        for leaving in old_ids.difference(&new_ids) {
            info!(cluster_id = leaving, group = %record.name, "cluster leaving group");
        }

        let updated = GroupRecord {
            name: if new_name.is_empty() {
                record.name.clone()
            } else {
                new_name.to_string()
            },
            member_ids: admitted.iter().map(|c| c.id()).collect(),
            updated_at: epoch_secs(),
            ..record
        };
        self.put_group_mapping_conflicts(organization_id, &updated, &admitted)?;

        // Handlers observe the committed membership.
        let view = self.view_from_record(&updated, false).await;
        self.features.reconcile_features(&view, true).await?;

        Ok(())
    }

    /// Delete a group, tearing down its features first.
    ///
    /// Every enabled feature's handler is driven with `enabled=false`
    /// before any record is touched. If any disable fails the deletion is
    /// aborted and the group is left intact and enabled — delete is not
    /// idempotent on partial failure; callers retry.
    pub async fn delete_group(&self, group_id: &str) -> GroupResult<()> {
        let record = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| GroupError::GroupNotFound(group_id.to_string()))?;
        let view = self.view_from_record(&record, false).await;

        self.features.disable_features(&view).await?;

        self.store.delete_group(group_id)?;
        info!(group = %record.name, %group_id, "cluster group deleted");
        Ok(())
    }

    /// Rehydrate a group by id.
    pub async fn get_group(&self, group_id: &str, with_status: bool) -> GroupResult<GroupView> {
        let record = self
            .store
            .get_group(group_id)?
            .ok_or_else(|| GroupError::GroupNotFound(group_id.to_string()))?;
        Ok(self.view_from_record(&record, with_status).await)
    }

    /// Rehydrate a group by organization and name.
    pub async fn get_group_by_name(
        &self,
        organization_id: OrgId,
        name: &str,
    ) -> GroupResult<GroupView> {
        let record = self
            .store
            .find_group_by_name(organization_id, name)?
            .ok_or_else(|| GroupError::GroupNotFound(name.to_string()))?;
        Ok(self.view_from_record(&record, false).await)
    }

    /// All groups of an organization, without live member status.
    pub async fn list_groups(&self, organization_id: OrgId) -> GroupResult<Vec<GroupView>> {
        let mut views = Vec::new();
        for record in self.store.list_groups()? {
            if record.organization_id == organization_id {
                views.push(self.view_from_record(&record, false).await);
            }
        }
        Ok(views)
    }

    /// Resolve member refs and admit the ready ones.
    ///
    /// `own_group` is the group id whose existing claims don't count as
    /// conflicts (update path).
    async fn resolve_and_admit(
        &self,
        organization_id: OrgId,
        group_name: &str,
        member_refs: &[String],
        own_group: Option<&str>,
    ) -> GroupResult<Vec<Arc<dyn Cluster>>> {
        let mut admitted: Vec<Arc<dyn Cluster>> = Vec::new();
        for member_ref in member_refs {
            let cluster = self.resolve_member(organization_id, member_ref).await?;

            if let Some(owner) = self.store.member_owner(cluster.id())? {
                if own_group != Some(owner.as_str()) {
                    return Err(GroupError::MemberAlreadyGrouped {
                        organization_id,
                        member: cluster.name().to_string(),
                    });
                }
            }

            // A readiness probe failure counts as not ready, not as a
            // call failure.
            if matches!(cluster.is_ready().await, Ok(true)) {
                info!(cluster = %cluster.name(), group = %group_name, "joining cluster to group");
                admitted.push(cluster);
            } else {
                info!(
                    cluster = %cluster.name(),
                    group = %group_name,
                    "cluster not ready, skipping"
                );
            }
        }

        if admitted.is_empty() {
            return Err(GroupError::NoReadyMembers {
                organization_id,
                name: group_name.to_string(),
            });
        }
        Ok(admitted)
    }

    /// Resolve one member reference: numeric id first, then name.
    async fn resolve_member(
        &self,
        organization_id: OrgId,
        member_ref: &str,
    ) -> GroupResult<Arc<dyn Cluster>> {
        if let Ok(cluster_id) = member_ref.parse::<u64>() {
            if let Ok(cluster) = self.directory.get_by_id_only(cluster_id).await {
                return Ok(cluster);
            }
        }
        self.directory
            .get_by_name(organization_id, member_ref)
            .await
            .map_err(|_| GroupError::MemberClusterNotFound {
                organization_id,
                member: member_ref.to_string(),
            })
    }

    /// Save a group, translating a lost claim race into the member error.
    ///
    /// The read-side ownership check in `resolve_and_admit` gives the
    /// friendly error in the common case; the claim written inside the
    /// save transaction is authoritative under concurrency.
    fn put_group_mapping_conflicts(
        &self,
        organization_id: OrgId,
        record: &GroupRecord,
        admitted: &[Arc<dyn Cluster>],
    ) -> GroupResult<()> {
        self.store.put_group(record).map_err(|e| match e {
            StateError::MemberConflict { cluster_id, .. } => {
                let member = admitted
                    .iter()
                    .find(|c| c.id() == cluster_id)
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| cluster_id.to_string());
                GroupError::MemberAlreadyGrouped {
                    organization_id,
                    member,
                }
            }
            other => GroupError::State(other),
        })
    }

    /// Build a view by rehydrating each member through the directory.
    ///
    /// Members resolve sequentially. An unresolvable member degrades to
    /// status `"cluster not found"` instead of failing the read; with
    /// `with_status`, a failed status query becomes the status string.
    async fn view_from_record(&self, record: &GroupRecord, with_status: bool) -> GroupView {
        let mut members = Vec::with_capacity(record.member_ids.len());
        let mut member_clusters: HashMap<String, Arc<dyn Cluster>> = HashMap::new();

        for &cluster_id in &record.member_ids {
            match self.directory.get_by_id_only(cluster_id).await {
                Ok(cluster) => {
                    let status = if with_status {
                        Some(match cluster.status().await {
                            Ok(s) => s.status,
                            Err(e) => e.to_string(),
                        })
                    } else {
                        None
                    };
                    members.push(MemberCluster {
                        id: cluster_id,
                        name: cluster.name().to_string(),
                        status,
                    });
                    member_clusters.insert(cluster.name().to_string(), cluster);
                }
                Err(_) => {
                    warn!(cluster_id, group = %record.name, "member cluster not resolvable");
                    members.push(MemberCluster {
                        id: cluster_id,
                        name: format!("cluster {cluster_id}"),
                        status: Some("cluster not found".to_string()),
                    });
                }
            }
        }

        GroupView {
            id: record.id.clone(),
            uid: record.uid.clone(),
            name: record.name.clone(),
            organization_id: record.organization_id,
            members,
            member_clusters,
        }
    }
}

fn generate_group_id(organization_id: OrgId, name: &str) -> String {
    format!("grp-{:08x}", identity_hash(organization_id, name, 0) as u32)
}

fn generate_group_uid(organization_id: OrgId, name: &str) -> String {
    format!("{:016x}", identity_hash(organization_id, name, 1))
}

/// Deterministic-per-call hash over identity fields plus creation time.
fn identity_hash(organization_id: OrgId, name: &str, salt: u64) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    organization_id.hash(&mut hasher);
    name.hash(&mut hasher);
    salt.hash(&mut hasher);
    epoch_secs().hash(&mut hasher);
    hasher.finish()
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
