//! Rehydrated group views.
//!
//! A [`GroupView`] is what the coordinators and feature handlers work with:
//! the persisted group identity plus member handles freshly resolved through
//! the cluster directory. Views are throwaway — they are rebuilt on every
//! operation, never cached.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cluster::{Cluster, ClusterId, OrgId};

/// Unique identifier of a cluster group.
pub type GroupId = String;

/// One member of a group, as seen at rehydration time.
///
/// A member whose cluster can no longer be resolved carries status
/// `"cluster not found"` instead of failing the whole group read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberCluster {
    pub id: ClusterId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Fully rehydrated view of a cluster group.
#[derive(Clone, Serialize)]
pub struct GroupView {
    pub id: GroupId,
    pub uid: String,
    pub name: String,
    pub organization_id: OrgId,
    pub members: Vec<MemberCluster>,
    /// Resolvable member handles keyed by cluster name. Not serialized.
    #[serde(skip_serializing)]
    pub member_clusters: HashMap<String, Arc<dyn Cluster>>,
}

impl GroupView {
    pub fn is_member(&self, cluster_name: &str) -> bool {
        self.members.iter().any(|m| m.name == cluster_name)
    }
}

impl std::fmt::Debug for GroupView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupView")
            .field("id", &self.id)
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("organization_id", &self.organization_id)
            .field("members", &self.members)
            .finish()
    }
}
