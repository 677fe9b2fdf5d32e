//! Group coordinator error types.

use fleetgrid_core::OrgId;
use thiserror::Error;

pub type GroupResult<T> = Result<T, GroupError>;

/// Errors from group lifecycle operations.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("cluster group not found: {0}")]
    GroupNotFound(String),

    #[error("cluster group already exists with this name: {name} in org {organization_id}")]
    AlreadyExists { organization_id: OrgId, name: String },

    #[error("cluster group name is empty")]
    InvalidName,

    #[error("member cluster not found: {member} in org {organization_id}")]
    MemberClusterNotFound { organization_id: OrgId, member: String },

    #[error("member cluster is already part of a cluster group: {member}")]
    MemberAlreadyGrouped { organization_id: OrgId, member: String },

    #[error("no ready cluster members found: {name} in org {organization_id}")]
    NoReadyMembers { organization_id: OrgId, name: String },

    #[error(transparent)]
    Feature(#[from] fleetgrid_feature::FeatureError),

    #[error("state store error: {0}")]
    State(#[from] fleetgrid_state::StateError),
}
