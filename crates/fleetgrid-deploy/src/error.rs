//! Deployment subsystem error types.

use thiserror::Error;

pub type DeployResult<T> = Result<T, DeployError>;

/// Errors from deployment coordination.
///
/// Per-member install/status failures are never errors — they are encoded
/// as status strings in the per-cluster results.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deployment not found: {release_name} on group {group_id}")]
    DeploymentNotFound {
        group_id: String,
        release_name: String,
    },

    #[error("error loading chart: {0}")]
    ChartResolution(String),

    #[error("invalid deployment request: {0}")]
    InvalidRequest(String),

    #[error("deployment {0} is not supported")]
    NotSupported(&'static str),

    #[error("state store error: {0}")]
    State(#[from] fleetgrid_state::StateError),
}
