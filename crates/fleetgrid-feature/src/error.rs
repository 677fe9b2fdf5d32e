//! Feature subsystem error types.

use thiserror::Error;

pub type FeatureResult<T> = Result<T, FeatureError>;

/// Errors from feature persistence and reconciliation.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature not found: {feature} on group {group_id}")]
    NotFound { group_id: String, feature: String },

    #[error("failed to disable features {features:?} on group {group_id}")]
    DisableFailed {
        group_id: String,
        features: Vec<String>,
    },

    #[error("feature handler error: {0}")]
    Handler(#[from] anyhow::Error),

    #[error("state store error: {0}")]
    State(#[from] fleetgrid_state::StateError),
}
