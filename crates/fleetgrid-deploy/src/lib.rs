//! fleetgrid-deploy — multi-cluster package deployments.
//!
//! A deployment installs one chart release onto every member of a cluster
//! group, with optional per-cluster value overrides. The coordinator
//! persists the deployment record, fans the install out to all members via
//! `fleetgrid-dispatch`, and reports one status per member — a single
//! member's failure never collapses the others' outcomes.
//!
//! The chart engine itself (package resolution, the actual install) is an
//! external collaborator behind the [`ChartEngine`] trait.

pub mod chart;
pub mod coordinator;
pub mod error;
pub mod values;

pub use chart::{ChartEngine, ChartInstall, DryRunChartEngine, Release};
pub use coordinator::{
    DeploymentCoordinator, DeploymentDetails, DeploymentRequest, DeploymentSummary, TargetStatus,
};
pub use error::{DeployError, DeployResult};
pub use values::merge_values;
