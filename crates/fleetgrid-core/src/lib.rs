//! fleetgrid-core — domain API shared by every FleetGrid subsystem.
//!
//! Defines the seams the coordination engine is built around:
//!
//! - [`Cluster`] / [`ClusterDirectory`] — handles to externally managed
//!   Kubernetes clusters and the directory that resolves references to them.
//! - [`GroupView`] / [`MemberCluster`] — the rehydrated view of a cluster
//!   group handed to feature handlers and the deployment coordinator.
//! - [`Feature`] / [`FeatureHandler`] — the polymorphic capability contract
//!   behind cross-cluster features (federation, service mesh, ...).
//!
//! Concrete cluster integrations implement [`ClusterDirectory`]; the crate
//! ships [`StaticDirectory`], an inventory-backed implementation used by the
//! daemon and by tests.

pub mod cluster;
pub mod directory;
pub mod feature;
pub mod group;

pub use cluster::{Cluster, ClusterDirectory, ClusterError, ClusterId, ClusterResult, ClusterStatus, OrgId};
pub use directory::{StaticCluster, StaticDirectory};
pub use feature::{Feature, FeatureHandler};
pub use group::{GroupId, GroupView, MemberCluster};
