//! fleetgrid-feature — feature state and the reconcile protocol.
//!
//! Persists enabled/disabled state and arbitrary properties per
//! `(group, feature)` pair, and drives registered [`FeatureHandler`]s to
//! match that state whenever membership or configuration changes.
//!
//! Persistence and reconciliation are deliberately decoupled:
//! [`FeatureReconciler::set_feature_params`] only writes the record, so
//! callers can batch a property change with a later explicit reconcile.
//!
//! [`FeatureHandler`]: fleetgrid_core::FeatureHandler

pub mod error;
pub mod handlers;
pub mod registry;
pub mod reconciler;

pub use error::{FeatureError, FeatureResult};
pub use handlers::{FederationHandler, ServiceMeshHandler};
pub use registry::HandlerRegistry;
pub use reconciler::FeatureReconciler;

/// Feature enabled on every group at creation; not user-toggled.
pub const DEPLOYMENT_FEATURE: &str = "deployment";

/// Built-in cross-cluster federation feature.
pub const FEDERATION_FEATURE: &str = "federation";

/// Built-in service mesh feature.
pub const SERVICE_MESH_FEATURE: &str = "servicemesh";
