//! fleetgrid-api — REST API for FleetGrid.
//!
//! Thin axum layer over the coordinators; all behavior lives below this
//! crate. Handlers translate typed coordinator errors into HTTP statuses
//! and wrap payloads in a uniform JSON envelope.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/orgs/{org}/clustergroups` | Create a cluster group |
//! | GET | `/api/v1/orgs/{org}/clustergroups` | List cluster groups |
//! | GET | `/api/v1/orgs/{org}/clustergroups/{id}` | Get a group (`?status=true` for live member status) |
//! | PUT | `/api/v1/orgs/{org}/clustergroups/{id}` | Update name/members |
//! | DELETE | `/api/v1/orgs/{org}/clustergroups/{id}` | Delete a group |
//! | GET | `.../{id}/features` | List feature states |
//! | GET | `.../{id}/features/{name}` | Get one feature (+member status when enabled) |
//! | POST | `.../{id}/features/{name}` | Enable a feature and reconcile |
//! | DELETE | `.../{id}/features/{name}` | Disable a feature and reconcile |
//! | POST | `.../{id}/deployments` | Deploy a chart to every member |
//! | GET | `.../{id}/deployments` | List deployments |
//! | GET | `.../{id}/deployments/{release}` | Get a deployment with live status |
//! | PUT | `.../{id}/deployments/{release}` | Rejected — upgrade not implemented |
//! | DELETE | `.../{id}/deployments/{release}` | Rejected — delete not implemented |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use fleetgrid_deploy::DeploymentCoordinator;
use fleetgrid_feature::FeatureReconciler;
use fleetgrid_group::GroupCoordinator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub groups: Arc<GroupCoordinator>,
    pub features: Arc<FeatureReconciler>,
    pub deployments: Arc<DeploymentCoordinator>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let org_routes = Router::new()
        .route(
            "/clustergroups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/clustergroups/{id}",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        .route("/clustergroups/{id}/features", get(handlers::list_features))
        .route(
            "/clustergroups/{id}/features/{name}",
            get(handlers::get_feature)
                .post(handlers::enable_feature)
                .delete(handlers::disable_feature),
        )
        .route(
            "/clustergroups/{id}/deployments",
            get(handlers::list_deployments).post(handlers::create_deployment),
        )
        .route(
            "/clustergroups/{id}/deployments/{release}",
            get(handlers::get_deployment)
                .put(handlers::upgrade_deployment)
                .delete(handlers::delete_deployment),
        )
        .with_state(state);

    Router::new().nest("/api/v1/orgs/{org}", org_routes)
}
