//! REST API handlers.
//!
//! Each handler loads the group scoped to the organization in the path,
//! delegates to a coordinator, and maps typed errors onto HTTP statuses:
//! not-found → 404, validation and invalid-state → 400, everything else
//! (repository, upstream) → 500.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fleetgrid_core::{GroupView, OrgId};
use fleetgrid_deploy::{DeployError, DeploymentRequest, TargetStatus};
use fleetgrid_feature::FeatureError;
use fleetgrid_group::GroupError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

// ── Error mapping ──────────────────────────────────────────────

fn group_error(e: GroupError) -> Response {
    let status = match &e {
        GroupError::GroupNotFound(_) => StatusCode::NOT_FOUND,
        GroupError::AlreadyExists { .. }
        | GroupError::InvalidName
        | GroupError::MemberClusterNotFound { .. }
        | GroupError::MemberAlreadyGrouped { .. }
        | GroupError::NoReadyMembers { .. } => StatusCode::BAD_REQUEST,
        GroupError::Feature(FeatureError::NotFound { .. }) => StatusCode::NOT_FOUND,
        GroupError::Feature(FeatureError::DisableFailed { .. }) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

fn feature_error(e: FeatureError) -> Response {
    let status = match &e {
        FeatureError::NotFound { .. } => StatusCode::NOT_FOUND,
        FeatureError::DisableFailed { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

fn deploy_error(e: DeployError) -> Response {
    let status = match &e {
        DeployError::DeploymentNotFound { .. } => StatusCode::NOT_FOUND,
        DeployError::ChartResolution(_)
        | DeployError::InvalidRequest(_)
        | DeployError::NotSupported(_) => StatusCode::BAD_REQUEST,
        DeployError::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(&e.to_string(), status)
}

/// Load a group by id, scoped to the organization in the path.
async fn load_group(
    state: &ApiState,
    org: OrgId,
    group_id: &str,
    with_status: bool,
) -> Result<GroupView, Response> {
    match state.groups.get_group(group_id, with_status).await {
        Ok(view) if view.organization_id == org => Ok(view),
        Ok(_) => Err(error_response(
            "cluster group not found",
            StatusCode::NOT_FOUND,
        )),
        Err(e) => Err(group_error(e)),
    }
}

// ── Groups ─────────────────────────────────────────────────────

/// Create / update cluster group request body.
#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    #[serde(default)]
    pub name: String,
    /// Member cluster references: names or numeric ids.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Serialize)]
struct CreateGroupResponse {
    group_id: String,
}

/// POST /api/v1/orgs/{org}/clustergroups
pub async fn create_group(
    State(state): State<ApiState>,
    Path(org): Path<OrgId>,
    Json(req): Json<GroupRequest>,
) -> impl IntoResponse {
    if req.members.is_empty() {
        return error_response(
            "there should be at least one cluster member",
            StatusCode::BAD_REQUEST,
        );
    }
    match state.groups.create_group(org, &req.name, &req.members).await {
        Ok(group_id) => (
            StatusCode::CREATED,
            ApiResponse::ok(CreateGroupResponse { group_id }),
        )
            .into_response(),
        Err(e) => group_error(e),
    }
}

/// GET /api/v1/orgs/{org}/clustergroups
pub async fn list_groups(
    State(state): State<ApiState>,
    Path(org): Path<OrgId>,
) -> impl IntoResponse {
    match state.groups.list_groups(org).await {
        Ok(views) => ApiResponse::ok(views).into_response(),
        Err(e) => group_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct GetGroupQuery {
    /// Also query each member for its live status.
    #[serde(default)]
    pub status: bool,
}

/// GET /api/v1/orgs/{org}/clustergroups/{id}
pub async fn get_group(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
    Query(query): Query<GetGroupQuery>,
) -> impl IntoResponse {
    match load_group(&state, org, &group_id, query.status).await {
        Ok(view) => ApiResponse::ok(view).into_response(),
        Err(resp) => resp,
    }
}

/// PUT /api/v1/orgs/{org}/clustergroups/{id}
pub async fn update_group(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
    Json(req): Json<GroupRequest>,
) -> impl IntoResponse {
    if req.members.is_empty() {
        return error_response(
            "there should be at least one cluster member",
            StatusCode::BAD_REQUEST,
        );
    }
    if let Err(resp) = load_group(&state, org, &group_id, false).await {
        return resp;
    }
    match state
        .groups
        .update_group(org, &group_id, &req.name, &req.members)
        .await
    {
        Ok(()) => ApiResponse::ok("updated").into_response(),
        Err(e) => group_error(e),
    }
}

/// DELETE /api/v1/orgs/{org}/clustergroups/{id}
pub async fn delete_group(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
) -> impl IntoResponse {
    if let Err(resp) = load_group(&state, org, &group_id, false).await {
        return resp;
    }
    match state.groups.delete_group(&group_id).await {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) => group_error(e),
    }
}

// ── Features ───────────────────────────────────────────────────

/// Enable feature request body.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureRequest {
    #[serde(default)]
    pub properties: Value,
}

#[derive(Serialize)]
struct FeatureResponse {
    enabled: bool,
    properties: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<HashMap<String, String>>,
}

/// GET /api/v1/orgs/{org}/clustergroups/{id}/features
pub async fn list_features(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state.features.get_features(&group) {
        Ok(features) => {
            let body: HashMap<String, FeatureResponse> = features
                .into_iter()
                .map(|(name, f)| {
                    (
                        name,
                        FeatureResponse {
                            enabled: f.enabled,
                            properties: f.properties,
                            status: None,
                        },
                    )
                })
                .collect();
            ApiResponse::ok(body).into_response()
        }
        Err(e) => feature_error(e),
    }
}

/// GET /api/v1/orgs/{org}/clustergroups/{id}/features/{name}
pub async fn get_feature(
    State(state): State<ApiState>,
    Path((org, group_id, name)): Path<(OrgId, String, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    let feature = match state.features.get_feature(&group, &name) {
        Ok(feature) => feature,
        Err(e) => return feature_error(e),
    };

    // Member status only makes sense for an enabled feature.
    let status = if feature.enabled {
        match state.features.get_feature_status(&feature).await {
            Ok(status) => status,
            Err(e) => return feature_error(e),
        }
    } else {
        None
    };

    ApiResponse::ok(FeatureResponse {
        enabled: feature.enabled,
        properties: feature.properties,
        status,
    })
    .into_response()
}

/// POST /api/v1/orgs/{org}/clustergroups/{id}/features/{name}
///
/// Persists the feature enabled with the given properties, then
/// reconciles every handler (enabled or not) so a freshly-disabled
/// sibling feature can still converge.
pub async fn enable_feature(
    State(state): State<ApiState>,
    Path((org, group_id, name)): Path<(OrgId, String, String)>,
    Json(req): Json<FeatureRequest>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    if let Err(e) = state
        .features
        .set_feature_params(&group, &name, true, req.properties)
    {
        return feature_error(e);
    }
    match state.features.reconcile_features(&group, false).await {
        Ok(()) => ApiResponse::ok("enabled").into_response(),
        Err(e) => feature_error(e),
    }
}

/// DELETE /api/v1/orgs/{org}/clustergroups/{id}/features/{name}
pub async fn disable_feature(
    State(state): State<ApiState>,
    Path((org, group_id, name)): Path<(OrgId, String, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    // Keep the stored properties; only the flag flips.
    let properties = match state.features.get_feature(&group, &name) {
        Ok(feature) => feature.properties,
        Err(e) => return feature_error(e),
    };
    if let Err(e) = state
        .features
        .set_feature_params(&group, &name, false, properties)
    {
        return feature_error(e);
    }
    match state.features.reconcile_features(&group, false).await {
        Ok(()) => ApiResponse::ok("disabled").into_response(),
        Err(e) => feature_error(e),
    }
}

// ── Deployments ────────────────────────────────────────────────

#[derive(Serialize)]
struct CreateDeploymentResponse {
    release_name: String,
    target_clusters: Vec<TargetStatus>,
}

/// POST /api/v1/orgs/{org}/clustergroups/{id}/deployments
pub async fn create_deployment(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
    Json(req): Json<DeploymentRequest>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state
        .deployments
        .create_deployment(&group, &org.to_string(), &req)
        .await
    {
        Ok(target_clusters) => (
            StatusCode::CREATED,
            ApiResponse::ok(CreateDeploymentResponse {
                release_name: req.release_name,
                target_clusters,
            }),
        )
            .into_response(),
        Err(e) => deploy_error(e),
    }
}

/// GET /api/v1/orgs/{org}/clustergroups/{id}/deployments
pub async fn list_deployments(
    State(state): State<ApiState>,
    Path((org, group_id)): Path<(OrgId, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state.deployments.list_deployments(&group) {
        Ok(summaries) => ApiResponse::ok(summaries).into_response(),
        Err(e) => deploy_error(e),
    }
}

/// PUT /api/v1/orgs/{org}/clustergroups/{id}/deployments/{release}
///
/// Upgrade is not implemented; the coordinator rejects it so the caller
/// gets a clear 400 instead of a silent no-op.
pub async fn upgrade_deployment(
    State(state): State<ApiState>,
    Path((org, group_id, release)): Path<(OrgId, String, String)>,
    Json(req): Json<DeploymentRequest>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state
        .deployments
        .upgrade_deployment(&group, &release, &req)
        .await
    {
        Ok(target_clusters) => ApiResponse::ok(target_clusters).into_response(),
        Err(e) => deploy_error(e),
    }
}

/// DELETE /api/v1/orgs/{org}/clustergroups/{id}/deployments/{release}
///
/// Delete is not implemented; rejected like upgrade.
pub async fn delete_deployment(
    State(state): State<ApiState>,
    Path((org, group_id, release)): Path<(OrgId, String, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state.deployments.delete_deployment(&group, &release).await {
        Ok(target_clusters) => ApiResponse::ok(target_clusters).into_response(),
        Err(e) => deploy_error(e),
    }
}

/// GET /api/v1/orgs/{org}/clustergroups/{id}/deployments/{release}
pub async fn get_deployment(
    State(state): State<ApiState>,
    Path((org, group_id, release)): Path<(OrgId, String, String)>,
) -> impl IntoResponse {
    let group = match load_group(&state, org, &group_id, false).await {
        Ok(view) => view,
        Err(resp) => return resp,
    };
    match state.deployments.get_deployment(&group, &release).await {
        Ok(details) => ApiResponse::ok(details).into_response(),
        Err(e) => deploy_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_core::{StaticCluster, StaticDirectory};
    use fleetgrid_deploy::{DeploymentCoordinator, DryRunChartEngine};
    use fleetgrid_feature::{FeatureReconciler, FederationHandler, HandlerRegistry};
    use fleetgrid_group::GroupCoordinator;
    use fleetgrid_state::StateStore;
    use std::sync::Arc;

    fn test_state() -> ApiState {
        let mut directory = StaticDirectory::new();
        directory.register(StaticCluster::new(1, 10, "alpha"));
        directory.register(StaticCluster::new(2, 10, "beta"));
        let directory = Arc::new(directory);

        let store = StateStore::open_in_memory().unwrap();
        let mut registry = HandlerRegistry::new();
        registry.register(
            fleetgrid_feature::FEDERATION_FEATURE,
            Arc::new(FederationHandler::new()),
        );
        let features = Arc::new(FeatureReconciler::new(store.clone(), Arc::new(registry)));

        ApiState {
            groups: Arc::new(GroupCoordinator::new(
                directory,
                store.clone(),
                features.clone(),
            )),
            features,
            deployments: Arc::new(DeploymentCoordinator::new(
                store,
                Arc::new(DryRunChartEngine::new()),
            )),
        }
    }

    fn group_request(name: &str, members: &[&str]) -> GroupRequest {
        GroupRequest {
            name: name.to_string(),
            members: members.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn create_test_group(state: &ApiState) -> String {
        state
            .groups
            .create_group(10, "prod", &["alpha".to_string()])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_group_returns_created() {
        let state = test_state();
        let resp = create_group(
            State(state),
            Path(10),
            Json(group_request("prod", &["alpha"])),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn duplicate_group_is_bad_request() {
        let state = test_state();
        create_test_group(&state).await;

        let resp = create_group(
            State(state),
            Path(10),
            Json(group_request("prod", &["beta"])),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_group_is_org_scoped() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let resp = get_group(
            State(state.clone()),
            Path((10, group_id.clone())),
            Query(GetGroupQuery { status: false }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        // Another organization can't see it.
        let resp = get_group(
            State(state),
            Path((20, group_id)),
            Query(GetGroupQuery { status: false }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let state = test_state();
        let resp = get_group(
            State(state),
            Path((10, "grp-missing".to_string())),
            Query(GetGroupQuery { status: false }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn enable_then_get_feature() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let resp = enable_feature(
            State(state.clone()),
            Path((10, group_id.clone(), "federation".to_string())),
            Json(FeatureRequest {
                properties: serde_json::json!({"dns": true}),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_feature(
            State(state),
            Path((10, group_id, "federation".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_feature_is_not_found() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let resp = get_feature(
            State(state),
            Path((10, group_id, "servicemesh".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_and_get_deployment() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let request: DeploymentRequest = serde_json::from_value(serde_json::json!({
            "chart_name": "nginx",
            "chart_version": "1.2.3",
            "release_name": "web",
            "namespace": "default",
        }))
        .unwrap();

        let resp = create_deployment(
            State(state.clone()),
            Path((10, group_id.clone())),
            Json(request),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = get_deployment(
            State(state.clone()),
            Path((10, group_id.clone(), "web".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = list_deployments(State(state), Path((10, group_id)))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deployment_upgrade_and_delete_are_rejected() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let request: DeploymentRequest = serde_json::from_value(serde_json::json!({
            "chart_name": "nginx",
            "release_name": "web",
        }))
        .unwrap();
        let resp = upgrade_deployment(
            State(state.clone()),
            Path((10, group_id.clone(), "web".to_string())),
            Json(request),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = delete_deployment(State(state), Path((10, group_id, "web".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_group_requires_members() {
        let state = test_state();
        let resp = create_group(State(state), Path(10), Json(group_request("prod", &[])))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_deployment_is_not_found() {
        let state = test_state();
        let group_id = create_test_group(&state).await;

        let resp = get_deployment(State(state), Path((10, group_id, "nope".to_string())))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
