//! REST route handlers, per spec.md §6.
//!
//! Plain `async fn(State<AppState>, ...) -> impl IntoResponse` free
//! functions, one per endpoint, wired into a single `Router` in
//! [`crate::api::build_router`].

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::coordinator::VenueCoordinatorStatus;
use crate::edge_rpc::Method;
use crate::placement::{AutoplaceRequest, ObstacleFootprint};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::{CommissionedSensor, EdgeGateway, PlannedMount, RegionOfInterest, SensorModel, Vertex2};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn health() -> &'static str {
    "OK"
}

// --- C1: mesh directory ---

pub async fn list_gateways(State(state): State<Arc<AppState>>) -> Result<Json<Vec<EdgeGateway>>, ApiError> {
    Ok(Json(state.mesh.list_gateways().await?))
}

#[derive(Debug, Deserialize)]
pub struct RenameGatewayBody {
    pub display_name: String,
    pub notes: Option<String>,
}

pub async fn rename_gateway(
    State(state): State<Arc<AppState>>,
    Path(gateway_id): Path<String>,
    Json(body): Json<RenameGatewayBody>,
) -> Result<Json<Value>, ApiError> {
    if body.display_name.trim().is_empty() {
        return Err(OrchestratorError::BadRequest("displayName must not be empty".to_string()).into());
    }
    state.mesh.rename_gateway(&gateway_id, body.display_name, body.notes).await;
    Ok(Json(json!({ "ok": true })))
}

pub async fn gateway_inventory(State(state): State<Arc<AppState>>, Path(gateway_id): Path<String>) -> Result<Json<Value>, ApiError> {
    let gateway = state.mesh.resolve(&gateway_id).await?;
    let body = state
        .rpc
        .call(&gateway, "/lidar/inventory", Method::Get, None, crate::edge_rpc::READ_DEADLINE, &state.config)
        .await?;
    Ok(Json(body))
}

pub async fn scan_lidars(State(state): State<Arc<AppState>>, Path(gateway_id): Path<String>) -> Result<Json<Value>, ApiError> {
    let gateway = state.mesh.resolve(&gateway_id).await?;
    let body = state
        .rpc
        .call(&gateway, "/lidar/scan", Method::Post, None, crate::edge_rpc::SCAN_DEADLINE, &state.config)
        .await?;
    Ok(Json(body))
}

/// Always 200; body includes `online: bool` even when the proxy call
/// itself fails, per spec.md §6.
pub async fn gateway_status(State(state): State<Arc<AppState>>, Path(gateway_id): Path<String>) -> Json<Value> {
    let gateway = match state.mesh.resolve(&gateway_id).await {
        Ok(g) => g,
        Err(_) => return Json(json!({ "online": false })),
    };
    match state
        .rpc
        .call(&gateway, "/status", Method::Get, None, crate::edge_rpc::READ_DEADLINE, &state.config)
        .await
    {
        Ok(mut body) => {
            if let Value::Object(map) = &mut body {
                map.entry("online").or_insert(json!(true));
            }
            Json(body)
        }
        Err(_) => Json(json!({ "online": false })),
    }
}

// --- C5: pairings ---

pub async fn list_pairings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let venue_id = params
        .get("venueId")
        .ok_or_else(|| OrchestratorError::BadRequest("venueId is required".to_string()))?;
    let gateway_id = params.get("gatewayId").map(|s| s.as_str());
    Ok(Json(json!(state.pairings.list(venue_id, gateway_id).await)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPairingBody {
    pub venue_id: String,
    pub gateway_id: String,
    pub planned_mount_id: String,
    pub sensor_id: String,
    pub sensor_address: Option<String>,
}

pub async fn upsert_pairing(State(state): State<Arc<AppState>>, Json(body): Json<UpsertPairingBody>) -> Result<Json<Value>, ApiError> {
    let pairing = state
        .pairings
        .upsert(body.venue_id, body.gateway_id, body.planned_mount_id, body.sensor_id, body.sensor_address)
        .await?;
    Ok(Json(json!(pairing)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePairingParams {
    pub venue_id: String,
    pub planned_mount_id: String,
}

pub async fn delete_pairing(State(state): State<Arc<AppState>>, Query(params): Query<DeletePairingParams>) -> Json<Value> {
    state.pairings.remove_by_planned_mount(&params.venue_id, &params.planned_mount_id).await;
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
pub struct VenueOnlyParams {
    #[serde(rename = "venueId")]
    pub venue_id: String,
}

pub async fn cleanup_orphaned_pairings(State(state): State<Arc<AppState>>, Query(params): Query<VenueOnlyParams>) -> Json<Value> {
    let removed = state.pairings.sweep_orphans(&params.venue_id).await;
    Json(json!({ "removed": removed }))
}

// --- C7: deployment ---

pub async fn deploy(State(state): State<Arc<AppState>>, Path(gateway_id): Path<String>, Json(body): Json<VenueOnlyParams>) -> Result<Json<Value>, ApiError> {
    let result = state.deploy.apply(&body.venue_id, &gateway_id).await?;
    Ok(Json(json!({
        "deploymentId": result.deployment_id,
        "bundleHash": result.bundle_hash,
        "appliedBundleHash": result.applied_bundle_hash,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfigParams {
    pub venue_id: String,
    pub gateway_id: String,
}

pub async fn export_config(State(state): State<Arc<AppState>>, Query(params): Query<ExportConfigParams>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.deploy.export_config(&params.venue_id, &params.gateway_id).await?))
}

pub async fn deploy_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<Value> {
    let venue_id = params.get("venueId").map(|s| s.as_str());
    Json(json!(state.deploy.list_history(venue_id).await))
}

// --- commissioned sensors / address pool ---

pub async fn list_commissioned(State(state): State<Arc<AppState>>, Query(params): Query<VenueOnlyParams>) -> Json<Value> {
    Json(json!(state.store.list_commissioned(&params.venue_id).await))
}

pub async fn insert_commissioned(State(state): State<Arc<AppState>>, Json(sensor): Json<CommissionedSensor>) -> Json<Value> {
    Json(json!(state.store.insert_commissioned(sensor).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextIpParams {
    pub venue_id: String,
    pub address_base: String,
}

pub async fn next_available_ip(State(state): State<Arc<AppState>>, Query(params): Query<NextIpParams>) -> Result<Json<Value>, ApiError> {
    let address = state.store.next_available_address(&params.venue_id, &params.address_base).await?;
    Ok(Json(json!({ "address": address })))
}

// --- placements ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementsParams {
    pub venue_id: String,
    pub layout_id: String,
}

pub async fn list_placements(State(state): State<Arc<AppState>>, Query(params): Query<PlacementsParams>) -> Json<Value> {
    let mounts: Vec<PlannedMount> = state.store.list_planned_mounts(&params.venue_id, &params.layout_id).await;
    let roi: Option<RegionOfInterest> = state.store.get_roi(&params.venue_id, &params.layout_id).await;
    Json(json!({ "mounts": mounts, "roi": roi }))
}

pub async fn autoplace(State(state): State<Arc<AppState>>, Json(req): Json<AutoplaceRequest>) -> Result<Json<Value>, ApiError> {
    let response = state.placement.autoplace(req).await?;
    Ok(Json(json!(response)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateBody {
    pub venue_id: String,
    pub layout_id: String,
    pub roi_polygon: Vec<Vertex2>,
    pub effective_radius: f64,
    pub hfov_deg: f64,
    #[serde(default)]
    pub obstacles: Vec<ObstacleFootprint>,
    #[serde(default)]
    pub los_enabled: bool,
}

pub async fn simulate(State(state): State<Arc<AppState>>, Json(body): Json<SimulateBody>) -> Json<Value> {
    let result = state
        .placement
        .simulate(
            &body.venue_id,
            &body.layout_id,
            &body.roi_polygon,
            body.effective_radius,
            body.hfov_deg,
            &body.obstacles,
            body.los_enabled,
        )
        .await;
    Json(json!(result))
}

// --- sensor model catalog ---

pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.store.list_sensor_models().await))
}

pub async fn upsert_model(State(state): State<Arc<AppState>>, Json(model): Json<SensorModel>) -> Json<Value> {
    state.store.upsert_sensor_model(model.clone()).await;
    Json(json!(model))
}

// --- C4: sensor address coordinator ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanBody {
    pub gateway_id: String,
    pub scan_address: String,
}

/// Read-only probe; may run concurrently with an in-flight `assign` for the
/// same venue, per spec.md §5.
pub async fn scan_sensor(
    State(state): State<Arc<AppState>>,
    Path(_venue_id): Path<String>,
    Json(body): Json<ScanBody>,
) -> Result<Json<Value>, ApiError> {
    let result = state.coordinator.scan(&body.gateway_id, &body.scan_address).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub gateway_id: String,
    pub scan_address: String,
    pub address_base: String,
}

pub async fn assign_sensor(
    State(state): State<Arc<AppState>>,
    Path(venue_id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<Value>, ApiError> {
    let sensor = state
        .coordinator
        .assign(&venue_id, &body.gateway_id, &body.scan_address, &body.address_base)
        .await?;
    Ok(Json(json!(sensor)))
}

pub async fn coordinator_status(State(state): State<Arc<AppState>>, Path(venue_id): Path<String>) -> Json<VenueCoordinatorStatus> {
    Json(state.coordinator.status(&venue_id).await)
}
