//! HTTP/WebSocket surface, per spec.md §6.
//!
//! One `AppState` struct cloned into every handler via axum's `State`
//! extractor, one `Router` built with `.route(...)` chains and a single
//! `CorsLayer`.

pub mod error;
pub mod routes;

use crate::config::OrchestratorConfig;
use crate::coordinator::SensorAddressCoordinator;
use crate::deploy::DeploymentEngine;
use crate::edge_rpc::EdgeRpcClient;
use crate::mesh::MeshDirectory;
use crate::pairing::PairingStore;
use crate::placement::PlacementSolver;
use crate::relay;
use crate::store::Store;
use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub config: Arc<OrchestratorConfig>,
    pub mesh: Arc<MeshDirectory>,
    pub rpc: Arc<EdgeRpcClient>,
    pub coordinator: Arc<SensorAddressCoordinator>,
    pub pairings: Arc<PairingStore>,
    pub deploy: Arc<DeploymentEngine>,
    pub placement: Arc<PlacementSolver>,
    pub store: Arc<Store>,
    pub http: reqwest::Client,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/edge/scan", get(routes::list_gateways))
        .route("/edge/:id/name", put(routes::rename_gateway))
        .route("/edge/:id/inventory", get(routes::gateway_inventory))
        .route("/edge/:id/scan-lidars", post(routes::scan_lidars))
        .route("/edge/:id/status", get(routes::gateway_status))
        .route("/edge/:id/deploy", post(routes::deploy))
        .route("/pcl/snapshot", get(relay::snapshot).post(relay::snapshot))
        .route("/ws/pcl", get(relay::ws_pcl))
        .route(
            "/pairings",
            get(routes::list_pairings).post(routes::upsert_pairing).delete(routes::delete_pairing),
        )
        .route("/pairings/cleanup-orphaned", delete(routes::cleanup_orphaned_pairings))
        .route("/export-config", get(routes::export_config))
        .route("/deploy-history", get(routes::deploy_history))
        .route(
            "/commissioned-lidars",
            get(routes::list_commissioned).post(routes::insert_commissioned),
        )
        .route("/next-available-ip", get(routes::next_available_ip))
        .route("/placements", get(routes::list_placements))
        .route("/autoplace", post(routes::autoplace))
        .route("/simulate", post(routes::simulate))
        .route("/models", get(routes::list_models).post(routes::upsert_model).put(routes::upsert_model))
        .route("/venues/:venueId/scan", post(routes::scan_sensor))
        .route("/venues/:venueId/assign", post(routes::assign_sensor))
        .route("/venues/:venueId/coordinator-status", get(routes::coordinator_status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let port = state.config.http_bind_port;
    let app = build_router(state);
    let addr = format!("0.0.0.0:{port}");
    log::info!("hyperspace-orchestrator listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let config = Arc::new(OrchestratorConfig {
            feature_mock_mesh: true,
            ..OrchestratorConfig::default()
        });
        let dir = std::env::temp_dir().join(format!("hyperspace-api-test-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(Store::load(dir.to_str().unwrap()).unwrap());
        let mesh = Arc::new(MeshDirectory::new(config.clone(), store.clone()));
        let rpc = Arc::new(EdgeRpcClient::new());
        let coordinator = Arc::new(SensorAddressCoordinator::new(config.clone(), mesh.clone(), rpc.clone(), store.clone()));
        let pairings = Arc::new(PairingStore::new(store.clone()));
        let deploy = Arc::new(DeploymentEngine::new(config.clone(), mesh.clone(), rpc.clone(), store.clone()));
        let placement = Arc::new(PlacementSolver::new(config.clone(), store.clone()));
        Arc::new(AppState {
            config,
            mesh,
            rpc,
            coordinator,
            pairings,
            deploy,
            placement,
            store,
            http: reqwest::Client::new(),
        })
    }

    #[tokio::test]
    async fn health_route_returns_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(axum::http::Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn edge_scan_lists_mock_gateways_when_directory_unavailable() {
        let app = build_router(test_state());
        let response = app
            .oneshot(axum::http::Request::builder().uri("/edge/scan").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn pairings_missing_venue_id_is_bad_request() {
        let app = build_router(test_state());
        let response = app
            .oneshot(axum::http::Request::builder().uri("/pairings").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
