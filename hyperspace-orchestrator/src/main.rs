//! Entry point for the edge commissioning orchestrator.
//!
//! Boot sequence: init logging, load config from the environment, load
//! persisted state from disk, wire the component graph, bind and serve.

mod api;
mod config;
mod coordinator;
mod deploy;
mod edge_rpc;
mod frame;
mod mesh;
mod pairing;
mod placement;
mod relay;
mod store;

use api::AppState;
use config::OrchestratorConfig;
use coordinator::SensorAddressCoordinator;
use deploy::DeploymentEngine;
use edge_rpc::EdgeRpcClient;
use mesh::MeshDirectory;
use pairing::PairingStore;
use placement::PlacementSolver;
use std::sync::Arc;
use store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Arc::new(OrchestratorConfig::from_env());
    log::info!("loaded config: state_dir={}", config.state_dir);

    let store = Arc::new(Store::load(&config.state_dir)?);
    let mesh = Arc::new(MeshDirectory::new(config.clone(), store.clone()));
    let rpc = Arc::new(EdgeRpcClient::new());
    let coordinator = Arc::new(SensorAddressCoordinator::new(
        config.clone(),
        mesh.clone(),
        rpc.clone(),
        store.clone(),
    ));
    let pairings = Arc::new(PairingStore::new(store.clone()));
    let deploy = Arc::new(DeploymentEngine::new(config.clone(), mesh.clone(), rpc.clone(), store.clone()));
    let placement = Arc::new(PlacementSolver::new(config.clone(), store.clone()));

    let state = Arc::new(AppState {
        config,
        mesh,
        rpc,
        coordinator,
        pairings,
        deploy,
        placement,
        store,
        http: reqwest::Client::new(),
    });

    api::run(state).await
}
