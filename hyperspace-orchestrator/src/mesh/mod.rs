//! Mesh Directory (C1): turns an external mesh-VPN status command into the
//! fleet's list of edge gateways.
//!
//! A `tokio::process::Command` invocation feeds a pure parse step, behind a
//! short TTL cache so a REST handler calling `list_gateways` on every render
//! doesn't refork the status command.

use crate::config::OrchestratorConfig;
use crate::store::Store;
use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::EdgeGateway;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::RwLock;

const CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
struct MeshPeer {
    hostname: String,
    addresses: Vec<String>,
    online: bool,
    #[serde(default)]
    tags: Vec<String>,
}

struct Cached {
    fetched_at: Instant,
    peers: Vec<MeshPeer>,
}

pub struct MeshDirectory {
    config: Arc<OrchestratorConfig>,
    store: Arc<Store>,
    cache: RwLock<Option<Cached>>,
}

impl MeshDirectory {
    pub fn new(config: Arc<OrchestratorConfig>, store: Arc<Store>) -> Self {
        Self {
            config,
            store,
            cache: RwLock::new(None),
        }
    }

    async fn fetch_peers(&self) -> Result<Vec<MeshPeer>, OrchestratorError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < CACHE_TTL {
                    return Ok(cached.peers.clone());
                }
            }
        }

        let peers = match self.run_status_command().await {
            Ok(peers) => peers,
            Err(e) => {
                if self.config.feature_mock_mesh {
                    log::warn!("mesh: status command unavailable ({e}), serving mock directory");
                    mock_peers()
                } else {
                    return Err(OrchestratorError::DirectoryUnavailable(e.to_string()));
                }
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(Cached {
            fetched_at: Instant::now(),
            peers: peers.clone(),
        });
        Ok(peers)
    }

    async fn run_status_command(&self) -> anyhow::Result<Vec<MeshPeer>> {
        let command = self
            .config
            .mesh_status_command
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no mesh status command configured"))?;

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("mesh status command is empty"))?;
        let args: Vec<&str> = parts.collect();

        let output = Command::new(program).args(&args).output().await?;
        if !output.status.success() {
            anyhow::bail!(
                "mesh status command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let peers: Vec<MeshPeer> = serde_json::from_slice(&output.stdout)?;
        Ok(peers)
    }

    fn is_fleet_gateway(&self, peer: &MeshPeer) -> bool {
        let hostname_match = self
            .config
            .edge_hostname_patterns
            .iter()
            .any(|pattern| peer.hostname.contains(pattern.as_str()));
        let tag_match = peer.tags.iter().any(|t| self.config.edge_tags.contains(t));
        hostname_match || tag_match
    }

    /// Union of the live mesh snapshot with persisted `displayName`
    /// overrides, per spec.md §4.1.
    pub async fn list_gateways(&self) -> Result<Vec<EdgeGateway>, OrchestratorError> {
        let peers = self.fetch_peers().await?;
        let mut gateways = Vec::new();
        for peer in peers.iter().filter(|p| self.is_fleet_gateway(p)) {
            let Some(mesh_address) = peer.addresses.first().cloned() else {
                continue;
            };
            let gateway_id = peer.hostname.clone();
            let override_ = self.store.get_gateway_override(&gateway_id).await;
            gateways.push(EdgeGateway {
                gateway_id,
                hostname_hint: peer.hostname.clone(),
                mesh_address,
                display_name: override_.map(|o| o.display_name),
                online: peer.online,
                last_seen_ts: chrono::Utc::now().timestamp(),
            });
        }
        Ok(gateways)
    }

    /// Gate used before any RPC to a gateway: offline is returned as an
    /// explicit failure rather than retried, per spec.md §4.1.
    pub async fn resolve(&self, gateway_id: &str) -> Result<EdgeGateway, OrchestratorError> {
        let gateways = self.list_gateways().await?;
        let gateway = gateways
            .into_iter()
            .find(|g| g.gateway_id == gateway_id)
            .ok_or_else(|| OrchestratorError::NotFound(format!("gateway '{gateway_id}' not in mesh directory")))?;
        if !gateway.online {
            return Err(OrchestratorError::GatewayOffline(gateway_id.to_string()));
        }
        Ok(gateway)
    }

    pub async fn rename_gateway(
        &self,
        gateway_id: &str,
        display_name: String,
        notes: Option<String>,
    ) {
        self.store.set_gateway_override(gateway_id, display_name, notes).await;
    }
}

fn mock_peers() -> Vec<MeshPeer> {
    vec![
        MeshPeer {
            hostname: "hyperspace-edge-01".to_string(),
            addresses: vec!["100.64.0.11".to_string()],
            online: true,
            tags: vec!["hyperspace".to_string()],
        },
        MeshPeer {
            hostname: "hyperspace-edge-02".to_string(),
            addresses: vec!["100.64.0.12".to_string()],
            online: false,
            tags: vec!["hyperspace".to_string()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(mock: bool) -> Arc<OrchestratorConfig> {
        Arc::new(OrchestratorConfig {
            feature_mock_mesh: mock,
            mesh_status_command: None,
            ..OrchestratorConfig::default()
        })
    }

    fn test_store() -> Arc<Store> {
        let dir = std::env::temp_dir().join(format!("hyperspace-mesh-test-{}", uuid::Uuid::new_v4()));
        Arc::new(Store::load(dir.to_str().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn falls_back_to_mock_when_command_missing_and_flag_set() {
        let directory = MeshDirectory::new(test_config(true), test_store());
        let gateways = directory.list_gateways().await.unwrap();
        assert_eq!(gateways.len(), 2);
        assert!(gateways.iter().any(|g| g.online));
        assert!(gateways.iter().any(|g| !g.online));
    }

    #[tokio::test]
    async fn errors_as_directory_unavailable_without_mock_fallback() {
        let directory = MeshDirectory::new(test_config(false), test_store());
        let result = directory.list_gateways().await;
        assert!(matches!(result, Err(OrchestratorError::DirectoryUnavailable(_))));
    }

    #[tokio::test]
    async fn resolve_reports_offline_gateways_as_an_explicit_error() {
        let directory = MeshDirectory::new(test_config(true), test_store());
        let err = directory.resolve("hyperspace-edge-02").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::GatewayOffline(_)));
    }

    #[tokio::test]
    async fn rename_gateway_persists_independent_of_online_state() {
        let directory = MeshDirectory::new(test_config(true), test_store());
        directory
            .rename_gateway("hyperspace-edge-02", "Loading Dock".to_string(), None)
            .await;
        let gateways = directory.list_gateways().await.unwrap();
        let renamed = gateways.iter().find(|g| g.gateway_id == "hyperspace-edge-02").unwrap();
        assert_eq!(renamed.display_name.as_deref(), Some("Loading Dock"));
    }
}
