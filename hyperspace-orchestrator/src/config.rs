use serde::{Deserialize, Serialize};

/// Resolved at startup from the environment and handed out as an immutable
/// `Arc` snapshot. Nothing in this process mutates a config in place — a
/// future reload would swap the `Arc` rather than mutate through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub http_bind_port: u16,

    pub edge_port: u16,
    pub edge_ws_port: u16,
    pub edge_hostname_patterns: Vec<String>,
    pub edge_tags: Vec<String>,

    pub solver_url: Option<String>,
    pub mqtt_broker_url: String,

    pub mesh_status_command: Option<String>,
    pub feature_mock_mesh: bool,
    pub feature_solver: bool,

    pub state_dir: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            http_bind_port: 3000,

            edge_port: 8080,
            edge_ws_port: 8081,
            edge_hostname_patterns: vec!["hyperspace-edge".to_string()],
            edge_tags: vec!["hyperspace".to_string()],

            solver_url: None,
            mqtt_broker_url: "mqtt://localhost:1883".to_string(),

            mesh_status_command: None,
            feature_mock_mesh: false,
            feature_solver: true,

            state_dir: "./data".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("HTTP_BIND_PORT") {
            if let Ok(p) = v.parse() {
                config.http_bind_port = p;
            }
        }
        if let Ok(v) = std::env::var("EDGE_PORT") {
            if let Ok(p) = v.parse() {
                config.edge_port = p;
            }
        }
        if let Ok(v) = std::env::var("EDGE_WS_PORT") {
            if let Ok(p) = v.parse() {
                config.edge_ws_port = p;
            }
        }
        if let Ok(v) = std::env::var("EDGE_HOSTNAME_PATTERNS") {
            config.edge_hostname_patterns = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("SOLVER_URL") {
            config.solver_url = Some(v);
        }
        if let Ok(v) = std::env::var("MQTT_BROKER_URL") {
            config.mqtt_broker_url = v;
        }
        if let Ok(v) = std::env::var("MESH_STATUS_COMMAND") {
            config.mesh_status_command = Some(v);
        }
        if let Ok(v) = std::env::var("FEATURE_MOCK_MESH") {
            config.feature_mock_mesh = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("FEATURE_SOLVER") {
            config.feature_solver = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        if let Ok(v) = std::env::var("STATE_DIR") {
            config.state_dir = v;
        }

        config
    }

    pub fn gateway_base_url(&self, mesh_address: &str) -> String {
        format!("http://{}:{}/api/edge", mesh_address, self.edge_port)
    }

    pub fn gateway_ws_url(&self, mesh_address: &str, ip: &str, model: &str, downsample: u32) -> String {
        format!(
            "ws://{}:{}/?ip={}&model={}&downsample={}",
            mesh_address, self.edge_ws_port, ip, model, downsample
        )
    }
}
