//! Edge RPC Client (C2): the thin, deadline-mandatory contract every call
//! out to an edge gateway goes through.
//!
//! Wraps a single `reqwest::Client` behind a small, typed surface rather
//! than sprinkling `reqwest::get` calls through the codebase. The deadline
//! is per-call, not fixed at client construction, since spec.md §4.2 gives
//! reads, LAN scans, and reboot-inducing operations three different
//! deadlines.

use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::EdgeGateway;
use serde_json::Value;
use std::time::Duration;

/// Reads: directory listing, status polling.
pub const READ_DEADLINE: Duration = Duration::from_secs(10);
/// LAN scans for unclaimed sensors.
pub const SCAN_DEADLINE: Duration = Duration::from_secs(30);
/// Operations that may induce a sensor reboot (set-address).
pub const REBOOT_DEADLINE: Duration = Duration::from_secs(45);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// The set-address call treats a timeout as the expected success signal
/// (spec.md §4.2) rather than as an `OrchestratorError::Timeout` — this
/// variant keeps that distinction out of the error type entirely.
#[derive(Debug)]
pub enum SetAddressOutcome {
    Applied(Value),
    RebootDetected,
}

pub struct EdgeRpcClient {
    http: reqwest::Client,
}

impl EdgeRpcClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .build()
                .expect("reqwest client with default TLS backend must build"),
        }
    }

    /// Generic request gated by an explicit `deadline`; cancellation of the
    /// enclosing future drops the in-flight `reqwest` request, which tears
    /// down the connection rather than leaking it.
    pub async fn call(
        &self,
        gateway: &EdgeGateway,
        path: &str,
        method: Method,
        body: Option<Value>,
        deadline: Duration,
        config: &crate::config::OrchestratorConfig,
    ) -> Result<Value, OrchestratorError> {
        let url = format!("{}{}", config.gateway_base_url(&gateway.mesh_address), path);

        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let request = match &body {
            Some(b) => request.json(b),
            None => request,
        };

        let response = match tokio::time::timeout(deadline, request.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(OrchestratorError::RemoteError {
                status: 0,
                body: e.to_string(),
            }),
            Err(_) => return Err(OrchestratorError::Timeout),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::RemoteError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OrchestratorError::RemoteError {
                status: status.as_u16(),
                body: e.to_string(),
            })
    }

    /// Set-address: a deadline timeout here means the sensor rebooted out
    /// from under the socket, which is the expected outcome, not a failure.
    pub async fn set_address(
        &self,
        gateway: &EdgeGateway,
        body: Value,
        config: &crate::config::OrchestratorConfig,
    ) -> Result<SetAddressOutcome, OrchestratorError> {
        match self
            .call(gateway, "/sensors/set-address", Method::Post, Some(body), REBOOT_DEADLINE, config)
            .await
        {
            Ok(v) => Ok(SetAddressOutcome::Applied(v)),
            Err(OrchestratorError::Timeout) => Ok(SetAddressOutcome::RebootDetected),
            Err(e) => Err(e),
        }
    }
}

impl Default for EdgeRpcClient {
    fn default() -> Self {
        Self::new()
    }
}
