//! Point-Cloud Relay (C3): a snapshot proxy and a bidirectional WebSocket
//! relay in front of an edge gateway's point-cloud endpoints.
//!
//! The WS side accepts an `axum::extract::ws::WebSocketUpgrade` into a
//! per-connection task, opens an upstream `tokio-tungstenite` connection to
//! the gateway, and forwards frames in both directions until either side
//! closes.

use crate::api::AppState;
use axum::extract::ws::{CloseFrame, Message as AxumMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotParams {
    pub gateway_address: String,
    pub sensor_address: String,
    #[serde(default = "default_format")]
    pub format: String,
    pub duration: Option<u32>,
    pub max_points: Option<u32>,
    pub downsample: Option<u32>,
    pub model_hint: Option<String>,
}

fn default_format() -> String {
    "json".to_string()
}

const SNAPSHOT_DEADLINE: std::time::Duration = std::time::Duration::from_secs(15);

/// GET/POST `/pcl/snapshot` — forwards to the gateway's snapshot endpoint
/// and preserves response framing exactly, per spec.md §4.3.
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SnapshotParams>,
) -> Response {
    let gateway = match state.mesh.resolve(&params.gateway_address).await {
        Ok(g) => g,
        Err(e) => return crate::api::error::ApiError(e).into_response(),
    };

    let mut url = format!(
        "{}/pcl/snapshot?sensorAddress={}&format={}",
        state.config.gateway_base_url(&gateway.mesh_address),
        params.sensor_address,
        params.format,
    );
    if let Some(d) = params.duration {
        url.push_str(&format!("&duration={d}"));
    }
    if let Some(m) = params.max_points {
        url.push_str(&format!("&maxPoints={m}"));
    }
    if let Some(d) = params.downsample {
        url.push_str(&format!("&downsample={d}"));
    }
    if let Some(h) = &params.model_hint {
        url.push_str(&format!("&modelHint={h}"));
    }

    let response = match tokio::time::timeout(SNAPSHOT_DEADLINE, state.http.get(&url).send()).await {
        Ok(Ok(r)) => r,
        Ok(Err(e)) => {
            return crate::api::error::ApiError(hyperspace_protocol::error::OrchestratorError::RemoteError {
                status: 0,
                body: e.to_string(),
            })
            .into_response()
        }
        Err(_) => {
            return crate::api::error::ApiError(hyperspace_protocol::error::OrchestratorError::Timeout)
                .into_response()
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let point_count = response
        .headers()
        .get("x-point-count")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match params.format.as_str() {
        "binary" => {
            let bytes = response.bytes().await.unwrap_or_default();
            let mut builder = Response::builder()
                .status(status.as_u16())
                .header(header::CONTENT_TYPE, "application/octet-stream");
            if let Some(pc) = point_count {
                builder = builder.header("X-Point-Count", pc);
            }
            builder.body(axum::body::Body::from(bytes)).unwrap().into_response()
        }
        "ply" => {
            let text = response.text().await.unwrap_or_default();
            let filename = format!("{}.ply", params.sensor_address.replace('.', "_"));
            Response::builder()
                .status(status.as_u16())
                .header(header::CONTENT_TYPE, "text/plain")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                )
                .body(axum::body::Body::from(text))
                .unwrap()
                .into_response()
        }
        _ => {
            // json: decode/re-encode is permitted (spec.md §4.3).
            let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
            let mut builder = Response::builder().status(status.as_u16());
            if let Some(ct) = content_type {
                builder = builder.header(header::CONTENT_TYPE, ct);
            } else {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
            }
            builder
                .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap_or_default()))
                .unwrap()
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    pub gateway_address: Option<String>,
    pub sensor_address: Option<String>,
    pub model_hint: Option<String>,
    pub downsample: Option<u32>,
}

/// GET `/ws/pcl` — bidirectional relay between the client socket and the
/// gateway's point-cloud WebSocket, per spec.md §4.3.
pub async fn ws_pcl(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Response {
    let (Some(gateway_address), Some(sensor_address)) =
        (params.gateway_address.clone(), params.sensor_address.clone())
    else {
        return ws
            .on_upgrade(move |socket| close_with_missing_params(socket))
            .into_response();
    };

    let model_hint = params.model_hint.clone().unwrap_or_default();
    let downsample = params.downsample.unwrap_or(1);

    ws.on_upgrade(move |socket| {
        relay_socket(socket, state, gateway_address, sensor_address, model_hint, downsample)
    })
    .into_response()
}

async fn close_with_missing_params(mut socket: WebSocket) {
    let frame = serde_json::json!({
        "type": "error",
        "error": "gatewayAddress and sensorAddress are required",
    });
    let _ = socket
        .send(AxumMessage::Text(frame.to_string()))
        .await;
    let _ = socket
        .send(AxumMessage::Close(Some(CloseFrame {
            code: 1008,
            reason: "missing required parameters".into(),
        })))
        .await;
}

async fn relay_socket(
    mut client: WebSocket,
    state: Arc<AppState>,
    gateway_address: String,
    sensor_address: String,
    model_hint: String,
    downsample: u32,
) {
    let gateway = match state.mesh.resolve(&gateway_address).await {
        Ok(g) => g,
        Err(e) => {
            let frame = serde_json::json!({"type": "error", "error": e.to_string()});
            let _ = client.send(AxumMessage::Text(frame.to_string())).await;
            return;
        }
    };

    let connected = serde_json::json!({
        "type": "connected",
        "gatewayAddress": gateway_address,
        "sensorAddress": sensor_address,
    });
    if client.send(AxumMessage::Text(connected.to_string())).await.is_err() {
        return;
    }

    let upstream_url = state
        .config
        .gateway_ws_url(&gateway.mesh_address, &sensor_address, &model_hint, downsample);

    let upstream = match tokio_tungstenite::connect_async(&upstream_url).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let frame = serde_json::json!({"type": "error", "error": e.to_string()});
            let _ = client.send(AxumMessage::Text(frame.to_string())).await;
            return;
        }
    };

    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let (mut client_tx, mut client_rx) = client.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let forwarded = match msg {
                AxumMessage::Text(t) => UpstreamMessage::Text(t),
                AxumMessage::Binary(b) => UpstreamMessage::Binary(b),
                AxumMessage::Close(_) => break,
                _ => continue,
            };
            if upstream_tx.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(msg) = upstream_rx.next().await {
            let forwarded = match msg {
                Ok(UpstreamMessage::Text(t)) => AxumMessage::Text(t),
                Ok(UpstreamMessage::Binary(b)) => AxumMessage::Binary(b),
                Ok(UpstreamMessage::Close(_)) | Err(_) => break,
                _ => continue,
            };
            if client_tx.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_json() {
        assert_eq!(default_format(), "json");
    }

    #[test]
    fn snapshot_params_deserialize_from_json_shape() {
        let v = serde_json::json!({
            "gatewayAddress": "hyperspace-edge-01",
            "sensorAddress": "192.168.1.201",
            "format": "binary",
        });
        let params: SnapshotParams = serde_json::from_value(v).unwrap();
        assert_eq!(params.format, "binary");
        assert_eq!(params.sensor_address, "192.168.1.201");
    }
}
