//! Deployment Engine (C7): assembles the extrinsics bundle for a
//! `(venue, gateway)` pair and applies or exports it, per spec.md §4.7.
//!
//! Applying a deployment builds the record and persists it under one write
//! guard via [`crate::store::Store::append_deployment_record`] regardless of
//! whether the RPC to the gateway succeeded, so the history always reflects
//! what was actually attempted.

use crate::config::OrchestratorConfig;
use crate::edge_rpc::{EdgeRpcClient, Method};
use crate::frame::FrameTransformer;
use crate::mesh::MeshDirectory;
use crate::store::Store;
use hyperspace_protocol::bundle::{
    CoordinateFrame, DwgCoordinates, Extrinsics, ExtrinsicsBundle, LidarEntry, LidarModelInfo, MqttTarget,
    OperationalParams, RoiOffset as BundleRoiOffset, RoiVertexM, VenueBounds as BundleVenueBounds,
};
use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::{DeploymentRecord, DeploymentStatus};
use std::sync::Arc;
use uuid::Uuid;

const APPLY_DEADLINE: std::time::Duration = std::time::Duration::from_secs(15);
const MQTT_EXPORT_PLACEHOLDER: &str = "<mqtt-broker-configured-on-site>";
const MIN_DETECTION_HEIGHT_M: f64 = 0.3;
const MAX_DETECTION_HEIGHT_M: f64 = 2.2;
const PUBLISH_RATE_HZ: f64 = 10.0;

pub struct ApplyResult {
    pub deployment_id: String,
    pub bundle_hash: String,
    pub applied_bundle_hash: String,
}

pub struct DeploymentEngine {
    config: Arc<OrchestratorConfig>,
    mesh: Arc<MeshDirectory>,
    rpc: Arc<EdgeRpcClient>,
    store: Arc<Store>,
}

impl DeploymentEngine {
    pub fn new(config: Arc<OrchestratorConfig>, mesh: Arc<MeshDirectory>, rpc: Arc<EdgeRpcClient>, store: Arc<Store>) -> Self {
        Self { config, mesh, rpc, store }
    }

    async fn build_bundle(&self, venue_id: &str, gateway_id: &str) -> Result<ExtrinsicsBundle, OrchestratorError> {
        let venue = self
            .store
            .get_venue(venue_id)
            .await
            .ok_or_else(|| OrchestratorError::NotFound(format!("venue '{venue_id}' not found")))?;
        let layout_id = venue
            .active_layout_id
            .clone()
            .ok_or_else(|| OrchestratorError::BadRequest("venue has no active layout".to_string()))?;

        let roi = self.store.get_roi(venue_id, &layout_id).await;
        let mounts = self.store.list_planned_mounts(venue_id, &layout_id).await;
        let pairings = self.store.list_pairings(venue_id, Some(gateway_id)).await;

        let offset = FrameTransformer::resolve_offset(roi.as_ref(), &mounts, &venue);
        let bounds = FrameTransformer::venue_bounds(roi.as_ref(), &mounts, &venue);

        let mut lidars = Vec::new();
        for pairing in &pairings {
            let Some(mount) = mounts.iter().find(|m| m.id == pairing.planned_mount_id) else {
                log::warn!(
                    "deploy: pairing {} references unresolved planned mount {}, skipping",
                    pairing.id,
                    pairing.planned_mount_id
                );
                continue;
            };
            let Some(model) = self.store.get_sensor_model(&mount.model_id).await else {
                log::warn!("deploy: mount {} references unknown sensor model {}, skipping", mount.id, mount.model_id);
                continue;
            };
            let Some(sensor_address) = pairing.sensor_address.clone() else {
                log::warn!("deploy: pairing {} has no resolved sensor address, skipping", pairing.id);
                continue;
            };

            let transformed = FrameTransformer::transform_mount(mount, offset);
            lidars.push(LidarEntry {
                lidar_id: pairing.sensor_id.clone(),
                ip: sensor_address,
                model: LidarModelInfo {
                    label: model.label.clone(),
                    hfov: model.hfov_deg,
                    vfov: model.vfov_deg,
                    range: model.range_m,
                    dome_mode: model.dome_mode,
                },
                extrinsics: Extrinsics {
                    x_m: transformed.x_m,
                    y_m: transformed.y_m,
                    z_m: transformed.z_m,
                    yaw_deg: transformed.yaw_deg,
                    pitch_deg: 0.0,
                    roll_deg: 0.0,
                },
                dwg_coordinates: DwgCoordinates {
                    x_m: mount.position.x,
                    z_m: mount.position.z,
                },
            });
        }

        if lidars.is_empty() {
            return Err(OrchestratorError::BadRequest(
                "no valid lidars remain after resolving pairings".to_string(),
            ));
        }

        let roi_vertices = roi.as_ref().map(|roi| {
            FrameTransformer::transform_roi_vertices(roi, offset)
                .into_iter()
                .map(|v| RoiVertexM { x_m: v.x, z_m: v.z })
                .collect::<Vec<_>>()
        });

        Ok(ExtrinsicsBundle {
            deployment_id: Uuid::new_v4().to_string(),
            gateway_id: gateway_id.to_string(),
            venue_id: venue_id.to_string(),
            mqtt: MqttTarget {
                broker: self.config.mqtt_broker_url.clone(),
                topic: format!("hyperspace/trajectories/{gateway_id}"),
                qos: 1,
            },
            lidars,
            coordinate_frame: CoordinateFrame {
                origin: "ROI SW corner at floor level".to_string(),
                roi_offset: BundleRoiOffset { x: offset.x, z: offset.z },
                axis: "X-East, Y-Up, Z-North".to_string(),
                units: "meters".to_string(),
            },
            venue_bounds: BundleVenueBounds {
                width: bounds.width,
                depth: bounds.depth,
                min_x: 0.0,
                max_x: bounds.width,
                min_z: 0.0,
                max_z: bounds.depth,
                floor_y: 0.0,
                ceiling_y: venue.dimensions.h,
            },
            roi_vertices,
            operational_params: OperationalParams {
                ground_plane_y: 0.0,
                ceiling_y: venue.dimensions.h,
                min_detection_height: MIN_DETECTION_HEIGHT_M,
                max_detection_height: MAX_DETECTION_HEIGHT_M,
                publish_rate_hz: PUBLISH_RATE_HZ,
            },
        })
    }

    /// Validates the gateway is online, POSTs the bundle, and writes a
    /// `DeploymentRecord` whether the apply succeeds or fails — the record
    /// is as durable as a success, per spec.md §4.7.
    pub async fn apply(&self, venue_id: &str, gateway_id: &str) -> Result<ApplyResult, OrchestratorError> {
        let gateway = self.mesh.resolve(gateway_id).await?;
        let bundle = self.build_bundle(venue_id, gateway_id).await?;
        let bundle_value = bundle.to_value();
        let bundle_hash = hyperspace_protocol::bundle::hash_bundle(&bundle_value);

        let record_id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().timestamp();

        match self
            .rpc
            .call(&gateway, "/config/apply", Method::Post, Some(bundle_value.clone()), APPLY_DEADLINE, &self.config)
            .await
        {
            Ok(gateway_response) => {
                let applied_bundle_hash = gateway_response
                    .get("appliedConfigHash")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| bundle_hash.clone());

                self.store
                    .append_deployment_record(DeploymentRecord {
                        id: record_id.clone(),
                        venue_id: venue_id.to_string(),
                        gateway_id: gateway_id.to_string(),
                        bundle_hash: bundle_hash.clone(),
                        bundle: bundle_value,
                        status: DeploymentStatus::Applied,
                        gateway_response: Some(gateway_response),
                        error_message: None,
                        created_at,
                    })
                    .await;

                Ok(ApplyResult {
                    deployment_id: record_id,
                    bundle_hash,
                    applied_bundle_hash,
                })
            }
            Err(e) => {
                self.store
                    .append_deployment_record(DeploymentRecord {
                        id: record_id,
                        venue_id: venue_id.to_string(),
                        gateway_id: gateway_id.to_string(),
                        bundle_hash,
                        bundle: bundle_value,
                        status: DeploymentStatus::Failed,
                        gateway_response: None,
                        error_message: Some(e.to_string()),
                        created_at,
                    })
                    .await;
                Err(e)
            }
        }
    }

    /// Offline handoff: the same bundle with the MQTT broker replaced by a
    /// placeholder. No deployment record, no RPC, no side effects.
    pub async fn export_config(&self, venue_id: &str, gateway_id: &str) -> Result<serde_json::Value, OrchestratorError> {
        let mut bundle = self.build_bundle(venue_id, gateway_id).await?;
        bundle.mqtt.broker = MQTT_EXPORT_PLACEHOLDER.to_string();
        Ok(bundle.to_value())
    }

    pub async fn list_history(&self, venue_id: Option<&str>) -> Vec<DeploymentRecord> {
        self.store.list_deployment_records(venue_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperspace_protocol::model::{
        Dimensions, MountSource, Pairing, PlannedMount, Position, RegionOfInterest, SensorModel, Venue, Vertex2,
    };

    fn test_engine() -> DeploymentEngine {
        let config = Arc::new(OrchestratorConfig {
            feature_mock_mesh: true,
            mqtt_broker_url: "mqtt://broker.local:1883".to_string(),
            ..OrchestratorConfig::default()
        });
        let dir = std::env::temp_dir().join(format!("hyperspace-deploy-test-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(Store::load(dir.to_str().unwrap()).unwrap());
        let mesh = Arc::new(MeshDirectory::new(config.clone(), store.clone()));
        let rpc = Arc::new(EdgeRpcClient::new());
        DeploymentEngine::new(config, mesh, rpc, store)
    }

    async fn seed_one_paired_mount(engine: &DeploymentEngine) {
        engine
            .store
            .upsert_venue(Venue {
                id: "v1".to_string(),
                label: "Main Hall".to_string(),
                dimensions: Dimensions { w: 40.0, d: 30.0, h: 6.0 },
                active_layout_id: Some("l1".to_string()),
            })
            .await;
        engine
            .store
            .upsert_roi(RegionOfInterest {
                venue_id: "v1".to_string(),
                layout_id: "l1".to_string(),
                vertices: vec![
                    Vertex2 { x: 5.0, z: 5.0 },
                    Vertex2 { x: 5.0, z: 25.0 },
                    Vertex2 { x: 35.0, z: 25.0 },
                    Vertex2 { x: 35.0, z: 5.0 },
                ],
            })
            .await;
        engine
            .store
            .upsert_sensor_model(SensorModel {
                id: "model1".to_string(),
                label: "Ouster OS1".to_string(),
                hfov_deg: 360.0,
                vfov_deg: 45.0,
                range_m: 20.0,
                dome_mode: true,
            })
            .await;
        let mount = engine
            .store
            .insert_manual_mount(PlannedMount {
                id: String::new(),
                venue_id: "v1".to_string(),
                layout_id: "l1".to_string(),
                source: MountSource::Manual,
                model_id: "model1".to_string(),
                position: Position { x: 10.0, y: 0.0, z: 10.0 },
                yaw_rad: 0.0,
                mount_height_m: 2.5,
            })
            .await;
        engine
            .store
            .upsert_pairing(Pairing {
                id: String::new(),
                venue_id: "v1".to_string(),
                gateway_id: "hyperspace-edge-01".to_string(),
                planned_mount_id: mount.id,
                sensor_id: "lidar-1".to_string(),
                sensor_address: Some("192.168.1.201".to_string()),
            })
            .await;
    }

    #[tokio::test]
    async fn build_bundle_fails_with_no_paired_mounts() {
        let engine = test_engine();
        engine
            .store
            .upsert_venue(Venue {
                id: "v1".to_string(),
                label: "Empty Hall".to_string(),
                dimensions: Dimensions { w: 10.0, d: 10.0, h: 3.0 },
                active_layout_id: Some("l1".to_string()),
            })
            .await;
        let result = engine.build_bundle("v1", "hyperspace-edge-01").await;
        assert!(matches!(result, Err(OrchestratorError::BadRequest(_))));
    }

    #[tokio::test]
    async fn build_bundle_translates_into_roi_local_frame() {
        let engine = test_engine();
        seed_one_paired_mount(&engine).await;

        let bundle = engine.build_bundle("v1", "hyperspace-edge-01").await.unwrap();
        assert_eq!(bundle.lidars.len(), 1);
        assert_eq!(bundle.lidars[0].extrinsics.x_m, 5.0);
        assert_eq!(bundle.lidars[0].extrinsics.z_m, 5.0);
        assert_eq!(bundle.venue_bounds.width, 30.0);
        assert_eq!(bundle.venue_bounds.depth, 20.0);
        assert_eq!(bundle.mqtt.topic, "hyperspace/trajectories/hyperspace-edge-01");
    }

    #[tokio::test]
    async fn export_config_replaces_broker_without_writing_a_record() {
        let engine = test_engine();
        seed_one_paired_mount(&engine).await;

        let exported = engine.export_config("v1", "hyperspace-edge-01").await.unwrap();
        assert_eq!(exported["mqtt"]["broker"], MQTT_EXPORT_PLACEHOLDER);
        assert!(engine.list_history(Some("v1")).await.is_empty());
    }
}
