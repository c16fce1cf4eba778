//! The shared, venue-scoped record store.
//!
//! Spec.md explicitly leaves the relational schema out of scope (§1) and
//! only names the logical entities (§3). This store keeps those entities as
//! in-process tables behind a single `tokio::sync::RwLock`, snapshotted to
//! disk on every mutation via [`persistence`]. A single write-guard
//! acquisition covers a whole multi-step aggregate mutation (pairing
//! upsert, deploy-record-plus-history, planned-mount
//! replace-plus-run-record), which is what spec.md §5 asks the storage
//! layer for instead of a real SQL transaction.

mod persistence;

use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::{
    CommissionedSensor, DeploymentRecord, GatewayId, Pairing, PlannedMount, RegionOfInterest,
    SensorModel, SensorStatus, Venue, VenueId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlacementRunRecord {
    pub id: String,
    pub venue_id: VenueId,
    pub layout_id: String,
    pub settings: serde_json::Value,
    pub coverage_pct: f64,
    pub k_coverage_pct: f64,
    pub sensor_count: usize,
    pub solver_status: String,
    pub warnings: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayOverride {
    pub display_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    venues: HashMap<VenueId, Venue>,
    gateway_overrides: HashMap<GatewayId, GatewayOverride>,
    sensor_models: HashMap<String, SensorModel>,
    planned_mounts: HashMap<String, PlannedMount>,
    pairings: HashMap<String, Pairing>,
    commissioned_sensors: HashMap<String, CommissionedSensor>,
    rois: HashMap<String, RegionOfInterest>,
    deployment_records: Vec<DeploymentRecord>,
    placement_runs: Vec<PlacementRunRecord>,
}

fn roi_key(venue_id: &str, layout_id: &str) -> String {
    format!("{venue_id}:{layout_id}")
}

pub struct Store {
    data: RwLock<StoreData>,
    path: PathBuf,
}

impl Store {
    pub fn load(state_dir: &str) -> anyhow::Result<Self> {
        let path = PathBuf::from(state_dir).join("state.json");
        let data = persistence::load_state(&path)?;
        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    async fn persist(&self, data: &StoreData) {
        if let Err(e) = persistence::save_state(&self.path, data) {
            log::error!("store: failed to persist state snapshot: {e}");
        }
    }

    // --- Venues ---

    pub async fn upsert_venue(&self, venue: Venue) {
        let mut data = self.data.write().await;
        data.venues.insert(venue.id.clone(), venue);
        self.persist(&data).await;
    }

    pub async fn get_venue(&self, venue_id: &str) -> Option<Venue> {
        self.data.read().await.venues.get(venue_id).cloned()
    }

    // --- Gateway overrides (display name / notes persist independently of the mesh snapshot) ---

    pub async fn set_gateway_override(&self, gateway_id: &str, display_name: String, notes: Option<String>) {
        let mut data = self.data.write().await;
        data.gateway_overrides
            .insert(gateway_id.to_string(), GatewayOverride { display_name, notes });
        self.persist(&data).await;
    }

    pub async fn get_gateway_override(&self, gateway_id: &str) -> Option<GatewayOverride> {
        self.data.read().await.gateway_overrides.get(gateway_id).cloned()
    }

    // --- Sensor models ---

    pub async fn list_sensor_models(&self) -> Vec<SensorModel> {
        self.data.read().await.sensor_models.values().cloned().collect()
    }

    pub async fn get_sensor_model(&self, id: &str) -> Option<SensorModel> {
        self.data.read().await.sensor_models.get(id).cloned()
    }

    pub async fn upsert_sensor_model(&self, model: SensorModel) {
        let mut data = self.data.write().await;
        data.sensor_models.insert(model.id.clone(), model);
        self.persist(&data).await;
    }

    // --- Planned mounts ---

    pub async fn list_planned_mounts(&self, venue_id: &str, layout_id: &str) -> Vec<PlannedMount> {
        self.data
            .read()
            .await
            .planned_mounts
            .values()
            .filter(|m| m.venue_id == venue_id && m.layout_id == layout_id)
            .cloned()
            .collect()
    }

    pub async fn get_planned_mount(&self, id: &str) -> Option<PlannedMount> {
        self.data.read().await.planned_mounts.get(id).cloned()
    }

    pub async fn insert_manual_mount(&self, mut mount: PlannedMount) -> PlannedMount {
        if mount.id.is_empty() {
            mount.id = Uuid::new_v4().to_string();
        }
        let mut data = self.data.write().await;
        data.planned_mounts.insert(mount.id.clone(), mount.clone());
        self.persist(&data).await;
        mount
    }

    /// Deletes every `source = auto` mount for the layout and inserts
    /// `new_mounts` in its place, then appends the run record — all under
    /// one write-guard acquisition, per spec.md §4.8 step 3.
    pub async fn replace_auto_mounts(
        &self,
        venue_id: &str,
        layout_id: &str,
        new_mounts: Vec<PlannedMount>,
        run: PlacementRunRecord,
    ) -> Vec<PlannedMount> {
        let mut data = self.data.write().await;
        data.planned_mounts.retain(|_, m| {
            !(m.venue_id == venue_id
                && m.layout_id == layout_id
                && m.source == hyperspace_protocol::model::MountSource::Auto)
        });
        for m in &new_mounts {
            data.planned_mounts.insert(m.id.clone(), m.clone());
        }
        data.placement_runs.push(run);
        self.persist(&data).await;
        new_mounts
    }

    // --- Pairings (C5) ---

    pub async fn list_pairings(&self, venue_id: &str, gateway_id: Option<&str>) -> Vec<Pairing> {
        self.data
            .read()
            .await
            .pairings
            .values()
            .filter(|p| p.venue_id == venue_id && gateway_id.map_or(true, |g| p.gateway_id == g))
            .cloned()
            .collect()
    }

    /// Replaces any existing pairing for `(venue_id, planned_mount_id)`,
    /// enforcing spec.md invariant 1 structurally rather than advisory.
    pub async fn upsert_pairing(&self, mut pairing: Pairing) -> Pairing {
        if pairing.id.is_empty() {
            pairing.id = Uuid::new_v4().to_string();
        }
        let mut data = self.data.write().await;
        let existing_id = data
            .pairings
            .values()
            .find(|p| p.venue_id == pairing.venue_id && p.planned_mount_id == pairing.planned_mount_id)
            .map(|p| p.id.clone());
        if let Some(id) = existing_id {
            data.pairings.remove(&id);
        }
        data.pairings.insert(pairing.id.clone(), pairing.clone());
        self.persist(&data).await;
        pairing
    }

    pub async fn remove_pairing_by_mount(&self, venue_id: &str, planned_mount_id: &str) {
        let mut data = self.data.write().await;
        data.pairings
            .retain(|_, p| !(p.venue_id == venue_id && p.planned_mount_id == planned_mount_id));
        self.persist(&data).await;
    }

    /// Deletes pairings whose `planned_mount_id` resolves to no mount at
    /// all, per spec.md §4.5. Returns the number removed.
    pub async fn sweep_orphan_pairings(&self, venue_id: &str) -> usize {
        let mut data = self.data.write().await;
        let before = data.pairings.len();
        let mount_ids: std::collections::HashSet<String> = data
            .planned_mounts
            .values()
            .filter(|m| m.venue_id == venue_id)
            .map(|m| m.id.clone())
            .collect();
        data.pairings
            .retain(|_, p| p.venue_id != venue_id || mount_ids.contains(&p.planned_mount_id));
        let removed = before - data.pairings.len();
        if removed > 0 {
            self.persist(&data).await;
        }
        removed
    }

    // --- Commissioned sensors / address pool (C4) ---

    pub async fn list_commissioned(&self, venue_id: &str) -> Vec<CommissionedSensor> {
        self.data
            .read()
            .await
            .commissioned_sensors
            .values()
            .filter(|c| c.venue_id == venue_id)
            .cloned()
            .collect()
    }

    pub async fn insert_commissioned(&self, mut sensor: CommissionedSensor) -> CommissionedSensor {
        if sensor.id.is_empty() {
            sensor.id = Uuid::new_v4().to_string();
        }
        sensor.status = SensorStatus::Active;
        let mut data = self.data.write().await;
        data.commissioned_sensors.insert(sensor.id.clone(), sensor.clone());
        self.persist(&data).await;
        sensor
    }

    /// Smallest unassigned last octet in `base.201`..`base.254`, computed
    /// over `CommissionedSensor` rows for the venue (P4). `base` is the
    /// `/24` prefix, e.g. `192.168.1`.
    pub async fn next_available_address(&self, venue_id: &str, base: &str) -> Result<String, OrchestratorError> {
        let data = self.data.read().await;
        let used: std::collections::HashSet<u8> = data
            .commissioned_sensors
            .values()
            .filter(|c| c.venue_id == venue_id)
            .filter_map(|c| c.assigned_address.parse::<Ipv4Addr>().ok())
            .filter(|addr| addr.octets()[..3] == parse_base(base))
            .map(|addr| addr.octets()[3])
            .collect();

        for octet in 201u16..=254 {
            let octet = octet as u8;
            if !used.contains(&octet) {
                return Ok(format!("{base}.{octet}"));
            }
        }
        Err(OrchestratorError::BadRequest(
            "address pool exhausted: no free address in .201-.254".to_string(),
        ))
    }

    // --- Regions of interest (C6) ---

    pub async fn get_roi(&self, venue_id: &str, layout_id: &str) -> Option<RegionOfInterest> {
        self.data.read().await.rois.get(&roi_key(venue_id, layout_id)).cloned()
    }

    pub async fn upsert_roi(&self, roi: RegionOfInterest) {
        let mut data = self.data.write().await;
        data.rois.insert(roi_key(&roi.venue_id, &roi.layout_id), roi);
        self.persist(&data).await;
    }

    // --- Deployment records (C7) ---

    pub async fn append_deployment_record(&self, record: DeploymentRecord) {
        let mut data = self.data.write().await;
        data.deployment_records.push(record);
        self.persist(&data).await;
    }

    pub async fn list_deployment_records(&self, venue_id: Option<&str>) -> Vec<DeploymentRecord> {
        self.data
            .read()
            .await
            .deployment_records
            .iter()
            .filter(|r| venue_id.map_or(true, |v| r.venue_id == v))
            .cloned()
            .collect()
    }
}

fn parse_base(base: &str) -> [u8; 3] {
    let mut parts = base.split('.').filter_map(|p| p.parse::<u8>().ok());
    [
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperspace_protocol::model::MountSource;
    use tempfile_dir::TempDir;

    mod tempfile_dir {
        use std::path::PathBuf;

        /// Minimal scoped temp-dir helper so these tests don't reach for an
        /// extra dev-dependency just to avoid clobbering `./data`.
        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new(label: &str) -> Self {
                let dir = std::env::temp_dir().join(format!(
                    "hyperspace-store-test-{label}-{}",
                    uuid::Uuid::new_v4()
                ));
                std::fs::create_dir_all(&dir).unwrap();
                Self(dir)
            }

            pub fn path(&self) -> &std::path::Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    fn new_store(label: &str) -> (Store, TempDir) {
        let dir = TempDir::new(label);
        let store = Store::load(dir.path().to_str().unwrap()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn pairing_upsert_replaces_same_mount() {
        let (store, _dir) = new_store("pairing");
        let p1 = Pairing {
            id: String::new(),
            venue_id: "v1".into(),
            gateway_id: "g1".into(),
            planned_mount_id: "m1".into(),
            sensor_id: "s1".into(),
            sensor_address: Some("192.168.1.201".into()),
        };
        store.upsert_pairing(p1.clone()).await;
        let p2 = Pairing {
            sensor_id: "s2".into(),
            ..p1
        };
        store.upsert_pairing(p2).await;

        let all = store.list_pairings("v1", None).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].sensor_id, "s2");
    }

    #[tokio::test]
    async fn next_available_address_is_monotonic_and_bounded() {
        let (store, _dir) = new_store("address");
        store
            .insert_commissioned(CommissionedSensor {
                id: String::new(),
                venue_id: "v1".into(),
                gateway_id: "g1".into(),
                assigned_address: "192.168.1.201".into(),
                label: "LiDAR-201".into(),
                original_address: "192.168.1.200".into(),
                status: SensorStatus::Active,
            })
            .await;

        let next = store.next_available_address("v1", "192.168.1").await.unwrap();
        assert_eq!(next, "192.168.1.202");
    }

    #[tokio::test]
    async fn address_pool_exhaustion_is_an_error() {
        let (store, _dir) = new_store("exhaustion");
        for octet in 201u8..=254 {
            store
                .insert_commissioned(CommissionedSensor {
                    id: String::new(),
                    venue_id: "v1".into(),
                    gateway_id: "g1".into(),
                    assigned_address: format!("192.168.1.{octet}"),
                    label: format!("LiDAR-{octet}"),
                    original_address: "192.168.1.200".into(),
                    status: SensorStatus::Active,
                })
                .await;
        }
        let result = store.next_available_address("v1", "192.168.1").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn sweep_orphans_removes_pairings_without_a_resolvable_mount() {
        let (store, _dir) = new_store("orphans");
        store
            .upsert_pairing(Pairing {
                id: String::new(),
                venue_id: "v1".into(),
                gateway_id: "g1".into(),
                planned_mount_id: "missing-mount".into(),
                sensor_id: "s1".into(),
                sensor_address: None,
            })
            .await;
        store
            .insert_manual_mount(PlannedMount {
                id: "kept-mount".into(),
                venue_id: "v1".into(),
                layout_id: "l1".into(),
                source: MountSource::Manual,
                model_id: "m1".into(),
                position: Default::default(),
                yaw_rad: 0.0,
                mount_height_m: 2.5,
            })
            .await;
        store
            .upsert_pairing(Pairing {
                id: String::new(),
                venue_id: "v1".into(),
                gateway_id: "g1".into(),
                planned_mount_id: "kept-mount".into(),
                sensor_id: "s2".into(),
                sensor_address: None,
            })
            .await;

        let removed = store.sweep_orphan_pairings("v1").await;
        assert_eq!(removed, 1);
        assert_eq!(store.list_pairings("v1", None).await.len(), 1);
    }
}
