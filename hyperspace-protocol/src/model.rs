//! The logical entities the orchestrator core reads and writes.
//!
//! Only the attributes the core actually touches are modeled here — the
//! relational schema itself, CAD import, and analytics surfaces are owned by
//! other subsystems and are out of scope.

use serde::{Deserialize, Serialize};

pub type VenueId = String;
pub type LayoutId = String;
pub type GatewayId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimensions {
    pub w: f64,
    pub d: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub label: String,
    pub dimensions: Dimensions,
    pub active_layout_id: Option<LayoutId>,
}

/// A mesh-discovered edge gateway. `display_name` is the only field the
/// core persists independently of the mesh directory snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeGateway {
    pub gateway_id: GatewayId,
    pub hostname_hint: String,
    pub mesh_address: String,
    pub display_name: Option<String>,
    pub online: bool,
    pub last_seen_ts: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MountSource {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMount {
    pub id: String,
    pub venue_id: VenueId,
    pub layout_id: LayoutId,
    pub source: MountSource,
    pub model_id: String,
    pub position: Position,
    /// Radians — the bundle transform converts to degrees on export.
    pub yaw_rad: f64,
    pub mount_height_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorModel {
    pub id: String,
    pub label: String,
    pub hfov_deg: f64,
    pub vfov_deg: f64,
    pub range_m: f64,
    pub dome_mode: bool,
}

/// The unexplained `0.9` dome-mode radius factor from the Open Questions in
/// spec.md §9: it is a named, documented constant rather than a magic
/// number, exactly as that section asks for.
pub const DOME_MODE_RADIUS_FACTOR: f64 = 0.9;

impl SensorModel {
    /// Usable horizontal range given dome/FOV characteristics and mount
    /// height, per spec.md §3.
    pub fn effective_radius(&self, mount_height_m: f64) -> f64 {
        if self.dome_mode || self.hfov_deg >= 360.0 {
            DOME_MODE_RADIUS_FACTOR * self.range_m
        } else {
            let half_vfov = (self.vfov_deg / 2.0).to_radians();
            self.range_m.min(mount_height_m * half_vfov.tan())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairing {
    pub id: String,
    pub venue_id: VenueId,
    pub gateway_id: GatewayId,
    pub planned_mount_id: String,
    pub sensor_id: String,
    pub sensor_address: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Active,
    Retired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionedSensor {
    pub id: String,
    pub venue_id: VenueId,
    pub gateway_id: GatewayId,
    pub assigned_address: String,
    pub label: String,
    pub original_address: String,
    pub status: SensorStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex2 {
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub venue_id: VenueId,
    pub layout_id: LayoutId,
    pub vertices: Vec<Vertex2>,
}

impl RegionOfInterest {
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3 && self.area() > 0.0
    }

    /// Shoelace formula; used both to validate invariant 5 (area > 0) and by
    /// the placement solver's coverage math.
    pub fn area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            sum += a.x * b.z - b.x * a.z;
        }
        (sum / 2.0).abs()
    }

    pub fn bounding_box(&self) -> Option<(Vertex2, Vertex2)> {
        if self.vertices.is_empty() {
            return None;
        }
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.x);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.z = max.z.max(v.z);
        }
        Some((min, max))
    }

    /// Ray-casting point-in-polygon test, per spec.md §4.8.
    pub fn contains(&self, p: Vertex2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            let crosses = (vi.z > p.z) != (vj.z > p.z);
            if crosses {
                let x_at = vj.x + (p.z - vj.z) / (vi.z - vj.z) * (vi.x - vj.x);
                if p.x < x_at {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Applied,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    pub venue_id: VenueId,
    pub gateway_id: GatewayId,
    pub bundle_hash: String,
    pub bundle: serde_json::Value,
    pub status: DeploymentStatus,
    pub gateway_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dome_mode_uses_named_factor() {
        let model = SensorModel {
            id: "m1".into(),
            label: "dome".into(),
            hfov_deg: 360.0,
            vfov_deg: 70.0,
            range_m: 20.0,
            dome_mode: true,
        };
        assert_eq!(model.effective_radius(2.5), DOME_MODE_RADIUS_FACTOR * 20.0);
    }

    #[test]
    fn narrow_fov_radius_is_capped_by_mount_height() {
        let model = SensorModel {
            id: "m2".into(),
            label: "narrow".into(),
            hfov_deg: 70.0,
            vfov_deg: 40.0,
            range_m: 20.0,
            dome_mode: false,
        };
        let expected = 2.5 * (20.0_f64.to_radians()).tan();
        assert!((model.effective_radius(2.5) - expected).abs() < 1e-9);
    }

    #[test]
    fn roi_square_area_and_containment() {
        let roi = RegionOfInterest {
            venue_id: "v1".into(),
            layout_id: "l1".into(),
            vertices: vec![
                Vertex2 { x: 5.0, z: 5.0 },
                Vertex2 { x: 5.0, z: 10.0 },
                Vertex2 { x: 15.0, z: 10.0 },
                Vertex2 { x: 15.0, z: 5.0 },
            ],
        };
        assert!(roi.is_valid());
        assert_eq!(roi.area(), 50.0);
        assert!(roi.contains(Vertex2 { x: 10.0, z: 7.0 }));
        assert!(!roi.contains(Vertex2 { x: 0.0, z: 0.0 }));
    }
}
