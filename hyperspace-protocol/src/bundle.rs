//! The extrinsics bundle deployed to an edge gateway, and its content hash.
//!
//! Spec.md §4.7 requires the hash to be stable regardless of the insertion
//! order of mapping keys (invariant 3 / property P1). `serde_json`'s `Map`
//! happens to sort keys by default, but we don't lean on that incidental
//! behavior — `canonicalize` walks the value tree and rebuilds every object
//! with a `BTreeMap`, so the guarantee holds even if a future dependency
//! bump changes that default.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct MqttTarget {
    pub broker: String,
    pub topic: String,
    pub qos: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct LidarModelInfo {
    pub label: String,
    pub hfov: f64,
    pub vfov: f64,
    pub range: f64,
    pub dome_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Extrinsics {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DwgCoordinates {
    pub x_m: f64,
    pub z_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LidarEntry {
    pub lidar_id: String,
    pub ip: String,
    pub model: LidarModelInfo,
    pub extrinsics: Extrinsics,
    pub dwg_coordinates: DwgCoordinates,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoiOffset {
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinateFrame {
    pub origin: String,
    pub roi_offset: RoiOffset,
    pub axis: String,
    pub units: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueBounds {
    pub width: f64,
    pub depth: f64,
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub floor_y: f64,
    pub ceiling_y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationalParams {
    pub ground_plane_y: f64,
    pub ceiling_y: f64,
    pub min_detection_height: f64,
    pub max_detection_height: f64,
    pub publish_rate_hz: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiVertexM {
    pub x_m: f64,
    pub z_m: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtrinsicsBundle {
    pub deployment_id: String,
    pub gateway_id: String,
    pub venue_id: String,
    pub mqtt: MqttTarget,
    pub lidars: Vec<LidarEntry>,
    pub coordinate_frame: CoordinateFrame,
    pub venue_bounds: VenueBounds,
    pub roi_vertices: Option<Vec<RoiVertexM>>,
    pub operational_params: OperationalParams,
}

impl ExtrinsicsBundle {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("ExtrinsicsBundle always serializes")
    }
}

/// Recursively rebuilds every JSON object in `value` with keys in
/// lexicographic order. Arrays keep their element order — only mapping
/// key order is normalized, per spec.md invariant 3.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// First 16 hex characters of SHA-256 over the canonicalized JSON
/// serialization, per spec.md §4.7.
pub fn hash_bundle(value: &Value) -> String {
    let canonical = canonicalize(value);
    let bytes = serde_json::to_vec(&canonical).expect("canonical value always serializes");
    let digest = Sha256::digest(&bytes);
    let hex = hex_encode(&digest);
    hex[..16].to_string()
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_across_key_order() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 1}});
        let b = json!({"a": {"x": 1, "y": 2}, "b": 1});
        assert_eq!(hash_bundle(&a), hash_bundle(&b));
    }

    #[test]
    fn hash_is_sixteen_hex_chars() {
        let v = json!({"k": "v"});
        let h = hash_bundle(&v);
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_differs_on_content_change() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(hash_bundle(&a), hash_bundle(&b));
    }
}
