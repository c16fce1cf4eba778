//! Placement Solver Facade (C8): normalizes an auto-placement request,
//! dispatches it to an external solver when one is configured and
//! reachable, and falls back to an internal greedy grid placement
//! otherwise, per spec.md §4.8.
//!
//! The "remote succeeded" and "remote failed, run the local algorithm
//! instead" branches are both first-class outcomes here, not an error
//! swallowed silently.

use crate::config::OrchestratorConfig;
use crate::store::{PlacementRunRecord, Store};
use hyperspace_protocol::error::OrchestratorError;
use hyperspace_protocol::model::{MountSource, PlannedMount, Position, Vertex2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SOLVER_DEADLINE: Duration = Duration::from_secs(30);
const DOME_RADIUS_FACTOR: f64 = hyperspace_protocol::model::DOME_MODE_RADIUS_FACTOR;
const DEFAULT_CANDIDATE_SPACING_FACTOR: f64 = 1.4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorModelInput {
    pub id: String,
    pub label: String,
    pub hfov_deg: f64,
    pub vfov_deg: f64,
    pub range_m: f64,
    pub dome_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleFootprint {
    pub vertices: Option<Vec<Vertex2>>,
    pub center: Option<Vertex2>,
    pub dims: Option<(f64, f64)>,
    pub rotation_rad: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlapMode {
    Everywhere,
    CriticalOnly,
    PercentTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSettings {
    pub mount_height: f64,
    #[serde(default)]
    pub sample_spacing: Option<f64>,
    #[serde(default)]
    pub candidate_spacing: Option<f64>,
    #[serde(default = "default_keepout")]
    pub keepout: f64,
    #[serde(default = "default_overlap_mode")]
    pub overlap_mode: OverlapMode,
    #[serde(default = "default_k_required")]
    pub k_required: f64,
    #[serde(default)]
    pub overlap_target_pct: Option<f64>,
    #[serde(default)]
    pub los_enabled: bool,
    #[serde(default = "default_los_cell_size")]
    pub los_cell_size: f64,
    #[serde(default = "default_yaw_step")]
    pub yaw_step_deg: f64,
    #[serde(default = "default_max_sensors")]
    pub max_sensors: usize,
    #[serde(default)]
    pub time_limit: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_keepout() -> f64 {
    0.5
}
fn default_overlap_mode() -> OverlapMode {
    OverlapMode::Everywhere
}
fn default_k_required() -> f64 {
    1.0
}
fn default_los_cell_size() -> f64 {
    0.5
}
fn default_yaw_step() -> f64 {
    15.0
}
fn default_max_sensors() -> usize {
    32
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoplaceRequest {
    pub venue_id: String,
    pub layout_id: String,
    pub roi_polygon: Vec<Vertex2>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleFootprint>,
    pub sensor_model: SensorModelInput,
    pub settings: PlacementSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementResults {
    pub coverage_pct: f64,
    pub k_coverage_pct: f64,
    pub sensor_count: usize,
    pub solver_status: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoplaceResponse {
    pub mounts: Vec<PlannedMount>,
    pub results: PlacementResults,
}

fn effective_radius(model: &SensorModelInput, mount_height_m: f64) -> f64 {
    if model.dome_mode || model.hfov_deg >= 360.0 {
        DOME_RADIUS_FACTOR * model.range_m
    } else {
        let half_vfov = (model.vfov_deg / 2.0).to_radians();
        model.range_m.min(mount_height_m * half_vfov.tan())
    }
}

fn polygon_area(vertices: &[Vertex2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.x * b.z - b.x * a.z;
    }
    (sum / 2.0).abs()
}

fn polygon_contains(vertices: &[Vertex2], p: Vertex2) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let vi = vertices[i];
        let vj = vertices[j];
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

/// A fixture contributes an obstacle polygon iff it has an explicit vertex
/// list of length >= 3, or a 2-D pose plus rectangular dimensions, from
/// which four rotated corners are derived — spec.md §4.8's obstacle
/// extraction contract.
fn extract_obstacle_polygon(footprint: &ObstacleFootprint) -> Option<Vec<Vertex2>> {
    if let Some(vertices) = &footprint.vertices {
        if vertices.len() >= 3 {
            return Some(vertices.clone());
        }
    }
    let center = footprint.center?;
    let (w, d) = footprint.dims?;
    let rotation = footprint.rotation_rad.unwrap_or(0.0);
    let (hw, hd) = (w / 2.0, d / 2.0);
    let local_corners = [(-hw, -hd), (-hw, hd), (hw, hd), (hw, -hd)];
    let (sin_r, cos_r) = rotation.sin_cos();
    Some(
        local_corners
            .iter()
            .map(|(lx, lz)| Vertex2 {
                x: center.x + lx * cos_r - lz * sin_r,
                z: center.z + lx * sin_r + lz * cos_r,
            })
            .collect(),
    )
}

fn inside_any_obstacle(obstacles: &[Vec<Vertex2>], p: Vertex2) -> bool {
    obstacles.iter().any(|polygon| polygon_contains(polygon, p))
}

fn cross2(o: Vertex2, a: Vertex2, b: Vertex2) -> f64 {
    (a.x - o.x) * (b.z - o.z) - (a.z - o.z) * (b.x - o.x)
}

fn segments_intersect(p1: Vertex2, p2: Vertex2, p3: Vertex2, p4: Vertex2) -> bool {
    let d1 = cross2(p3, p4, p1);
    let d2 = cross2(p3, p4, p2);
    let d3 = cross2(p1, p2, p3);
    let d4 = cross2(p1, p2, p4);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

/// Whether any obstacle edge crosses the straight line from `from` to `to`.
fn ray_blocked(from: Vertex2, to: Vertex2, obstacles: &[Vec<Vertex2>]) -> bool {
    obstacles.iter().any(|polygon| {
        let n = polygon.len();
        (0..n).any(|i| segments_intersect(from, to, polygon[i], polygon[(i + 1) % n]))
    })
}

/// Angle in degrees between the sensor's yaw and the heading from `from` to
/// `to`, wrapped into `[0, 180]`.
fn angular_difference_deg(from: Vertex2, to: Vertex2, yaw_rad: f64) -> f64 {
    let heading = (to.z - from.z).atan2(to.x - from.x);
    let diff = (heading - yaw_rad).to_degrees();
    let wrapped = ((diff % 360.0) + 360.0) % 360.0;
    if wrapped > 180.0 {
        360.0 - wrapped
    } else {
        wrapped
    }
}

fn polygon_centroid(vertices: &[Vertex2]) -> Vertex2 {
    let n = vertices.len() as f64;
    let (sum_x, sum_z) = vertices.iter().fold((0.0, 0.0), |(sx, sz), v| (sx + v.x, sz + v.z));
    Vertex2 { x: sum_x / n, z: sum_z / n }
}

fn bounding_box(vertices: &[Vertex2]) -> (Vertex2, Vertex2) {
    let mut min = vertices[0];
    let mut max = vertices[0];
    for v in &vertices[1..] {
        min.x = min.x.min(v.x);
        min.z = min.z.min(v.z);
        max.x = max.x.max(v.x);
        max.z = max.z.max(v.z);
    }
    (min, max)
}

/// Samples candidate centers on a grid inside the ROI polygon, estimates
/// `targetCount`, and selects by even-stride indexing — the internal
/// fallback from spec.md §4.8 step 2.
fn greedy_place(req: &AutoplaceRequest) -> (Vec<Vertex2>, Vec<String>) {
    let mut warnings = Vec::new();
    let radius = effective_radius(&req.sensor_model, req.settings.mount_height);
    let spacing = req
        .settings
        .candidate_spacing
        .unwrap_or(DEFAULT_CANDIDATE_SPACING_FACTOR * radius)
        .max(0.1);

    let obstacles: Vec<Vec<Vertex2>> = req.obstacles.iter().filter_map(extract_obstacle_polygon).collect();

    let (min, max) = bounding_box(&req.roi_polygon);
    let mut candidates = Vec::new();
    let mut x = min.x;
    while x <= max.x {
        let mut z = min.z;
        while z <= max.z {
            let point = Vertex2 { x, z };
            if polygon_contains(&req.roi_polygon, point) && !inside_any_obstacle(&obstacles, point) {
                candidates.push(point);
            }
            z += spacing;
        }
        x += spacing;
    }

    if candidates.is_empty() {
        warnings.push("ROI admits zero grid cells at this spacing; placing one sensor at the centroid".to_string());
        return (vec![polygon_centroid(&req.roi_polygon)], warnings);
    }

    let roi_area = polygon_area(&req.roi_polygon);
    let denom = std::f64::consts::PI * radius * radius;
    let target_count = if denom > 0.0 {
        ((roi_area * req.settings.k_required / denom).ceil() as i64)
            .max(1)
            .min(req.settings.max_sensors.min(candidates.len()) as i64) as usize
    } else {
        1
    };

    let stride = (candidates.len() as f64 / target_count as f64).max(1.0);
    let mut selected = Vec::with_capacity(target_count);
    let mut i = 0.0;
    while selected.len() < target_count && (i as usize) < candidates.len() {
        selected.push(candidates[i as usize]);
        i += stride;
    }

    (selected, warnings)
}

pub struct PlacementSolver {
    config: Arc<OrchestratorConfig>,
    store: Arc<Store>,
    http: reqwest::Client,
}

impl PlacementSolver {
    pub fn new(config: Arc<OrchestratorConfig>, store: Arc<Store>) -> Self {
        Self {
            config,
            store,
            http: reqwest::Client::new(),
        }
    }

    async fn dispatch_external(&self, req: &AutoplaceRequest) -> Option<AutoplaceResponse> {
        let url = self.config.solver_url.as_ref()?;
        if !self.config.feature_solver {
            return None;
        }
        let body = serde_json::json!({
            "roiPolygon": req.roi_polygon,
            "sensorModel": req.sensor_model,
            "settings": req.settings,
        });

        let response = tokio::time::timeout(SOLVER_DEADLINE, self.http.post(format!("{url}/solve")).json(&body).send())
            .await
            .ok()?
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let value: serde_json::Value = response.json().await.ok()?;
        if value.get("success").and_then(|v| v.as_bool()) != Some(true) {
            return None;
        }

        let positions: Vec<Vertex2> = serde_json::from_value(value.get("positions")?.clone()).ok()?;
        let mounts = positions_to_mounts(req, &positions);
        Some(AutoplaceResponse {
            mounts,
            results: PlacementResults {
                coverage_pct: value.get("coveragePct").and_then(|v| v.as_f64()).unwrap_or(0.0),
                k_coverage_pct: value.get("kCoveragePct").and_then(|v| v.as_f64()).unwrap_or(0.0),
                sensor_count: positions.len(),
                solver_status: "external".to_string(),
                warnings: Vec::new(),
            },
        })
    }

    /// Runs the solver, persists the replacement auto mounts plus a run
    /// record atomically, and returns the placed mounts with a coverage
    /// summary.
    pub async fn autoplace(&self, req: AutoplaceRequest) -> Result<AutoplaceResponse, OrchestratorError> {
        if req.roi_polygon.len() < 3 {
            return Err(OrchestratorError::BadRequest("roiPolygon needs at least 3 vertices".to_string()));
        }

        let response = match self.dispatch_external(&req).await {
            Some(r) => r,
            None => {
                let (positions, warnings) = greedy_place(&req);
                let mounts = positions_to_mounts(&req, &positions);
                let sensor_count = mounts.len();
                let radius = effective_radius(&req.sensor_model, req.settings.mount_height);
                let obstacles: Vec<Vec<Vertex2>> = req.obstacles.iter().filter_map(extract_obstacle_polygon).collect();
                let sensors: Vec<(Vertex2, f64)> = mounts
                    .iter()
                    .map(|m| (Vertex2 { x: m.position.x, z: m.position.z }, m.yaw_rad))
                    .collect();
                let coverage_pct = estimate_coverage_pct(
                    &req.roi_polygon,
                    &sensors,
                    radius,
                    req.sensor_model.hfov_deg,
                    &obstacles,
                    req.settings.los_enabled,
                );
                AutoplaceResponse {
                    mounts,
                    results: PlacementResults {
                        coverage_pct,
                        k_coverage_pct: coverage_pct,
                        sensor_count,
                        solver_status: "internal-fallback".to_string(),
                        warnings,
                    },
                }
            }
        };

        let run = PlacementRunRecord {
            id: Uuid::new_v4().to_string(),
            venue_id: req.venue_id.clone(),
            layout_id: req.layout_id.clone(),
            settings: serde_json::to_value(&req.settings).unwrap_or(serde_json::Value::Null),
            coverage_pct: response.results.coverage_pct,
            k_coverage_pct: response.results.k_coverage_pct,
            sensor_count: response.results.sensor_count,
            solver_status: response.results.solver_status.clone(),
            warnings: response.results.warnings.clone(),
            created_at: 0,
        };

        let placed = self
            .store
            .replace_auto_mounts(&req.venue_id, &req.layout_id, response.mounts.clone(), run)
            .await;

        Ok(AutoplaceResponse {
            mounts: placed,
            results: response.results,
        })
    }

    /// Coverage-only evaluation over an already-placed layout; does not
    /// mutate PlannedMount rows.
    pub async fn simulate(
        &self,
        venue_id: &str,
        layout_id: &str,
        roi: &[Vertex2],
        radius: f64,
        hfov_deg: f64,
        obstacles: &[ObstacleFootprint],
        los_enabled: bool,
    ) -> PlacementResults {
        let mounts = self.store.list_planned_mounts(venue_id, layout_id).await;
        let sensors: Vec<(Vertex2, f64)> = mounts
            .iter()
            .map(|m| (Vertex2 { x: m.position.x, z: m.position.z }, m.yaw_rad))
            .collect();
        let extracted: Vec<Vec<Vertex2>> = obstacles.iter().filter_map(extract_obstacle_polygon).collect();
        let coverage_pct = estimate_coverage_pct(roi, &sensors, radius, hfov_deg, &extracted, los_enabled);
        PlacementResults {
            coverage_pct,
            k_coverage_pct: coverage_pct,
            sensor_count: mounts.len(),
            solver_status: "simulated".to_string(),
            warnings: Vec::new(),
        }
    }
}

fn positions_to_mounts(req: &AutoplaceRequest, positions: &[Vertex2]) -> Vec<PlannedMount> {
    positions
        .iter()
        .map(|p| PlannedMount {
            id: Uuid::new_v4().to_string(),
            venue_id: req.venue_id.clone(),
            layout_id: req.layout_id.clone(),
            source: MountSource::Auto,
            model_id: req.sensor_model.id.clone(),
            position: Position { x: p.x, y: 0.0, z: p.z },
            yaw_rad: 0.0,
            mount_height_m: req.settings.mount_height,
        })
        .collect()
}

/// Grid-sampled coverage fraction, per spec.md §4.8's coverage invariant: a
/// cell counts as covered iff it is within `radius` of a sensor AND (the
/// model is omnidirectional OR the cell falls inside that sensor's yaw +
/// hfov wedge) AND (LOS is disabled OR no obstacle edge crosses the ray
/// from sensor to cell). A cell that falls inside an obstacle footprint
/// itself is never counted as covered.
fn estimate_coverage_pct(
    roi: &[Vertex2],
    sensors: &[(Vertex2, f64)],
    radius: f64,
    hfov_deg: f64,
    obstacles: &[Vec<Vertex2>],
    los_enabled: bool,
) -> f64 {
    if roi.len() < 3 || sensors.is_empty() || radius <= 0.0 {
        return 0.0;
    }
    let omnidirectional = hfov_deg >= 360.0;
    let (min, max) = bounding_box(roi);
    let cell = (radius / 4.0).max(0.1);
    let mut total = 0usize;
    let mut covered = 0usize;

    let mut x = min.x;
    while x <= max.x {
        let mut z = min.z;
        while z <= max.z {
            let point = Vertex2 { x, z };
            if polygon_contains(roi, point) {
                total += 1;
                let is_covered = !inside_any_obstacle(obstacles, point)
                    && sensors.iter().any(|(sensor, yaw_rad)| {
                        let dx = point.x - sensor.x;
                        let dz = point.z - sensor.z;
                        let in_range = (dx * dx + dz * dz).sqrt() <= radius;
                        let in_fov = omnidirectional || angular_difference_deg(*sensor, point, *yaw_rad) <= hfov_deg / 2.0;
                        let visible = !los_enabled || !ray_blocked(*sensor, point, obstacles);
                        in_range && in_fov && visible
                    });
                if is_covered {
                    covered += 1;
                }
            }
            z += cell;
        }
        x += cell;
    }

    if total == 0 {
        0.0
    } else {
        100.0 * covered as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_roi() -> Vec<Vertex2> {
        vec![
            Vertex2 { x: 0.0, z: 0.0 },
            Vertex2 { x: 0.0, z: 20.0 },
            Vertex2 { x: 20.0, z: 20.0 },
            Vertex2 { x: 20.0, z: 0.0 },
        ]
    }

    fn base_request() -> AutoplaceRequest {
        AutoplaceRequest {
            venue_id: "v1".into(),
            layout_id: "l1".into(),
            roi_polygon: square_roi(),
            obstacles: Vec::new(),
            sensor_model: SensorModelInput {
                id: "model1".into(),
                label: "Dome".into(),
                hfov_deg: 360.0,
                vfov_deg: 70.0,
                range_m: 15.0,
                dome_mode: true,
            },
            settings: PlacementSettings {
                mount_height: 3.0,
                sample_spacing: None,
                candidate_spacing: None,
                keepout: default_keepout(),
                overlap_mode: default_overlap_mode(),
                k_required: 1.0,
                overlap_target_pct: None,
                los_enabled: false,
                los_cell_size: default_los_cell_size(),
                yaw_step_deg: default_yaw_step(),
                max_sensors: 8,
                time_limit: None,
                seed: None,
            },
        }
    }

    #[test]
    fn coverage_respects_the_sensor_hfov_wedge() {
        // A small ROI due "north" (+z) of a sensor facing "east" (+x, yaw 0).
        let roi = vec![
            Vertex2 { x: 9.0, z: 18.0 },
            Vertex2 { x: 9.0, z: 20.0 },
            Vertex2 { x: 11.0, z: 20.0 },
            Vertex2 { x: 11.0, z: 18.0 },
        ];
        let sensors = vec![(Vertex2 { x: 10.0, z: 10.0 }, 0.0)];
        let omni = estimate_coverage_pct(&roi, &sensors, 15.0, 360.0, &[], false);
        let narrow = estimate_coverage_pct(&roi, &sensors, 15.0, 60.0, &[], false);
        assert!(omni > 0.0);
        assert_eq!(narrow, 0.0);
    }

    #[test]
    fn los_occlusion_blocks_coverage_through_an_obstacle() {
        let sensor = Vertex2 { x: 0.0, z: 10.0 };
        let far_cell_roi = vec![
            Vertex2 { x: -1.0, z: 19.0 },
            Vertex2 { x: -1.0, z: 21.0 },
            Vertex2 { x: 1.0, z: 21.0 },
            Vertex2 { x: 1.0, z: 19.0 },
        ];
        let obstacle = vec![
            Vertex2 { x: -5.0, z: 9.0 },
            Vertex2 { x: -5.0, z: 11.0 },
            Vertex2 { x: 5.0, z: 11.0 },
            Vertex2 { x: 5.0, z: 9.0 },
        ];
        let sensors = vec![(sensor, std::f64::consts::FRAC_PI_2)];
        let without_los = estimate_coverage_pct(&far_cell_roi, &sensors, 30.0, 360.0, &[obstacle.clone()], false);
        let with_los = estimate_coverage_pct(&far_cell_roi, &sensors, 30.0, 360.0, &[obstacle], true);
        assert!(without_los > 0.0);
        assert_eq!(with_los, 0.0);
    }

    #[test]
    fn greedy_place_produces_at_least_one_mount_for_a_nonempty_roi() {
        let req = base_request();
        let (positions, _warnings) = greedy_place(&req);
        assert!(!positions.is_empty());
        assert!(positions.len() <= req.settings.max_sensors);
    }

    #[test]
    fn greedy_place_falls_back_to_centroid_when_grid_has_no_cells() {
        let mut req = base_request();
        req.settings.candidate_spacing = Some(1000.0);
        let (positions, warnings) = greedy_place(&req);
        assert_eq!(positions.len(), 1);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn target_count_respects_max_sensors_cap() {
        let mut req = base_request();
        req.settings.k_required = 100.0;
        req.settings.max_sensors = 2;
        let (positions, _) = greedy_place(&req);
        assert!(positions.len() <= 2);
    }

    #[test]
    fn rotated_rectangle_obstacle_excludes_its_footprint() {
        let footprint = ObstacleFootprint {
            vertices: None,
            center: Some(Vertex2 { x: 10.0, z: 10.0 }),
            dims: Some((4.0, 4.0)),
            rotation_rad: Some(0.0),
        };
        let obstacles = vec![extract_obstacle_polygon(&footprint).unwrap()];
        assert!(inside_any_obstacle(&obstacles, Vertex2 { x: 10.0, z: 10.0 }));
        assert!(!inside_any_obstacle(&obstacles, Vertex2 { x: 0.5, z: 0.5 }));
    }

    #[tokio::test]
    async fn autoplace_rejects_degenerate_roi() {
        let config = Arc::new(OrchestratorConfig::default());
        let dir = std::env::temp_dir().join(format!("hyperspace-placement-test-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(Store::load(dir.to_str().unwrap()).unwrap());
        let solver = PlacementSolver::new(config, store);

        let mut req = base_request();
        req.roi_polygon = vec![Vertex2 { x: 0.0, z: 0.0 }, Vertex2 { x: 1.0, z: 1.0 }];
        let result = solver.autoplace(req).await;
        assert!(matches!(result, Err(OrchestratorError::BadRequest(_))));
    }

    #[tokio::test]
    async fn autoplace_replaces_auto_mounts_and_leaves_manual_ones() {
        let config = Arc::new(OrchestratorConfig::default());
        let dir = std::env::temp_dir().join(format!("hyperspace-placement-test-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(Store::load(dir.to_str().unwrap()).unwrap());

        store
            .insert_manual_mount(PlannedMount {
                id: "manual-1".into(),
                venue_id: "v1".into(),
                layout_id: "l1".into(),
                source: MountSource::Manual,
                model_id: "model1".into(),
                position: Position { x: 1.0, y: 0.0, z: 1.0 },
                yaw_rad: 0.0,
                mount_height_m: 2.5,
            })
            .await;

        let solver = PlacementSolver::new(config, store.clone());
        let response = solver.autoplace(base_request()).await.unwrap();
        assert!(!response.mounts.is_empty());

        let all = store.list_planned_mounts("v1", "l1").await;
        assert!(all.iter().any(|m| m.id == "manual-1"));
        assert!(all.iter().any(|m| m.source == MountSource::Auto));
    }
}
