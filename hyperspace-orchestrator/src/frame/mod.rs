//! Frame Transformer (C6): converts planner-frame coordinates into the
//! venue-local frame the edge runtime expects, per spec.md §4.6.
//!
//! Pure math over [`hyperspace_protocol::model`] types — no I/O. The
//! fallback chain (ROI → padded mount bbox → venue dimensions) is resolved
//! here rather than in the store, since it depends on reading several
//! unrelated tables at once.

use hyperspace_protocol::model::{PlannedMount, RegionOfInterest, Venue, Vertex2};

const MOUNT_BBOX_PADDING_M: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
pub struct RoiOffset {
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct VenueBounds {
    pub width: f64,
    pub depth: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TransformedMount {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub yaw_deg: f64,
}

pub struct FrameTransformer;

impl FrameTransformer {
    /// Resolves `roiOffset = (min x, min z)` via the fallback chain in
    /// spec.md §4.6 step 1: ROI, then padded mount bounding box, then venue
    /// dimensions (the layout-bounds rung collapses into the venue-bounds
    /// one here, since layouts don't carry independent bounds in this
    /// model).
    pub fn resolve_offset(roi: Option<&RegionOfInterest>, mounts: &[PlannedMount], venue: &Venue) -> RoiOffset {
        if let Some(roi) = roi {
            if let Some((min, _max)) = roi.bounding_box() {
                return RoiOffset { x: min.x, z: min.z };
            }
        }

        if !mounts.is_empty() {
            let mut min_x = mounts[0].position.x;
            let mut min_z = mounts[0].position.z;
            for m in mounts {
                min_x = min_x.min(m.position.x);
                min_z = min_z.min(m.position.z);
            }
            return RoiOffset {
                x: min_x - MOUNT_BBOX_PADDING_M,
                z: min_z - MOUNT_BBOX_PADDING_M,
            };
        }

        let _ = venue.dimensions.w;
        RoiOffset { x: 0.0, z: 0.0 }
    }

    pub fn transform_mount(mount: &PlannedMount, offset: RoiOffset) -> TransformedMount {
        TransformedMount {
            x_m: mount.position.x - offset.x,
            y_m: mount.mount_height_m,
            z_m: mount.position.z - offset.z,
            yaw_deg: mount.yaw_rad.to_degrees(),
        }
    }

    pub fn transform_roi_vertices(roi: &RegionOfInterest, offset: RoiOffset) -> Vec<Vertex2> {
        roi.vertices
            .iter()
            .map(|v| Vertex2 {
                x: v.x - offset.x,
                z: v.z - offset.z,
            })
            .collect()
    }

    /// `(venueWidth, venueDepth) = (maxX - minX, maxZ - minZ)` over the same
    /// coordinate source used for the offset, per spec.md §4.6 step 3.
    pub fn venue_bounds(roi: Option<&RegionOfInterest>, mounts: &[PlannedMount], venue: &Venue) -> VenueBounds {
        if let Some(roi) = roi {
            if let Some((min, max)) = roi.bounding_box() {
                return VenueBounds {
                    width: max.x - min.x,
                    depth: max.z - min.z,
                };
            }
        }
        if !mounts.is_empty() {
            let mut min_x = mounts[0].position.x;
            let mut max_x = mounts[0].position.x;
            let mut min_z = mounts[0].position.z;
            let mut max_z = mounts[0].position.z;
            for m in mounts {
                min_x = min_x.min(m.position.x);
                max_x = max_x.max(m.position.x);
                min_z = min_z.min(m.position.z);
                max_z = max_z.max(m.position.z);
            }
            return VenueBounds {
                width: (max_x - min_x) + 2.0 * MOUNT_BBOX_PADDING_M,
                depth: (max_z - min_z) + 2.0 * MOUNT_BBOX_PADDING_M,
            };
        }
        VenueBounds {
            width: venue.dimensions.w,
            depth: venue.dimensions.d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperspace_protocol::model::{Dimensions, MountSource, Position};

    fn venue() -> Venue {
        Venue {
            id: "v1".into(),
            label: "Main Hall".into(),
            dimensions: Dimensions { w: 40.0, d: 30.0, h: 6.0 },
            active_layout_id: Some("l1".into()),
        }
    }

    #[test]
    fn offset_uses_roi_sw_corner_when_roi_present() {
        let roi = RegionOfInterest {
            venue_id: "v1".into(),
            layout_id: "l1".into(),
            vertices: vec![
                Vertex2 { x: 5.0, z: 5.0 },
                Vertex2 { x: 5.0, z: 25.0 },
                Vertex2 { x: 35.0, z: 25.0 },
                Vertex2 { x: 35.0, z: 5.0 },
            ],
        };
        let offset = FrameTransformer::resolve_offset(Some(&roi), &[], &venue());
        assert_eq!(offset.x, 5.0);
        assert_eq!(offset.z, 5.0);
    }

    #[test]
    fn offset_falls_back_to_padded_mount_bbox_without_roi() {
        let mount = PlannedMount {
            id: "m1".into(),
            venue_id: "v1".into(),
            layout_id: "l1".into(),
            source: MountSource::Manual,
            model_id: "model1".into(),
            position: Position { x: 12.0, y: 0.0, z: 8.0 },
            yaw_rad: 0.0,
            mount_height_m: 2.5,
        };
        let offset = FrameTransformer::resolve_offset(None, std::slice::from_ref(&mount), &venue());
        assert_eq!(offset.x, 2.0);
        assert_eq!(offset.z, -2.0);
    }

    #[test]
    fn transform_mount_converts_yaw_to_degrees_and_translates() {
        let mount = PlannedMount {
            id: "m1".into(),
            venue_id: "v1".into(),
            layout_id: "l1".into(),
            source: MountSource::Manual,
            model_id: "model1".into(),
            position: Position { x: 10.0, y: 0.0, z: 7.0 },
            yaw_rad: std::f64::consts::FRAC_PI_2,
            mount_height_m: 2.5,
        };
        let offset = RoiOffset { x: 5.0, z: 5.0 };
        let transformed = FrameTransformer::transform_mount(&mount, offset);
        assert_eq!(transformed.x_m, 5.0);
        assert_eq!(transformed.z_m, 2.0);
        assert_eq!(transformed.y_m, 2.5);
        assert!((transformed.yaw_deg - 90.0).abs() < 1e-9);
    }
}
