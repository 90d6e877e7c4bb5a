use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use log::{info, warn};

use crate::depth::build_point_cloud;
use crate::models::{Point3D, PointCloud, ProcessingMethod};

use super::{CapabilityProvider, DepthSource, LidarCapabilities, LidarFrame};

const SAMPLE_STRIDE: usize = 2;

#[derive(Debug, Default)]
struct LidarState {
    enabled: bool,
    last_frame: Option<LidarFrame>,
}

/// Depth-sensor facade: capability record, enable flag and latest frame.
#[derive(Clone)]
pub struct LidarController {
    capabilities: LidarCapabilities,
    source: Arc<dyn DepthSource>,
    state: Arc<Mutex<LidarState>>,
}

impl LidarController {
    pub fn new(provider: &dyn CapabilityProvider, source: Arc<dyn DepthSource>) -> Self {
        let capabilities = provider.probe();
        info!(
            "LiDAR capabilities: has_lidar={}, max_range={}m",
            capabilities.has_lidar, capabilities.max_range
        );

        Self {
            capabilities,
            source,
            state: Arc::new(Mutex::new(LidarState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LidarState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capabilities(&self) -> LidarCapabilities {
        self.capabilities
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn last_frame(&self) -> Option<LidarFrame> {
        self.lock().last_frame.clone()
    }

    pub fn enable(&self) -> Result<()> {
        if !self.capabilities.has_lidar {
            bail!("LiDAR not available on this device");
        }
        self.lock().enabled = true;
        Ok(())
    }

    pub fn disable(&self) {
        let mut state = self.lock();
        state.enabled = false;
        state.last_frame = None;
    }

    /// `None` when disabled or when the source fails.
    pub fn capture_frame(&self) -> Option<LidarFrame> {
        if !self.is_enabled() {
            return None;
        }

        match self.source.capture(self.capabilities.max_range) {
            Ok(frame) => {
                self.lock().last_frame = Some(frame.clone());
                Some(frame)
            }
            Err(err) => {
                warn!("Failed to capture LiDAR frame: {err:#}");
                None
            }
        }
    }

    /// Pinhole back-projection of every second row and column, camera looking down -Z.
    pub fn depth_to_point_cloud(&self, frame: &LidarFrame) -> PointCloud {
        let max_range = self.capabilities.max_range;
        let intr = frame.intrinsics;
        let width = frame.width as usize;
        let mut points = Vec::new();

        for y in (0..frame.height as usize).step_by(SAMPLE_STRIDE) {
            for x in (0..width).step_by(SAMPLE_STRIDE) {
                let Some(&depth) = frame.depth_data.get(y * width + x) else {
                    continue;
                };
                if !(depth > 0.0 && depth < max_range) {
                    continue;
                }

                points.push(
                    Point3D::new(
                        (x as f32 - intr.cx) * depth / intr.fx,
                        (y as f32 - intr.cy) * depth / intr.fy,
                        -depth,
                    )
                    .with_intensity(depth / max_range),
                );
            }
        }

        let name = format!(
            "LiDAR Scan {}",
            frame.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S")
        );
        let mut cloud = build_point_cloud(
            &name,
            "LiDAR",
            0,
            points,
            Some(1),
            Some(ProcessingMethod::LidarDepth),
        );
        cloud.timestamp = frame.timestamp;
        cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lidar::{
        DeviceProfile, HeuristicCapabilityProvider, Intrinsics, Platform, SyntheticDepthSource,
    };
    use chrono::Utc;

    fn controller(has_lidar: bool) -> LidarController {
        let profile = if has_lidar {
            DeviceProfile::new(Platform::Ios, "iOS", "17.0")
        } else {
            DeviceProfile::new(Platform::Android, "Android", "14")
        };
        LidarController::new(
            &HeuristicCapabilityProvider::new(profile),
            Arc::new(SyntheticDepthSource),
        )
    }

    struct FailingSource;

    impl DepthSource for FailingSource {
        fn capture(&self, _max_range: f32) -> Result<LidarFrame> {
            bail!("sensor unplugged")
        }
    }

    #[test]
    fn enable_requires_lidar() {
        let lidar = controller(false);
        let err = lidar.enable().unwrap_err();
        assert!(err.to_string().contains("LiDAR not available"));
        assert!(!lidar.is_enabled());
    }

    #[test]
    fn capture_is_silent_when_disabled() {
        let lidar = controller(true);
        assert!(lidar.capture_frame().is_none());

        lidar.enable().unwrap();
        let frame = lidar.capture_frame().unwrap();
        assert_eq!(lidar.last_frame().map(|f| f.id), Some(frame.id));

        lidar.disable();
        assert!(lidar.last_frame().is_none());
        assert!(lidar.capture_frame().is_none());
    }

    #[test]
    fn source_failure_yields_none() {
        let lidar = LidarController::new(
            &HeuristicCapabilityProvider::new(DeviceProfile::new(Platform::Ios, "iOS", "16")),
            Arc::new(FailingSource),
        );
        lidar.enable().unwrap();
        assert!(lidar.capture_frame().is_none());
    }

    #[test]
    fn back_projection_uses_intrinsics() {
        let lidar = controller(true);
        let mut depth_data = vec![0.0; 4 * 4];
        depth_data[0] = 2.0; // (0,0)
        depth_data[2 * 4 + 2] = 1.0; // (2,2)
        depth_data[2] = 6.0; // beyond 5m range
        let frame = LidarFrame {
            id: "f".into(),
            timestamp: Utc::now(),
            depth_data,
            confidence_data: None,
            width: 4,
            height: 4,
            intrinsics: Intrinsics {
                fx: 2.0,
                fy: 4.0,
                cx: 2.0,
                cy: 2.0,
            },
        };

        let cloud = lidar.depth_to_point_cloud(&frame);
        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.metadata.device_type, "LiDAR");
        assert_eq!(cloud.metadata.scan_duration, 0);
        assert_eq!(cloud.metadata.point_count, 2);

        let p = &cloud.points[0];
        assert_eq!((p.x, p.y, p.z), (-2.0, -1.0, -2.0));
        assert_eq!(p.intensity, Some(0.4));
        let q = &cloud.points[1];
        assert_eq!((q.x, q.y, q.z), (0.0, 0.0, -1.0));
    }

    #[test]
    fn invalid_depth_is_not_projected() {
        let lidar = controller(true);
        let mut depth_data = vec![0.0; 4 * 4];
        depth_data[0] = f32::NAN;
        depth_data[2] = 2.0;
        let frame = LidarFrame {
            id: "f".into(),
            timestamp: Utc::now(),
            depth_data,
            confidence_data: None,
            width: 4,
            height: 4,
            intrinsics: Intrinsics {
                fx: 2.0,
                fy: 2.0,
                cx: 2.0,
                cy: 2.0,
            },
        };

        let cloud = lidar.depth_to_point_cloud(&frame);
        assert_eq!(cloud.points.len(), 1);
        assert!(cloud.points.iter().all(|p| p.x.is_finite() && p.z == -2.0));
    }

    #[test]
    fn synthetic_frames_produce_points_within_range() {
        let lidar = controller(true);
        lidar.enable().unwrap();
        let frame = lidar.capture_frame().unwrap();

        let cloud = lidar.depth_to_point_cloud(&frame);
        assert!(!cloud.points.is_empty());
        assert!(cloud.points.len() <= 128 * 96);
        assert!(cloud.points.iter().all(|p| p.z < 0.0 && p.z > -5.0));
    }
}
