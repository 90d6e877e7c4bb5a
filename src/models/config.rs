use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SCAN_DURATION_MS, MAX_FRAMES, MAX_SCAN_DURATION_MS, MIN_SCAN_DURATION_MS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CameraFacing {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CameraQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    pub flash_mode: bool,
    pub facing: CameraFacing,
    pub quality: CameraQuality,
    pub auto_focus: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            flash_mode: false,
            facing: CameraFacing::Back,
            quality: CameraQuality::High,
            auto_focus: true,
        }
    }
}

impl CameraSettings {
    pub fn toggle_flash(&mut self) {
        self.flash_mode = !self.flash_mode;
    }

    pub fn toggle_facing(&mut self) {
        self.facing = match self.facing {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        };
    }

    pub fn toggle_auto_focus(&mut self) {
        self.auto_focus = !self.auto_focus;
    }
}

/// Sampling density for raster back-projection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PointCloudDensity {
    Low,
    Medium,
    High,
}

impl PointCloudDensity {
    pub fn multiplier(&self) -> f32 {
        match self {
            PointCloudDensity::Low => 0.1,
            PointCloudDensity::Medium => 0.5,
            PointCloudDensity::High => 1.0,
        }
    }

    /// Pixel stride, `ceil(1 / multiplier)`.
    pub fn stride(&self) -> usize {
        (1.0 / self.multiplier()).ceil() as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ExportFormat {
    Ply,
    Obj,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScannerConfig {
    pub max_frames: u32,
    /// Milliseconds.
    pub scan_duration: u64,
    pub depth_estimation: bool,
    pub point_cloud_density: PointCloudDensity,
    pub export_format: ExportFormat,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
            scan_duration: DEFAULT_SCAN_DURATION_MS,
            depth_estimation: true,
            point_cloud_density: PointCloudDensity::Medium,
            export_format: ExportFormat::Ply,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_frames == 0 {
            bail!("max_frames must be greater than zero");
        }
        if !(MIN_SCAN_DURATION_MS..=MAX_SCAN_DURATION_MS).contains(&self.scan_duration) {
            bail!(
                "scan_duration must be between {} and {} ms, got {}",
                MIN_SCAN_DURATION_MS,
                MAX_SCAN_DURATION_MS,
                self.scan_duration
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_strides() {
        assert_eq!(PointCloudDensity::Low.stride(), 10);
        assert_eq!(PointCloudDensity::Medium.stride(), 2);
        assert_eq!(PointCloudDensity::High.stride(), 1);
    }

    #[test]
    fn default_config_is_valid() {
        ScannerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        let zero_frames = ScannerConfig {
            max_frames: 0,
            ..ScannerConfig::default()
        };
        assert!(zero_frames.validate().is_err());

        let too_short = ScannerConfig {
            scan_duration: 1_000,
            ..ScannerConfig::default()
        };
        assert!(too_short.validate().is_err());

        let too_long = ScannerConfig {
            scan_duration: 600_000,
            ..ScannerConfig::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn camera_toggles() {
        let mut settings = CameraSettings::default();
        settings.toggle_facing();
        settings.toggle_flash();
        settings.toggle_auto_focus();
        assert_eq!(settings.facing, CameraFacing::Front);
        assert!(settings.flash_mode);
        assert!(!settings.auto_focus);

        settings.toggle_facing();
        assert_eq!(settings.facing, CameraFacing::Back);
    }
}
