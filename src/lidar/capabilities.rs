use serde::{Deserialize, Serialize};

const MIN_LIDAR_OS_VERSION: f32 = 14.0;
const LIDAR_MAX_RANGE: f32 = 5.0;
const CAMERA_MAX_RANGE: f32 = 3.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DepthAccuracy {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LidarCapabilities {
    #[serde(rename = "hasLiDAR")]
    pub has_lidar: bool,
    pub supports_depth_data: bool,
    /// Metres.
    pub max_range: f32,
    pub accuracy: DepthAccuracy,
}

impl Default for LidarCapabilities {
    fn default() -> Self {
        Self {
            has_lidar: false,
            supports_depth_data: false,
            max_range: LIDAR_MAX_RANGE,
            accuracy: DepthAccuracy::Medium,
        }
    }
}

impl LidarCapabilities {
    pub fn for_lidar(has_lidar: bool) -> Self {
        Self {
            has_lidar,
            supports_depth_data: has_lidar,
            max_range: if has_lidar { LIDAR_MAX_RANGE } else { CAMERA_MAX_RANGE },
            accuracy: if has_lidar {
                DepthAccuracy::High
            } else {
                DepthAccuracy::Medium
            },
        }
    }
}

/// Answers whether the device has a depth sensor. Swap implementations to
/// plug in a real hardware query.
pub trait CapabilityProvider: Send + Sync {
    fn probe(&self) -> LidarCapabilities;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    Ios,
    Android,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub platform: Platform,
    pub system_name: String,
    pub os_version: String,
}

impl DeviceProfile {
    pub fn new(platform: Platform, system_name: impl Into<String>, os_version: impl Into<String>) -> Self {
        Self {
            platform,
            system_name: system_name.into(),
            os_version: os_version.into(),
        }
    }

    /// Profile of the host this crate was built for. The OS version is not
    /// known at this level, so hosts are never classified as LiDAR capable.
    pub fn host() -> Self {
        let platform = match std::env::consts::OS {
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            _ => Platform::Other,
        };
        Self::new(platform, std::env::consts::OS, "")
    }
}

/// Version-string heuristic: iOS 14 or newer is assumed to carry LiDAR.
/// Misclassifies plenty of devices.
#[derive(Debug, Clone)]
pub struct HeuristicCapabilityProvider {
    profile: DeviceProfile,
}

impl HeuristicCapabilityProvider {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }
}

impl CapabilityProvider for HeuristicCapabilityProvider {
    fn probe(&self) -> LidarCapabilities {
        let has_lidar = self.profile.platform == Platform::Ios
            && self.profile.system_name == "iOS"
            && leading_version(&self.profile.os_version)
                .map(|version| version >= MIN_LIDAR_OS_VERSION)
                .unwrap_or(false);

        LidarCapabilities::for_lidar(has_lidar)
    }
}

/// Numeric prefix of a version string, so `"14.2.1"` reads as `14.2`.
fn leading_version(raw: &str) -> Option<f32> {
    let raw = raw.trim();
    let mut seen_dot = false;
    let end = raw
        .char_indices()
        .find(|&(_, c)| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                false
            } else {
                !c.is_ascii_digit()
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(raw.len());

    raw[..end].trim_end_matches('.').parse().ok()
}
