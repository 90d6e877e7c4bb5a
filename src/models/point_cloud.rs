use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BoundingBox, Point3D};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    StructureFromMotion,
    LidarDepth,
    LuminanceDepth,
    TestGeneration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointCloudMetadata {
    pub device_type: String,
    /// Milliseconds.
    pub scan_duration: u64,
    pub point_count: usize,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_method: Option<ProcessingMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointCloud {
    pub id: String,
    pub name: String,
    pub points: Vec<Point3D>,
    pub timestamp: DateTime<Utc>,
    pub metadata: PointCloudMetadata,
}
