use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Vector3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
    Processing,
    Completed,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Processing => "processing",
            ScanStatus::Completed => "completed",
            ScanStatus::Error => "error",
        }
    }
}

/// One photo capture with the pose assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedFrame {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub uri: String,
    pub position: Vector3,
    pub rotation: Vector3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_data: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "isLiDARFrame")]
    pub is_lidar_frame: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<u32>,
}

impl CapturedFrame {
    pub fn new(id: String, timestamp: DateTime<Utc>, uri: String) -> Self {
        Self {
            id,
            timestamp,
            uri,
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            depth_data: None,
            is_lidar_frame: None,
            frame_width: None,
            frame_height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub frames: Vec<CapturedFrame>,
    pub status: ScanStatus,
    /// Percent, 0..=100.
    pub progress: f32,
}

impl ScanSession {
    pub fn new(id: String, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            start_time,
            end_time: None,
            frames: Vec::new(),
            status: ScanStatus::Scanning,
            progress: 0.0,
        }
    }

    /// Wall-clock length of the scan, if it has ended.
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds().max(0) as u64)
    }
}
