use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SYNTHETIC_FRAME_WIDTH: u32 = 256;
pub const SYNTHETIC_FRAME_HEIGHT: u32 = 192;
const SYNTHETIC_FOCAL_LENGTH: f32 = 200.0;

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LidarFrame {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Row-major, metres.
    pub depth_data: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_data: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub intrinsics: Intrinsics,
}

/// Produces depth frames. The only implementation shipped is synthetic.
pub trait DepthSource: Send + Sync {
    fn capture(&self, max_range: f32) -> Result<LidarFrame>;
}

/// Fills a 256x192 buffer with independent uniform depths in `[0, max_range)`.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDepthSource;

impl DepthSource for SyntheticDepthSource {
    fn capture(&self, max_range: f32) -> Result<LidarFrame> {
        let mut rng = rand::thread_rng();
        let len = (SYNTHETIC_FRAME_WIDTH * SYNTHETIC_FRAME_HEIGHT) as usize;
        let depth_data = (0..len).map(|_| rng.gen::<f32>() * max_range).collect();

        Ok(LidarFrame {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            depth_data,
            confidence_data: None,
            width: SYNTHETIC_FRAME_WIDTH,
            height: SYNTHETIC_FRAME_HEIGHT,
            intrinsics: Intrinsics {
                fx: SYNTHETIC_FOCAL_LENGTH,
                fy: SYNTHETIC_FOCAL_LENGTH,
                cx: SYNTHETIC_FRAME_WIDTH as f32 / 2.0,
                cy: SYNTHETIC_FRAME_HEIGHT as f32 / 2.0,
            },
        })
    }
}
