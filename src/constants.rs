pub const MAX_FRAMES: u32 = 100;
pub const FRAME_INTERVAL_MS: u64 = 100;

pub const DEFAULT_SCAN_DURATION_MS: u64 = 30_000;
pub const MIN_SCAN_DURATION_MS: u64 = 5_000;
pub const MAX_SCAN_DURATION_MS: u64 = 120_000;
pub const PROGRESS_UPDATE_INTERVAL_MS: u64 = 100;

/// Scan duration recorded on fallback clouds when the session never ended.
pub const FALLBACK_SCAN_DURATION_MS: u64 = 15_000;

pub const DEFAULT_DEDUP_THRESHOLD: f32 = 0.01;
