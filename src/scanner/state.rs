use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{CapturedFrame, ScanSession, ScanStatus, ScannerConfig};

use super::pose::frame_pose;

/// Everything the scanner mutates. Tickers and public operations reach it
/// through one async mutex.
#[derive(Debug, Default)]
pub struct ScanState {
    pub config: ScannerConfig,
    pub session: Option<ScanSession>,
    pub lidar_mode: bool,
    /// Monotonic start of the current scan; `None` once stopped.
    pub anchor: Option<Instant>,
    /// Stops both tickers of the running scan.
    pub cancel_token: Option<CancellationToken>,
}

impl ScanState {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        start_at: DateTime<Utc>,
        now: Instant,
        cancel_token: CancellationToken,
    ) {
        self.cancel_tickers();
        self.session = Some(ScanSession::new(session_id, start_at));
        self.anchor = Some(now);
        self.cancel_token = Some(cancel_token);
    }

    pub fn is_scanning(&self) -> bool {
        matches!(&self.session, Some(session) if session.status == ScanStatus::Scanning)
    }

    /// True while `session_id` is the session being scanned.
    pub fn is_scanning_session(&self, session_id: &str) -> bool {
        matches!(
            &self.session,
            Some(session) if session.id == session_id && session.status == ScanStatus::Scanning
        )
    }

    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.frames.len())
    }

    pub fn progress(&self) -> f32 {
        self.session.as_ref().map_or(0.0, |session| session.progress)
    }

    /// Recomputes progress from the anchor. Never moves backwards.
    pub fn sync_progress(&mut self) -> f32 {
        let duration = self.config.scan_duration.max(1) as f32;
        if let (Some(anchor), Some(session)) = (self.anchor, self.session.as_mut()) {
            if session.status == ScanStatus::Scanning {
                let elapsed = anchor.elapsed().as_millis() as f32;
                let computed = (elapsed / duration * 100.0).min(100.0);
                session.progress = session.progress.max(computed);
            }
        }
        self.progress()
    }

    /// Marks a scanning session completed. Returns false if nothing was scanning.
    pub fn stop(&mut self, ended_at: DateTime<Utc>) -> bool {
        self.cancel_tickers();
        self.anchor = None;

        match self.session.as_mut() {
            Some(session) if session.status == ScanStatus::Scanning => {
                session.end_time = Some(ended_at);
                session.status = ScanStatus::Completed;
                session.progress = 100.0;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_tickers(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    /// Appends a photo frame posed on the capture circle.
    pub fn push_photo_frame(&mut self, uri: String) -> Option<CapturedFrame> {
        let max_frames = self.config.max_frames;
        let session = self.session.as_mut()?;
        let (position, rotation) = frame_pose(session.frames.len(), max_frames);

        let mut frame = CapturedFrame::new(Uuid::new_v4().to_string(), Utc::now(), uri);
        frame.position = position;
        frame.rotation = rotation;
        session.frames.push(frame.clone());
        Some(frame)
    }

    pub fn push_frame(&mut self, frame: CapturedFrame) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.frames.push(frame);
                true
            }
            None => false,
        }
    }

    /// Drops the session; configuration and LiDAR mode survive.
    pub fn reset(&mut self) {
        self.cancel_tickers();
        self.session = None;
        self.anchor = None;
    }
}
