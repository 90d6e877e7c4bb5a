use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::Mutex,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::constants::{FALLBACK_SCAN_DURATION_MS, FRAME_INTERVAL_MS, PROGRESS_UPDATE_INTERVAL_MS};
use crate::depth::{create_test_point_cloud, process_frames_to_point_cloud, Complexity};
use crate::lidar::LidarController;
use crate::models::{CapturedFrame, PointCloud, ScanSession, ScanStatus, ScannerConfig, Vector3};
use crate::storage::StorageService;

use super::{FrameCallback, PhotoSource, ScanState};

// Both tickers fire every 100 ms; flip to silence them.
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSnapshot {
    pub session: Option<ScanSession>,
    pub is_scanning: bool,
    pub progress: f32,
    pub frame_count: usize,
    #[serde(rename = "useLiDARMode")]
    pub lidar_mode: bool,
}

/// Scan lifecycle: `idle -> scanning -> completed`, `processing` while a save
/// runs and `error` if it fails. `reset_scan` returns to idle.
#[derive(Clone)]
pub struct ScannerController {
    state: Arc<Mutex<ScanState>>,
    storage: StorageService,
    lidar: LidarController,
}

impl ScannerController {
    pub fn new(config: ScannerConfig, storage: StorageService, lidar: LidarController) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScanState::new(config))),
            storage,
            lidar,
        }
    }

    pub async fn config(&self) -> ScannerConfig {
        self.state.lock().await.config.clone()
    }

    /// Takes effect from the next scan.
    pub async fn set_config(&self, config: ScannerConfig) -> Result<()> {
        config.validate()?;
        let mut state = self.state.lock().await;
        if state.is_scanning() {
            bail!("cannot change scanner config while scanning");
        }
        state.config = config;
        Ok(())
    }

    pub async fn snapshot(&self) -> ScannerSnapshot {
        let mut state = self.state.lock().await;
        state.sync_progress();
        ScannerSnapshot {
            session: state.session.clone(),
            is_scanning: state.is_scanning(),
            progress: state.progress(),
            frame_count: state.frame_count(),
            lidar_mode: state.lidar_mode,
        }
    }

    pub async fn progress(&self) -> f32 {
        self.state.lock().await.sync_progress()
    }

    /// Starts a new session and its tickers. Without a photo source only
    /// progress advances.
    pub async fn start_scan(
        &self,
        photo_source: Option<Arc<dyn PhotoSource>>,
        on_frame_captured: Option<FrameCallback>,
    ) -> Result<ScanSession> {
        let token = CancellationToken::new();
        let session = {
            let mut state = self.state.lock().await;
            if state.is_scanning() {
                return Err(anyhow!("scan already active"));
            }

            state.begin_session(
                Uuid::new_v4().to_string(),
                Utc::now(),
                Instant::now(),
                token.clone(),
            );
            state
                .session
                .clone()
                .ok_or_else(|| anyhow!("missing scan session"))?
        };

        log_info!("Starting scan {}", session.id);

        match photo_source {
            Some(source) => {
                tokio::spawn(self.clone().frame_loop(
                    session.id.clone(),
                    source,
                    on_frame_captured,
                    token.clone(),
                ));
            }
            None => log_info!("No photo source supplied, only tracking progress"),
        }
        tokio::spawn(self.clone().progress_loop(session.id.clone(), token));

        Ok(session)
    }

    /// Stops the tickers and freezes progress at 100.
    pub async fn stop_scan(&self) -> Option<ScanSession> {
        let mut state = self.state.lock().await;
        if state.stop(Utc::now()) {
            log_info!("Scan stopped with {} frames", state.frame_count());
        }
        state.session.clone()
    }

    /// Appends a frame for `uri` at the next pose on the capture circle.
    pub async fn capture_frame(&self, uri: impl Into<String>) -> Result<CapturedFrame> {
        self.state
            .lock()
            .await
            .push_photo_frame(uri.into())
            .ok_or_else(|| anyhow!("No active scan session"))
    }

    pub async fn reset_scan(&self) {
        let mut state = self.state.lock().await;
        state.stop(Utc::now());
        state.reset();
    }

    /// Returns the new LiDAR mode.
    pub async fn toggle_lidar_mode(&self) -> Result<bool> {
        if !self.lidar.capabilities().has_lidar {
            bail!("LiDAR not available on this device");
        }

        let mut state = self.state.lock().await;
        if state.lidar_mode {
            self.lidar.disable();
            state.lidar_mode = false;
        } else {
            self.lidar.enable()?;
            state.lidar_mode = true;
        }
        Ok(state.lidar_mode)
    }

    /// Captures a depth frame and appends it to the current session, if any.
    pub async fn capture_lidar_frame(&self) -> Result<CapturedFrame> {
        {
            let state = self.state.lock().await;
            if !state.lidar_mode || !self.lidar.is_enabled() {
                bail!("LiDAR mode not enabled");
            }
        }

        let lidar_frame = self
            .lidar
            .capture_frame()
            .ok_or_else(|| anyhow!("Failed to capture LiDAR frame"))?;

        let frame = CapturedFrame {
            uri: format!("lidar://{}", lidar_frame.id),
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            is_lidar_frame: Some(true),
            frame_width: Some(lidar_frame.width),
            frame_height: Some(lidar_frame.height),
            depth_data: Some(lidar_frame.depth_data),
            id: lidar_frame.id,
            timestamp: lidar_frame.timestamp,
        };

        self.state.lock().await.push_frame(frame.clone());
        Ok(frame)
    }

    pub async fn generate_lidar_point_cloud(&self) -> Result<PointCloud> {
        let frame = self
            .lidar
            .last_frame()
            .ok_or_else(|| anyhow!("No LiDAR frame available"))?;
        Ok(self.lidar.depth_to_point_cloud(&frame))
    }

    /// Builds a point cloud from the session (test geometry when it has no
    /// frames), persists session and cloud, then resets.
    pub async fn save_scan(
        &self,
        name: Option<&str>,
        device_type: Option<&str>,
    ) -> Result<PointCloud> {
        let (session, recorded_duration) = {
            let mut state = self.state.lock().await;
            let Some(session) = state.session.as_ref() else {
                bail!("No scan session to save");
            };
            if session.status == ScanStatus::Processing {
                bail!("Scan {} is already being saved", session.id);
            }
            // Only a session that was stopped before saving has a recorded duration.
            let recorded_duration = session.duration_ms();
            let previous_status = session.status;
            state.stop(Utc::now());

            let session = state
                .session
                .as_mut()
                .ok_or_else(|| anyhow!("No scan session to save"))?;
            let snapshot = session.clone();
            session.status = ScanStatus::Processing;
            log_info!(
                "Saving {} scan {} with {} frames",
                previous_status.as_str(),
                snapshot.id,
                snapshot.frames.len()
            );
            (snapshot, recorded_duration)
        };

        let session_id = session.id.clone();
        let result = self
            .build_and_persist(session, recorded_duration, name, device_type)
            .await;

        let mut state = self.state.lock().await;
        let current = state
            .session
            .as_ref()
            .is_some_and(|session| session.id == session_id);

        match result {
            Ok(cloud) => {
                if current {
                    state.reset();
                }
                log_info!("Scan saved with {} points", cloud.points.len());
                Ok(cloud)
            }
            Err(err) => {
                if let Some(session) = state.session.as_mut().filter(|_| current) {
                    session.status = ScanStatus::Error;
                }
                log_error!("Failed to save scan {}: {err:#}", session_id);
                Err(err)
            }
        }
    }

    async fn build_and_persist(
        &self,
        mut session: ScanSession,
        recorded_duration: Option<u64>,
        name: Option<&str>,
        device_type: Option<&str>,
    ) -> Result<PointCloud> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let frames = session.frames.clone();

        let cloud = if frames.is_empty() {
            let name = name.map_or_else(|| format!("Test Scan {date}"), str::to_string);
            let device = device_type.unwrap_or("Test Device").to_string();
            let duration = recorded_duration.unwrap_or(FALLBACK_SCAN_DURATION_MS);
            tokio::task::spawn_blocking(move || {
                create_test_point_cloud(&name, &device, duration, Complexity::Medium)
            })
            .await
            .context("point cloud generation task failed")?
        } else {
            let name = name.map_or_else(|| format!("Scan {date}"), str::to_string);
            let device = device_type.unwrap_or("Camera Device").to_string();
            let duration = recorded_duration.unwrap_or(0);
            tokio::task::spawn_blocking(move || {
                process_frames_to_point_cloud(&frames, &name, &device, duration)
            })
            .await
            .context("point cloud generation task failed")??
        };

        session.status = ScanStatus::Completed;
        self.storage.save_scan_session(&session).await?;
        self.storage.save_point_cloud(&cloud).await?;
        Ok(cloud)
    }

    /// Stops `session_id` if it is still the scanning session.
    async fn halt(&self, session_id: &str) {
        let mut state = self.state.lock().await;
        if state.is_scanning_session(session_id) && state.stop(Utc::now()) {
            log_info!("Scan {} stopped with {} frames", session_id, state.frame_count());
        }
    }

    async fn progress_loop(self, session_id: String, cancel_token: CancellationToken) {
        let period = Duration::from_millis(PROGRESS_UPDATE_INTERVAL_MS);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let finished = {
                        let mut state = self.state.lock().await;
                        if !state.is_scanning_session(&session_id) {
                            break;
                        }
                        state.sync_progress() >= 100.0
                    };

                    if finished {
                        log_info!("Scan duration reached");
                        self.halt(&session_id).await;
                        break;
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    }

    async fn frame_loop(
        self,
        session_id: String,
        source: Arc<dyn PhotoSource>,
        on_frame_captured: Option<FrameCallback>,
        cancel_token: CancellationToken,
    ) {
        let period = Duration::from_millis(FRAME_INTERVAL_MS);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let limit_reached = {
                        let state = self.state.lock().await;
                        if !state.is_scanning_session(&session_id) {
                            break;
                        }
                        state.frame_count() >= state.config.max_frames as usize
                    };

                    if limit_reached {
                        log_info!("Max frames reached, stopping scan");
                        self.halt(&session_id).await;
                        break;
                    }

                    // In-flight captures are not cancelled; a late result is dropped below.
                    let uri = match source.take_photo().await {
                        Ok(uri) => uri,
                        Err(err) => {
                            log_error!("Failed to capture frame: {err:#}");
                            continue;
                        }
                    };

                    let frame = {
                        let mut state = self.state.lock().await;
                        if state.is_scanning_session(&session_id) {
                            state.push_photo_frame(uri)
                        } else {
                            None
                        }
                    };

                    match (frame, &on_frame_captured) {
                        (Some(frame), Some(callback)) => callback(&frame),
                        (Some(_), None) => {}
                        (None, _) => log_warn!("Discarding frame captured after scan {} ended", session_id),
                    }
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    }
}
