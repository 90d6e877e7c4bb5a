pub mod constants;
pub mod depth;
pub mod lidar;
pub mod models;
pub mod scanner;
pub mod settings;
pub mod storage;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use lidar::{
    CapabilityProvider, DepthSource, DeviceProfile, HeuristicCapabilityProvider, LidarController,
    SyntheticDepthSource,
};
use scanner::ScannerController;
use settings::SettingsStore;
use storage::{SqliteStore, StorageService};

pub use utils::logging::init_logging;

const DATABASE_FILE: &str = "pointscan.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Everything the shell needs, rooted at one data directory.
pub struct AppState {
    pub storage: StorageService,
    pub scanner: ScannerController,
    pub lidar: LidarController,
    pub settings: SettingsStore,
}

impl AppState {
    /// Opens with the host's heuristic capabilities and the synthetic depth source.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let provider = HeuristicCapabilityProvider::new(DeviceProfile::host());
        Self::open_with(data_dir, &provider, Arc::new(SyntheticDepthSource))
    }

    pub fn open_with(
        data_dir: &Path,
        provider: &dyn CapabilityProvider,
        depth_source: Arc<dyn DepthSource>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let store = SqliteStore::new(data_dir.join(DATABASE_FILE))?;
        let storage = StorageService::new(Arc::new(store));
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let lidar = LidarController::new(provider, depth_source);
        let scanner = ScannerController::new(settings.scanner_config(), storage.clone(), lidar.clone());

        info!("App state opened at {}", data_dir.display());

        Ok(Self {
            storage,
            scanner,
            lidar,
            settings,
        })
    }

    /// Validates, persists and hands `config` to the scanner for its next scan.
    pub async fn update_scanner_config(&self, config: models::ScannerConfig) -> Result<()> {
        self.scanner.set_config(config.clone()).await?;
        self.settings.update_scanner_config(config)
    }
}
