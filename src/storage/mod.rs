//! Scan sessions and point clouds persisted as whole JSON arrays under two
//! keys. Every mutation reads the full list, edits it in memory and writes it
//! back; a single in-process writer is assumed.

mod memory;
mod sqlite;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{PointCloud, ScanSession};
use crate::utils::BoxFuture;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

pub const SCAN_SESSIONS_KEY: &str = "scan_sessions";
pub const POINT_CLOUDS_KEY: &str = "point_clouds";

/// String key-value backend.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> BoxFuture<'_, Result<Option<String>>>;
    fn set_item(&self, key: &str, value: String) -> BoxFuture<'_, Result<()>>;
    fn remove_items(&self, keys: &[&str]) -> BoxFuture<'_, Result<()>>;
}

#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn KeyValueStore>,
}

impl StorageService {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.store.get_item(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse stored list {key}")),
            None => Ok(Vec::new()),
        }
    }

    async fn store_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let serialized = serde_json::to_string(items)
            .with_context(|| format!("failed to serialize list {key}"))?;
        self.store.set_item(key, serialized).await
    }

    /// Lenient read: failures are logged and reported as an empty list.
    async fn read_list_or_empty<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.load_list(key).await {
            Ok(items) => items,
            Err(err) => {
                log_error!("Failed to read {}: {err:#}", key);
                Vec::new()
            }
        }
    }

    pub async fn save_scan_session(&self, session: &ScanSession) -> Result<()> {
        let result = async {
            let mut sessions: Vec<ScanSession> = self.load_list(SCAN_SESSIONS_KEY).await?;
            sessions.push(session.clone());
            self.store_list(SCAN_SESSIONS_KEY, &sessions).await
        }
        .await;

        if let Err(err) = &result {
            log_error!("Failed to save scan session {}: {err:#}", session.id);
        }
        result
    }

    pub async fn get_scan_sessions(&self) -> Vec<ScanSession> {
        self.read_list_or_empty(SCAN_SESSIONS_KEY).await
    }

    pub async fn save_point_cloud(&self, cloud: &PointCloud) -> Result<()> {
        log_info!("Saving point cloud {}", cloud.id);
        let result = async {
            let mut clouds: Vec<PointCloud> = self.load_list(POINT_CLOUDS_KEY).await?;
            clouds.push(cloud.clone());
            self.store_list(POINT_CLOUDS_KEY, &clouds).await?;
            Ok::<usize, anyhow::Error>(clouds.len())
        }
        .await;

        match result {
            Ok(count) => {
                log_info!("Point cloud saved, {} stored", count);
                Ok(())
            }
            Err(err) => {
                log_error!("Failed to save point cloud {}: {err:#}", cloud.id);
                Err(err)
            }
        }
    }

    pub async fn get_point_clouds(&self) -> Vec<PointCloud> {
        self.read_list_or_empty(POINT_CLOUDS_KEY).await
    }

    pub async fn get_point_cloud(&self, cloud_id: &str) -> Option<PointCloud> {
        self.get_point_clouds()
            .await
            .into_iter()
            .find(|cloud| cloud.id == cloud_id)
    }

    pub async fn delete_point_cloud(&self, cloud_id: &str) -> Result<()> {
        let result = async {
            let mut clouds: Vec<PointCloud> = self.load_list(POINT_CLOUDS_KEY).await?;
            clouds.retain(|cloud| cloud.id != cloud_id);
            self.store_list(POINT_CLOUDS_KEY, &clouds).await
        }
        .await;

        if let Err(err) = &result {
            log_error!("Failed to delete point cloud {}: {err:#}", cloud_id);
        }
        result
    }

    pub async fn clear_all_data(&self) -> Result<()> {
        let result = self
            .store
            .remove_items(&[SCAN_SESSIONS_KEY, POINT_CLOUDS_KEY])
            .await;
        if let Err(err) = &result {
            log_error!("Failed to clear data: {err:#}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{create_test_point_cloud, Complexity};
    use chrono::Utc;

    #[tokio::test]
    async fn empty_store_reads_as_empty_lists() {
        let storage = StorageService::in_memory();
        assert!(storage.get_scan_sessions().await.is_empty());
        assert!(storage.get_point_clouds().await.is_empty());
    }

    #[tokio::test]
    async fn appends_and_filters_point_clouds() {
        let storage = StorageService::in_memory();
        let first = create_test_point_cloud("first", "Test Device", 0, Complexity::Simple);
        let second = create_test_point_cloud("second", "Test Device", 0, Complexity::Simple);

        storage.save_point_cloud(&first).await.unwrap();
        storage.save_point_cloud(&second).await.unwrap();

        let names: Vec<_> = storage
            .get_point_clouds()
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(
            storage.get_point_cloud(&second.id).await.map(|c| c.points.len()),
            Some(1_000)
        );

        storage.delete_point_cloud(&first.id).await.unwrap();
        let remaining = storage.get_point_clouds().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
    }

    #[tokio::test]
    async fn sessions_use_the_documented_key() {
        let backend = Arc::new(MemoryStore::new());
        let storage = StorageService::new(backend.clone());
        storage
            .save_scan_session(&ScanSession::new("scan-1".into(), Utc::now()))
            .await
            .unwrap();

        let raw = backend.get_item(SCAN_SESSIONS_KEY).await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["id"], "scan-1");
        assert_eq!(parsed[0]["status"], "scanning");
        assert!(parsed[0].get("startTime").is_some());
    }

    #[tokio::test]
    async fn corrupted_cloud_list_is_not_overwritten() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set_item(POINT_CLOUDS_KEY, "not json".into())
            .await
            .unwrap();
        let storage = StorageService::new(backend.clone());

        assert!(storage.get_point_clouds().await.is_empty());
        let cloud = create_test_point_cloud("c", "dev", 0, Complexity::Simple);
        assert!(storage.save_point_cloud(&cloud).await.is_err());
        assert_eq!(
            backend.get_item(POINT_CLOUDS_KEY).await.unwrap().as_deref(),
            Some("not json")
        );
    }

    #[tokio::test]
    async fn corrupted_session_list_is_not_overwritten() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .set_item(SCAN_SESSIONS_KEY, "{\"truncated\":".into())
            .await
            .unwrap();
        let storage = StorageService::new(backend.clone());

        assert!(storage.get_scan_sessions().await.is_empty());
        let session = ScanSession::new("scan-2".into(), Utc::now());
        assert!(storage.save_scan_session(&session).await.is_err());
        assert_eq!(
            backend.get_item(SCAN_SESSIONS_KEY).await.unwrap().as_deref(),
            Some("{\"truncated\":")
        );
    }

    #[tokio::test]
    async fn clear_removes_both_keys() {
        let storage = StorageService::new(Arc::new(SqliteStore::in_memory().unwrap()));
        storage
            .save_scan_session(&ScanSession::new("s".into(), Utc::now()))
            .await
            .unwrap();
        storage
            .save_point_cloud(&create_test_point_cloud("c", "dev", 0, Complexity::Simple))
            .await
            .unwrap();

        storage.clear_all_data().await.unwrap();
        assert!(storage.get_scan_sessions().await.is_empty());
        assert!(storage.get_point_clouds().await.is_empty());
    }
}
