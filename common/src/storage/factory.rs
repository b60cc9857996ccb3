//! Storage factory for creating storage instances from configuration.
//!
//! This module provides factory functions for creating storage backends
//! based on configuration, supporting both InMemory and SlateDB backends.

use std::sync::Arc;

use slatedb::DbBuilder;
use slatedb::config::Settings;
use slatedb::object_store::{self, ObjectStore};

use super::config::{ObjectStoreConfig, SlateDbStorageConfig, StorageConfig};
use super::in_memory::InMemoryStorage;
use super::slate::SlateDbStorage;
use super::{Storage, StorageError, StorageResult};

/// Creates an object store from configuration without initializing SlateDB.
pub fn create_object_store(config: &ObjectStoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        ObjectStoreConfig::InMemory => Ok(Arc::new(object_store::memory::InMemory::new())),
        ObjectStoreConfig::Local(local_config) => {
            std::fs::create_dir_all(&local_config.path).map_err(|e| {
                StorageError::Storage(format!(
                    "Failed to create storage directory '{}': {}",
                    local_config.path, e
                ))
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(&local_config.path)
                .map_err(|e| {
                    StorageError::Storage(format!("Failed to create local filesystem store: {}", e))
                })?;
            Ok(Arc::new(store))
        }
    }
}

/// Creates a storage instance based on the provided configuration.
///
/// # Returns
///
/// Returns an `Arc<dyn Storage>` on success, or a `StorageError` on failure.
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config {
        StorageConfig::InMemory => Ok(Arc::new(InMemoryStorage::new())),
        StorageConfig::SlateDb(slate_config) => {
            let storage = create_slatedb_storage(slate_config).await?;
            Ok(Arc::new(storage))
        }
    }
}

async fn create_slatedb_storage(config: &SlateDbStorageConfig) -> StorageResult<SlateDbStorage> {
    let object_store = create_object_store(&config.object_store)?;

    let settings = match &config.settings_path {
        Some(path) => Settings::from_file(path).map_err(|e| {
            StorageError::Storage(format!(
                "Failed to load SlateDB settings from {}: {}",
                path, e
            ))
        })?,
        None => Settings::load().unwrap_or_default(),
    };

    let db = DbBuilder::new(config.path.clone(), object_store)
        .with_settings(settings)
        .build()
        .await
        .map_err(|e| StorageError::Storage(format!("Failed to create SlateDB: {}", e)))?;

    tracing::info!(path = %config.path, "opened SlateDB storage");
    Ok(SlateDbStorage::new(Arc::new(db)))
}
