//! Storage backend configuration.

use serde::Deserialize;

/// Storage backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Volatile storage, lost when the process exits.
    #[default]
    InMemory,
    /// Durable storage in a SlateDB database.
    SlateDb(SlateDbStorageConfig),
}

/// Configuration for a SlateDB-backed storage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SlateDbStorageConfig {
    /// Path prefix of the database within the object store.
    pub path: String,
    /// Object store holding the database.
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file. Falls back to SlateDB's own lookup.
    #[serde(default)]
    pub settings_path: Option<String>,
}

/// Object store backing a SlateDB database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalObjectStoreConfig {
    /// Directory the object store writes into. Created if missing.
    pub path: String,
}
