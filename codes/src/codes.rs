//! Core CodeDb implementation.
//!
//! This module provides the [`CodeDb`] struct, the primary entry point for
//! issuing codes, moving them through their lifecycle, and reporting how much
//! of the code space remains.

use std::sync::Arc;

use common::{Storage, create_storage};
use num_bigint::BigUint;

use crate::allocator::CodeAllocator;
use crate::capacity::{Capacity, CapacityEstimator};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lifecycle::LifecycleManager;
use crate::model::CodeStatus;
use crate::storage::CodeStorage;

/// A code store over a transactional key-value backend.
///
/// `CodeDb` keeps no counter or status in memory. Every operation runs in its
/// own storage transaction, so it can be shared freely (for example behind an
/// `Arc`) by concurrent tasks.
///
/// # Example
///
/// ```ignore
/// use codes::{CodeDb, Config};
///
/// let db = CodeDb::open(Config::default()).await?;
/// let code = db.next().await?;
/// db.dump(&code).await?;
/// println!("{} codes left", db.remaining().await?);
/// db.close().await?;
/// ```
pub struct CodeDb {
    storage: CodeStorage,
    allocator: CodeAllocator,
    lifecycle: LifecycleManager,
    capacity: CapacityEstimator,
}

impl CodeDb {
    /// Opens a code store with the given configuration.
    ///
    /// Creates the storage backend, then seeds the counter if the store is
    /// new or validates it against the configured alphabet and code length if
    /// not.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an invalid alphabet or code length.
    /// - [`Error::Transaction`] if the storage backend cannot be opened.
    /// - [`Error::StateCorruption`] if the store was created for another
    ///   alphabet or code length, or its counter is unreadable.
    pub async fn open(config: Config) -> Result<Self> {
        // Validate before creating storage so a bad config never opens a db.
        config.code_space()?;
        let storage = create_storage(&config.storage)
            .await
            .map_err(|e| Error::Transaction(e.to_string()))?;
        Self::with_storage(storage, &config).await
    }

    /// Opens a code store over an existing storage handle.
    ///
    /// The `storage` field of `config` is ignored.
    pub async fn with_storage(storage: Arc<dyn Storage>, config: &Config) -> Result<Self> {
        let space = config.code_space()?;
        let storage = CodeStorage::new(storage, space).with_write_options(config.write_options());
        storage.initialize().await?;
        Ok(Self {
            allocator: CodeAllocator::new(storage.clone()),
            lifecycle: LifecycleManager::new(storage.clone()),
            capacity: CapacityEstimator::new(storage.clone()),
            storage,
        })
    }

    /// Issues the next code and records it as [`CodeStatus::Issued`].
    ///
    /// Codes come out in lexicographic order of the alphabet and are never
    /// repeated.
    ///
    /// # Errors
    ///
    /// - [`Error::Exhausted`] once every code has been issued.
    /// - [`Error::Transaction`] if the store fails; nothing was issued and the
    ///   call may be retried.
    /// - [`Error::StateCorruption`] if the stored counter is unreadable.
    pub async fn next(&self) -> Result<String> {
        self.allocator.next().await
    }

    /// Returns the status of a code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the code was never issued.
    pub async fn status(&self, code: &str) -> Result<CodeStatus> {
        self.lifecycle.status(code).await
    }

    /// Moves an issued code to [`CodeStatus::Dumped`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the code was never issued.
    /// - [`Error::AlreadyDumped`] if it was already dumped.
    /// - [`Error::Transaction`] if the store fails.
    pub async fn dump(&self, code: &str) -> Result<()> {
        self.lifecycle.dump(code).await
    }

    /// Number of codes that can still be issued, computed exactly.
    pub async fn remaining(&self) -> Result<BigUint> {
        self.capacity.remaining().await
    }

    /// Issued, remaining and total code counts from one counter read.
    pub async fn capacity(&self) -> Result<Capacity> {
        self.capacity.capacity().await
    }

    /// Number of codes in the code space.
    pub fn total(&self) -> BigUint {
        self.capacity.total()
    }

    /// Closes the underlying storage.
    pub async fn close(&self) -> Result<()> {
        self.storage.close().await
    }
}
