pub mod config;
pub mod factory;
pub mod in_memory;
pub mod slate;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Options for write operations.
///
/// Controls the durability behavior of [`Storage::put_with_options`] and
/// [`StorageTransaction::commit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Whether to wait for the write to be durable before returning.
    ///
    /// When `true`, the operation will not return until the data has been
    /// persisted to durable storage (e.g., flushed to the WAL and acknowledged
    /// by the object store).
    ///
    /// When `false` (the default), the operation returns as soon as the data
    /// is in memory, providing lower latency but risking data loss on crash.
    pub await_durable: bool,
}

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Storage-related errors
    Storage(String),
    /// Internal errors
    Internal(String),
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StorageError {
    /// Converts a storage error to StorageError::Storage.
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        StorageError::Storage(e.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Lifecycle state of a [`StorageTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Reads and writes are accepted.
    Active,
    /// All buffered writes were applied.
    Committed,
    /// Buffered writes were dropped, either explicitly or by a failed commit.
    Discarded,
}

/// Read operations shared by the storage handle and its transactions' backends.
#[async_trait]
pub trait StorageRead: Send + Sync {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;
}

/// An atomic, all-or-nothing unit of reads and writes.
///
/// Writes are buffered in the transaction and become visible together on
/// [`commit`](Self::commit). Reads observe the transaction's own buffered
/// writes first. Backends guarantee serializable isolation between
/// transactions opened on the same storage handle: no two transactions can
/// both read a key and then write it based on the same observed value.
///
/// Dropping an active transaction discards it.
#[async_trait]
pub trait StorageTransaction: Send {
    /// Returns the current state.
    fn state(&self) -> TransactionState;

    /// Reads a key, observing writes buffered in this transaction.
    async fn get(&mut self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Buffers a write. Nothing is visible to other readers until commit.
    fn put(&mut self, record: Record) -> StorageResult<()>;

    /// Applies every buffered write atomically.
    ///
    /// On failure the transaction is discarded and no write is visible.
    async fn commit(&mut self, options: WriteOptions) -> StorageResult<()>;

    /// Drops buffered writes and releases the transaction.
    ///
    /// Idempotent, and safe to call after a failed commit. Has no effect on a
    /// committed transaction.
    fn discard(&mut self);
}

/// The storage type encapsulates access to the underlying storage (e.g. SlateDB).
#[async_trait]
pub trait Storage: StorageRead {
    /// Writes records atomically outside of any transaction.
    ///
    /// The write is serialized with open transactions, so it never interleaves
    /// with a transaction's read-modify-write sequence.
    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        self.put_with_options(records, WriteOptions::default())
            .await
    }

    /// Writes records to storage with custom options.
    ///
    /// # Arguments
    ///
    /// * `records` - The records to write
    /// * `options` - Write options controlling durability behavior
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()>;

    /// Opens a new transaction.
    ///
    /// Waits until no other transaction on this storage is active.
    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>>;

    /// Closes the storage, releasing any resources.
    ///
    /// This method should be called before dropping the storage to ensure
    /// proper cleanup. For SlateDB, this releases the database fence.
    async fn close(&self) -> StorageResult<()>;
}
