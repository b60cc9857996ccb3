use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Storage, StorageTransaction, TransactionState, WriteOptions};
use crate::{Record, StorageError, StorageRead, StorageResult};

type Data = Arc<RwLock<BTreeMap<Bytes, Bytes>>>;

/// In-memory implementation of the Storage trait using a BTreeMap.
///
/// This implementation stores all data in memory and is useful for testing
/// or scenarios where durability is not required.
///
/// Transactions are serialized: [`begin`](Storage::begin) waits on an async
/// mutex that the transaction holds until it commits, is discarded, or is
/// dropped. Plain reads never wait on it and observe committed data only.
pub struct InMemoryStorage {
    data: Data,
    txn_lock: Arc<Mutex<()>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            txn_lock: Arc::new(Mutex::new(())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn read_committed(data: &Data, key: &Bytes) -> StorageResult<Option<Bytes>> {
    let data = data
        .read()
        .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;
    Ok(data.get(key).cloned())
}

fn write_committed(data: &Data, records: impl IntoIterator<Item = Record>) -> StorageResult<()> {
    let mut data = data
        .write()
        .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;
    for record in records {
        data.insert(record.key, record.value);
    }
    Ok(())
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    /// Retrieves a single record by key from the in-memory store.
    ///
    /// Returns `None` if the key does not exist.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        Ok(read_committed(&self.data, &key)?.map(|value| Record::new(key, value)))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    /// Writes a batch of records to the in-memory store.
    ///
    /// All records are written atomically within a single write lock acquisition.
    /// For in-memory storage, write options are ignored since there is no
    /// durable storage to await.
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        _options: WriteOptions,
    ) -> StorageResult<()> {
        let _txn = self.txn_lock.lock().await;
        write_committed(&self.data, records)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>> {
        let guard = Arc::clone(&self.txn_lock).lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            data: Arc::clone(&self.data),
            writes: BTreeMap::new(),
            state: TransactionState::Active,
            guard: Some(guard),
        }))
    }

    async fn close(&self) -> StorageResult<()> {
        // No-op for in-memory storage
        Ok(())
    }
}

/// Transaction over an [`InMemoryStorage`].
///
/// Holds the storage's transaction lock while active.
struct InMemoryTransaction {
    data: Data,
    writes: BTreeMap<Bytes, Bytes>,
    state: TransactionState,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> StorageResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(StorageError::Internal(format!(
                "transaction already finalized ({:?})",
                state
            ))),
        }
    }
}

#[async_trait]
impl StorageTransaction for InMemoryTransaction {
    fn state(&self) -> TransactionState {
        self.state
    }

    async fn get(&mut self, key: Bytes) -> StorageResult<Option<Record>> {
        self.ensure_active()?;
        if let Some(value) = self.writes.get(&key) {
            return Ok(Some(Record::new(key, value.clone())));
        }
        Ok(read_committed(&self.data, &key)?.map(|value| Record::new(key, value)))
    }

    fn put(&mut self, record: Record) -> StorageResult<()> {
        self.ensure_active()?;
        self.writes.insert(record.key, record.value);
        Ok(())
    }

    async fn commit(&mut self, _options: WriteOptions) -> StorageResult<()> {
        self.ensure_active()?;
        let writes = std::mem::take(&mut self.writes);
        let result = write_committed(
            &self.data,
            writes.into_iter().map(|(key, value)| Record::new(key, value)),
        );
        match result {
            Ok(()) => {
                self.state = TransactionState::Committed;
                self.guard = None;
                Ok(())
            }
            Err(err) => {
                self.discard();
                Err(err)
            }
        }
    }

    fn discard(&mut self) {
        if self.state == TransactionState::Active {
            self.writes.clear();
            self.state = TransactionState::Discarded;
        }
        self.guard = None;
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StorageError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            // Swap to None; if another thread raced us, one of them gets the
            // error and the others pass through.
            let prev = slot.swap(Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into reads, `begin`, and transaction commits on demand.
///
/// Each failure slot is controlled by a lock-free [`ArcSwap`](arc_swap::ArcSwap).
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared).
///
/// Read failures apply to transactional reads as well. A failed commit
/// discards the inner transaction, so nothing it buffered becomes visible.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let inner = Arc::new(InMemoryStorage::new());
/// let storage = FailingStorage::wrap(inner);
/// storage.fail_commit_once(StorageError::Storage("io error".into()));
/// // only the next commit returns Err(...), then auto-clears
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_get: Arc<FailSlot>,
    fail_begin: FailSlot,
    fail_commit: Arc<FailSlot>,
}

#[cfg(feature = "test-utils")]
impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_get: Arc::new(arc_swap::ArcSwap::from_pointee(None)),
            fail_begin: arc_swap::ArcSwap::from_pointee(None),
            fail_commit: Arc::new(arc_swap::ArcSwap::from_pointee(None)),
        })
    }

    /// Makes every subsequent read, inside a transaction or not, return the
    /// given error.
    pub fn fail_get(&self, err: StorageError) {
        self.fail_get.store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `begin` return the given error on the next call only.
    pub fn fail_begin_once(&self, err: StorageError) {
        self.fail_begin.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Makes every subsequent transaction commit fail with the given error.
    pub fn fail_commit(&self, err: StorageError) {
        self.fail_commit
            .store(Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes the next transaction commit fail with the given error.
    pub fn fail_commit_once(&self, err: StorageError) {
        self.fail_commit.store(Arc::new(Some(Failure::Once(err))));
    }

    /// Clears every injected failure.
    pub fn clear(&self) {
        self.fail_get.store(Arc::new(None));
        self.fail_begin.store(Arc::new(None));
        self.fail_commit.store(Arc::new(None));
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Storage for FailingStorage {
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        self.inner.put_with_options(records, options).await
    }

    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>> {
        check_failure(&self.fail_begin)?;
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingTransaction {
            inner,
            fail_get: Arc::clone(&self.fail_get),
            fail_commit: Arc::clone(&self.fail_commit),
        }))
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

#[cfg(feature = "test-utils")]
struct FailingTransaction {
    inner: Box<dyn StorageTransaction>,
    fail_get: Arc<FailSlot>,
    fail_commit: Arc<FailSlot>,
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl StorageTransaction for FailingTransaction {
    fn state(&self) -> TransactionState {
        self.inner.state()
    }

    async fn get(&mut self, key: Bytes) -> StorageResult<Option<Record>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    fn put(&mut self, record: Record) -> StorageResult<()> {
        self.inner.put(record)
    }

    async fn commit(&mut self, options: WriteOptions) -> StorageResult<()> {
        if let Err(err) = check_failure(&self.fail_commit) {
            self.inner.discard();
            return Err(err);
        }
        self.inner.commit(options).await
    }

    fn discard(&mut self) {
        self.inner.discard();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn record(key: &'static str, value: &'static str) -> Record {
        Record::new(Bytes::from(key), Bytes::from(value))
    }

    #[tokio::test]
    async fn should_return_none_when_key_not_found() {
        // given
        let storage = InMemoryStorage::new();

        // when
        let result = storage.get(Bytes::from("missing_key")).await;

        // then
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_store_and_retrieve_record() {
        // given
        let storage = InMemoryStorage::new();

        // when
        storage
            .put(vec![record("test_key", "test_value")])
            .await
            .unwrap();
        let result = storage.get(Bytes::from("test_key")).await.unwrap();

        // then
        assert_eq!(result, Some(record("test_key", "test_value")));
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let storage = InMemoryStorage::new();
        storage.put(vec![record("key", "initial")]).await.unwrap();

        // when
        storage.put(vec![record("key", "updated")]).await.unwrap();
        let result = storage.get(Bytes::from("key")).await.unwrap();

        // then
        assert_eq!(result.unwrap().value, Bytes::from("updated"));
    }

    #[tokio::test]
    async fn should_make_transaction_writes_visible_on_commit() {
        // given
        let storage = InMemoryStorage::new();
        let mut txn = storage.begin().await.unwrap();
        txn.put(record("a", "1")).unwrap();
        txn.put(record("b", "2")).unwrap();

        // when
        txn.commit(WriteOptions::default()).await.unwrap();

        // then
        assert_eq!(txn.state(), TransactionState::Committed);
        assert!(storage.get(Bytes::from("a")).await.unwrap().is_some());
        assert!(storage.get(Bytes::from("b")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn should_hide_uncommitted_writes_from_plain_reads() {
        // given
        let storage = InMemoryStorage::new();
        let mut txn = storage.begin().await.unwrap();

        // when
        txn.put(record("a", "1")).unwrap();

        // then
        assert!(storage.get(Bytes::from("a")).await.unwrap().is_none());
        assert_eq!(
            txn.get(Bytes::from("a")).await.unwrap(),
            Some(record("a", "1"))
        );
    }

    #[tokio::test]
    async fn should_drop_writes_on_discard() {
        // given
        let storage = InMemoryStorage::new();
        let mut txn = storage.begin().await.unwrap();
        txn.put(record("a", "1")).unwrap();

        // when
        txn.discard();
        txn.discard();

        // then
        assert_eq!(txn.state(), TransactionState::Discarded);
        assert!(storage.get(Bytes::from("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_operations_after_commit() {
        // given
        let storage = InMemoryStorage::new();
        let mut txn = storage.begin().await.unwrap();
        txn.commit(WriteOptions::default()).await.unwrap();

        // when
        let put = txn.put(record("a", "1"));
        let commit = txn.commit(WriteOptions::default()).await;
        txn.discard();

        // then
        assert!(put.is_err());
        assert!(commit.is_err());
        assert_eq!(txn.state(), TransactionState::Committed);
    }

    #[tokio::test]
    async fn should_release_transaction_lock_when_dropped() {
        // given
        let storage = InMemoryStorage::new();
        let mut txn = storage.begin().await.unwrap();
        txn.put(record("a", "1")).unwrap();

        // when
        drop(txn);
        let second = tokio::time::timeout(Duration::from_secs(1), storage.begin()).await;

        // then
        assert!(second.is_ok());
        assert!(storage.get(Bytes::from("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_serialize_read_modify_write_transactions() {
        // given
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .put(vec![Record::new(
                Bytes::from("counter"),
                Bytes::copy_from_slice(&0u64.to_be_bytes()),
            )])
            .await
            .unwrap();

        // when
        let mut handles = Vec::new();
        for _ in 0..32 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let mut txn = storage.begin().await.unwrap();
                let current = txn.get(Bytes::from("counter")).await.unwrap().unwrap();
                let value = u64::from_be_bytes(current.value[..].try_into().unwrap());
                tokio::task::yield_now().await;
                txn.put(Record::new(
                    Bytes::from("counter"),
                    Bytes::copy_from_slice(&(value + 1).to_be_bytes()),
                ))
                .unwrap();
                txn.commit(WriteOptions::default()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // then
        let record = storage.get(Bytes::from("counter")).await.unwrap().unwrap();
        assert_eq!(u64::from_be_bytes(record.value[..].try_into().unwrap()), 32);
    }
}
