//! SlateDB-backed implementation of the [`Storage`] trait.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::Db;
use slatedb::WriteBatch;
use slatedb::config::WriteOptions as SlateWriteOptions;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Storage, StorageTransaction, TransactionState, WriteOptions};
use crate::{Record, StorageError, StorageRead, StorageResult};

/// Storage backed by a SlateDB database.
///
/// SlateDB applies a `WriteBatch` atomically, which gives transactions their
/// all-or-nothing commit. Isolation comes from a process-local mutex held by
/// each transaction for its whole lifetime, so a single `SlateDbStorage`
/// must be the only writer of its database path.
pub struct SlateDbStorage {
    db: Arc<Db>,
    txn_lock: Arc<Mutex<()>>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self {
            db,
            txn_lock: Arc::new(Mutex::new(())),
        }
    }
}

fn slate_write_options(options: WriteOptions) -> SlateWriteOptions {
    SlateWriteOptions {
        await_durable: options.await_durable,
        ..Default::default()
    }
}

async fn write_batch(db: &Db, records: Vec<Record>, options: WriteOptions) -> StorageResult<()> {
    let mut batch = WriteBatch::new();
    for record in records {
        batch.put(record.key, record.value);
    }
    db.write_with_options(batch, &slate_write_options(options))
        .await
        .map_err(StorageError::from_storage)
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn put_with_options(
        &self,
        records: Vec<Record>,
        options: WriteOptions,
    ) -> StorageResult<()> {
        let _txn = self.txn_lock.lock().await;
        write_batch(&self.db, records, options).await
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn begin(&self) -> StorageResult<Box<dyn StorageTransaction>> {
        let guard = Arc::clone(&self.txn_lock).lock_owned().await;
        Ok(Box::new(SlateDbTransaction {
            db: Arc::clone(&self.db),
            writes: BTreeMap::new(),
            state: TransactionState::Active,
            guard: Some(guard),
        }))
    }

    async fn close(&self) -> StorageResult<()> {
        self.db.close().await.map_err(StorageError::from_storage)
    }
}

struct SlateDbTransaction {
    db: Arc<Db>,
    writes: BTreeMap<Bytes, Bytes>,
    state: TransactionState,
    guard: Option<OwnedMutexGuard<()>>,
}

#[async_trait]
impl StorageTransaction for SlateDbTransaction {
    fn state(&self) -> TransactionState {
        self.state
    }

    async fn get(&mut self, key: Bytes) -> StorageResult<Option<Record>> {
        if self.state != TransactionState::Active {
            return Err(StorageError::Internal(
                "transaction already finalized".to_string(),
            ));
        }
        if let Some(value) = self.writes.get(&key) {
            return Ok(Some(Record::new(key, value.clone())));
        }
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    fn put(&mut self, record: Record) -> StorageResult<()> {
        if self.state != TransactionState::Active {
            return Err(StorageError::Internal(
                "transaction already finalized".to_string(),
            ));
        }
        self.writes.insert(record.key, record.value);
        Ok(())
    }

    async fn commit(&mut self, options: WriteOptions) -> StorageResult<()> {
        if self.state != TransactionState::Active {
            return Err(StorageError::Internal(
                "transaction already finalized".to_string(),
            ));
        }
        let records = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(key, value)| Record::new(key, value))
            .collect();
        match write_batch(&self.db, records, options).await {
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
