//! Code-specific access to the underlying [`Storage`].
//!
//! [`CodeStorage`] pairs a storage handle with the configured [`CodeSpace`]
//! so that every persisted counter is validated against the alphabet and code
//! length it was written for. [`CodeTransaction`] wraps one storage
//! transaction and speaks in counters and statuses instead of bytes.

use std::sync::Arc;

use common::{Record, Storage, StorageTransaction, WriteOptions};

use crate::alphabet::CodeSpace;
use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::model::CodeStatus;
use crate::serde::{
    code_space_key, counter_key, decode_code_space, decode_counter, decode_status,
    encode_code_key, encode_code_space, encode_counter, encode_status,
};

/// Storage handle bound to one code space.
#[derive(Clone)]
pub(crate) struct CodeStorage {
    storage: Arc<dyn Storage>,
    space: CodeSpace,
    options: WriteOptions,
}

impl CodeStorage {
    pub(crate) fn new(storage: Arc<dyn Storage>, space: CodeSpace) -> Self {
        Self {
            storage,
            space,
            options: WriteOptions::default(),
        }
    }

    /// Sets the options applied to every commit.
    pub(crate) fn with_write_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn space(&self) -> &CodeSpace {
        &self.space
    }

    /// Seeds the code space and the zero counter if the store is new, and
    /// validates both against the configured code space otherwise.
    ///
    /// Never overwrites an existing counter. A store created for another
    /// alphabet or code length is [`Error::StateCorruption`]: its counter
    /// digits would take on a different meaning.
    pub(crate) async fn initialize(&self) -> Result<Counter> {
        let mut txn = self.begin().await?;
        let existing = match self.load_existing(&mut txn).await {
            Ok(existing) => existing,
            Err(err) => {
                txn.discard();
                return Err(err);
            }
        };

        if let Some(counter) = existing {
            txn.discard();
            tracing::info!(
                exhausted = counter.is_exhausted(),
                "opened existing code store"
            );
            return Ok(counter);
        }

        let counter = Counter::zero(self.space.length());
        txn.put_code_space(&self.space)?;
        txn.put_counter(&counter)?;
        txn.commit().await?;
        tracing::info!(
            radix = self.space.alphabet().radix(),
            length = self.space.length(),
            "seeded counter for new code store"
        );
        Ok(counter)
    }

    /// Returns the counter of an existing store, or `None` if the store is
    /// empty.
    async fn load_existing(&self, txn: &mut CodeTransaction) -> Result<Option<Counter>> {
        let stored = txn.code_space().await?;
        let counter = match &stored {
            Some(stored) if stored != &self.space => {
                let err = Error::StateCorruption(format!(
                    "store was created for {} symbols and code length {}, configured {} symbols and code length {}",
                    stored.alphabet().radix(),
                    stored.length(),
                    self.space.alphabet().radix(),
                    self.space.length()
                ));
                tracing::error!(error = %err, "code space mismatch");
                return Err(err);
            }
            _ => txn.counter().await?,
        };

        match (stored, counter) {
            (None, None) => Ok(None),
            (Some(_), Some(counter)) => Ok(Some(counter)),
            (None, Some(_)) => {
                tracing::error!("counter record has no code space record");
                Err(Error::StateCorruption(
                    "counter record has no code space record".to_string(),
                ))
            }
            (Some(_), None) => Err(missing_counter()),
        }
    }

    /// Reads the committed counter.
    ///
    /// A missing counter is corruption: [`initialize`](Self::initialize)
    /// seeds it before any other operation runs.
    pub(crate) async fn read_counter(&self) -> Result<Counter> {
        let record = self.storage.get(counter_key()).await?;
        match record {
            Some(record) => self.decode_counter(&record.value),
            None => Err(missing_counter()),
        }
    }

    /// Reads the committed status of a code, or `None` if it was never issued.
    pub(crate) async fn read_status(&self, code: &str) -> Result<Option<CodeStatus>> {
        let record = self.storage.get(encode_code_key(code)).await?;
        record
            .map(|record| decode_status_logged(code, &record.value))
            .transpose()
    }

    /// Opens a transaction. Waits while another transaction is active.
    pub(crate) async fn begin(&self) -> Result<CodeTransaction> {
        let inner = self.storage.begin().await?;
        Ok(CodeTransaction {
            inner,
            space: self.space.clone(),
            options: self.options,
        })
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.storage.close().await?;
        Ok(())
    }

    fn decode_counter(&self, data: &[u8]) -> Result<Counter> {
        decode_counter(data, &self.space).inspect_err(|err| {
            tracing::error!(error = %err, "persisted counter is corrupt");
        })
    }
}

fn missing_counter() -> Error {
    tracing::error!("counter record is missing");
    Error::StateCorruption("counter record is missing".to_string())
}

fn decode_status_logged(code: &str, data: &[u8]) -> Result<CodeStatus> {
    decode_status(data).inspect_err(|err| {
        tracing::error!(code, error = %err, "persisted status is corrupt");
    })
}

/// One atomic unit of counter and status reads and writes.
///
/// Dropping it without calling [`commit`](Self::commit) discards every
/// buffered write.
pub(crate) struct CodeTransaction {
    inner: Box<dyn StorageTransaction>,
    space: CodeSpace,
    options: WriteOptions,
}

impl CodeTransaction {
    /// Reads the counter, or `None` if the store was never seeded.
    pub(crate) async fn counter(&mut self) -> Result<Option<Counter>> {
        let record = self.inner.get(counter_key()).await?;
        record
            .map(|record| {
                decode_counter(&record.value, &self.space).inspect_err(|err| {
                    tracing::error!(error = %err, "persisted counter is corrupt");
                })
            })
            .transpose()
    }

    /// Reads the counter, treating a missing record as corruption.
    pub(crate) async fn require_counter(&mut self) -> Result<Counter> {
        self.counter().await?.ok_or_else(missing_counter)
    }

    pub(crate) fn put_counter(&mut self, counter: &Counter) -> Result<()> {
        self.inner
            .put(Record::new(counter_key(), encode_counter(counter)))?;
        Ok(())
    }

    /// Reads the code space the store was created for.
    pub(crate) async fn code_space(&mut self) -> Result<Option<CodeSpace>> {
        let record = self.inner.get(code_space_key()).await?;
        record
            .map(|record| {
                decode_code_space(&record.value).inspect_err(|err| {
                    tracing::error!(error = %err, "persisted code space is corrupt");
                })
            })
            .transpose()
    }

    pub(crate) fn put_code_space(&mut self, space: &CodeSpace) -> Result<()> {
        self.inner
            .put(Record::new(code_space_key(), encode_code_space(space)))?;
        Ok(())
    }

    pub(crate) async fn status(&mut self, code: &str) -> Result<Option<CodeStatus>> {
        let record = self.inner.get(encode_code_key(code)).await?;
        record
            .map(|record| decode_status_logged(code, &record.value))
            .transpose()
    }

    pub(crate) fn put_status(&mut self, code: &str, status: CodeStatus) -> Result<()> {
        self.inner
            .put(Record::new(encode_code_key(code), encode_status(status)))?;
        Ok(())
    }

    /// Applies every buffered write atomically. On failure nothing is
    /// written and the transaction is discarded.
    pub(crate) async fn commit(mut self) -> Result<()> {
        let options = self.options;
        self.inner.commit(options).await?;
        Ok(())
    }

    pub(crate) fn discard(mut self) {
        self.inner.discard();
    }
}

impl Drop for CodeTransaction {
    fn drop(&mut self) {
        self.inner.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use bytes::Bytes;
    use common::storage::in_memory::InMemoryStorage;

    fn binary_storage() -> (Arc<dyn Storage>, CodeStorage) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let space = CodeSpace::new(Alphabet::new("01").unwrap(), 2).unwrap();
        (storage.clone(), CodeStorage::new(storage, space))
    }

    #[tokio::test]
    async fn should_seed_zero_counter_on_empty_store() {
        // given
        let (_, storage) = binary_storage();

        // when
        let counter = storage.initialize().await.unwrap();

        // then
        assert_eq!(counter, Counter::zero(2));
        assert_eq!(storage.read_counter().await.unwrap(), Counter::zero(2));
    }

    #[tokio::test]
    async fn should_keep_existing_counter_on_initialize() {
        // given
        let (raw, storage) = binary_storage();
        raw.put(vec![
            Record::new(code_space_key(), encode_code_space(storage.space())),
            Record::new(counter_key(), encode_counter(&Counter::Next(vec![1, 0]))),
        ])
        .await
        .unwrap();

        // when
        let counter = storage.initialize().await.unwrap();

        // then
        assert_eq!(counter, Counter::Next(vec![1, 0]));
        assert_eq!(
            storage.read_counter().await.unwrap(),
            Counter::Next(vec![1, 0])
        );
    }

    #[tokio::test]
    async fn should_fail_initialize_on_corrupt_counter() {
        // given
        let (raw, storage) = binary_storage();
        raw.put(vec![
            Record::new(code_space_key(), encode_code_space(storage.space())),
            Record::new(counter_key(), Bytes::from_static(&[0xFF])),
        ])
        .await
        .unwrap();

        // when
        let result = storage.initialize().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(_))));
    }

    #[tokio::test]
    async fn should_persist_code_space_on_initialize() {
        // given
        let (raw, storage) = binary_storage();

        // when
        storage.initialize().await.unwrap();

        // then
        let record = raw.get(code_space_key()).await.unwrap().unwrap();
        assert_eq!(&decode_code_space(&record.value).unwrap(), storage.space());
    }

    #[tokio::test]
    async fn should_fail_initialize_on_other_alphabet_of_same_size() {
        // given
        let (raw, storage) = binary_storage();
        storage.initialize().await.unwrap();
        let other = CodeSpace::new(Alphabet::new("ab").unwrap(), 2).unwrap();

        // when
        let result = CodeStorage::new(raw, other).initialize().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(msg)) if msg.contains("created for")));
    }

    #[tokio::test]
    async fn should_fail_initialize_on_counter_without_code_space() {
        // given
        let (raw, storage) = binary_storage();
        raw.put(vec![Record::new(
            counter_key(),
            encode_counter(&Counter::zero(2)),
        )])
        .await
        .unwrap();

        // when
        let result = storage.initialize().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(msg)) if msg.contains("code space")));
    }

    #[tokio::test]
    async fn should_fail_initialize_on_code_space_without_counter() {
        // given
        let (raw, storage) = binary_storage();
        raw.put(vec![Record::new(
            code_space_key(),
            encode_code_space(storage.space()),
        )])
        .await
        .unwrap();

        // when
        let result = storage.initialize().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(msg)) if msg.contains("missing")));
        assert!(raw.get(counter_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_report_missing_counter_as_corruption() {
        // given
        let (_, storage) = binary_storage();

        // when
        let result = storage.read_counter().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(msg)) if msg.contains("missing")));
    }

    #[tokio::test]
    async fn should_read_back_committed_status() {
        // given
        let (_, storage) = binary_storage();
        let mut txn = storage.begin().await.unwrap();
        txn.put_status("01", CodeStatus::Issued).unwrap();

        // when
        txn.commit().await.unwrap();

        // then
        assert_eq!(
            storage.read_status("01").await.unwrap(),
            Some(CodeStatus::Issued)
        );
        assert_eq!(storage.read_status("10").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_drop_uncommitted_writes() {
        // given
        let (_, storage) = binary_storage();
        {
            let mut txn = storage.begin().await.unwrap();
            txn.put_status("01", CodeStatus::Issued).unwrap();
        }

        // when
        let status = storage.read_status("01").await.unwrap();

        // then
        assert_eq!(status, None);
    }

    #[tokio::test]
    async fn should_report_corrupt_status() {
        // given
        let (raw, storage) = binary_storage();
        raw.put(vec![Record::new(
            encode_code_key("01"),
            Bytes::from_static(&[9]),
        )])
        .await
        .unwrap();

        // when
        let result = storage.read_status("01").await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(_))));
    }
}
