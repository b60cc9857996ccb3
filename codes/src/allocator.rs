//! Code issuance.

use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::model::CodeStatus;
use crate::storage::{CodeStorage, CodeTransaction};

/// Issues codes in odometer order, each exactly once.
///
/// Holds no state of its own. Every call re-reads the counter inside a fresh
/// transaction, so any number of allocators sharing one store stay correct.
#[derive(Clone)]
pub(crate) struct CodeAllocator {
    storage: CodeStorage,
}

impl CodeAllocator {
    pub(crate) fn new(storage: CodeStorage) -> Self {
        Self { storage }
    }

    /// Issues the next code.
    ///
    /// Reads the counter, renders it, advances it and records the code as
    /// issued, all in one transaction.
    ///
    /// # Errors
    ///
    /// - [`Error::Exhausted`] once every code has been issued. Nothing is
    ///   written.
    /// - [`Error::Transaction`] if the store fails. Nothing is written.
    /// - [`Error::StateCorruption`] if the counter is unreadable.
    pub(crate) async fn next(&self) -> Result<String> {
        let mut txn = self.storage.begin().await?;
        let (code, advanced) = match self.issue(&mut txn).await {
            Ok(issued) => issued,
            Err(err) => {
                txn.discard();
                if matches!(err, Error::Exhausted) {
                    tracing::warn!("code space exhausted, no code issued");
                }
                return Err(err);
            }
        };
        txn.commit().await?;

        if advanced.is_exhausted() {
            tracing::info!(code = %code, "issued last code of the code space");
        } else {
            tracing::debug!(code = %code, "issued code");
        }
        Ok(code)
    }

    async fn issue(&self, txn: &mut CodeTransaction) -> Result<(String, Counter)> {
        let counter = txn.require_counter().await?;
        let Counter::Next(digits) = &counter else {
            return Err(Error::Exhausted);
        };

        let space = self.storage.space();
        let code = space.render(digits)?;
        if txn.status(&code).await?.is_some() {
            // The counter never revisits a value, so an existing record means
            // the counter was rewound.
            tracing::error!(code = %code, "counter points at an already issued code");
            return Err(Error::StateCorruption(format!(
                "counter points at already issued code {}",
                code
            )));
        }

        let advanced = counter.advance(space.alphabet().radix());
        txn.put_counter(&advanced)?;
        txn.put_status(&code, CodeStatus::Issued)?;
        Ok((code, advanced))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use bytes::Bytes;
    use common::storage::in_memory::{FailingStorage, InMemoryStorage};
    use common::{Record, Storage, StorageError};

    use super::*;
    use crate::alphabet::{Alphabet, CodeSpace};
    use crate::serde::{counter_key, encode_code_key, encode_counter, encode_status};

    async fn allocator(storage: Arc<dyn Storage>, symbols: &str, length: usize) -> CodeAllocator {
        let space = CodeSpace::new(Alphabet::new(symbols).unwrap(), length).unwrap();
        let storage = CodeStorage::new(storage, space);
        storage.initialize().await.unwrap();
        CodeAllocator::new(storage)
    }

    #[tokio::test]
    async fn should_issue_codes_in_odometer_order() {
        // given
        let allocator = allocator(Arc::new(InMemoryStorage::new()), "01", 2).await;

        // when
        let mut codes = Vec::new();
        for _ in 0..4 {
            codes.push(allocator.next().await.unwrap());
        }

        // then
        assert_eq!(codes, vec!["00", "01", "10", "11"]);
    }

    #[tokio::test]
    async fn should_return_exhausted_after_whole_space_issued() {
        // given
        let allocator = allocator(Arc::new(InMemoryStorage::new()), "01", 2).await;
        for _ in 0..4 {
            allocator.next().await.unwrap();
        }

        // when
        let fifth = allocator.next().await;
        let sixth = allocator.next().await;

        // then
        assert_eq!(fifth, Err(Error::Exhausted));
        assert_eq!(sixth, Err(Error::Exhausted));
        assert_eq!(
            allocator.storage.read_counter().await.unwrap(),
            Counter::Exhausted
        );
    }

    #[tokio::test]
    async fn should_issue_distinct_codes_across_full_space() {
        // given
        let allocator = allocator(Arc::new(InMemoryStorage::new()), "abc", 4).await;

        // when
        let mut codes = HashSet::new();
        loop {
            match allocator.next().await {
                Ok(code) => assert!(codes.insert(code)),
                Err(Error::Exhausted) => break,
                Err(err) => panic!("unexpected error: {}", err),
            }
        }

        // then
        assert_eq!(codes.len(), 81);
    }

    #[tokio::test]
    async fn should_record_issued_status() {
        // given
        let allocator = allocator(Arc::new(InMemoryStorage::new()), "01", 2).await;

        // when
        let code = allocator.next().await.unwrap();

        // then
        assert_eq!(
            allocator.storage.read_status(&code).await.unwrap(),
            Some(CodeStatus::Issued)
        );
    }

    #[tokio::test]
    async fn should_leave_no_partial_state_when_commit_fails() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let allocator = allocator(failing.clone(), "01", 2).await;
        failing.fail_commit_once(StorageError::Storage("io".to_string()));

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::Transaction(_))));
        assert_eq!(
            allocator.storage.read_counter().await.unwrap(),
            Counter::zero(2)
        );
        assert_eq!(allocator.storage.read_status("00").await.unwrap(), None);
        assert_eq!(allocator.next().await.unwrap(), "00");
    }

    #[tokio::test]
    async fn should_fail_on_missing_counter() {
        // given
        let space = CodeSpace::new(Alphabet::new("01").unwrap(), 2).unwrap();
        let allocator = CodeAllocator::new(CodeStorage::new(
            Arc::new(InMemoryStorage::new()),
            space,
        ));

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(_))));
    }

    #[tokio::test]
    async fn should_refuse_to_reissue_code_of_rewound_counter() {
        // given
        let raw: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let allocator = allocator(raw.clone(), "01", 2).await;
        raw.put(vec![
            Record::new(counter_key(), encode_counter(&Counter::Next(vec![0, 1]))),
            Record::new(encode_code_key("01"), encode_status(CodeStatus::Dumped)),
        ])
        .await
        .unwrap();

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(_))));
        assert_eq!(
            raw.get(encode_code_key("01")).await.unwrap().unwrap().value,
            Bytes::from_static(&[2])
        );
    }

    #[tokio::test]
    async fn should_write_nothing_when_begin_fails() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let allocator = allocator(failing.clone(), "01", 2).await;
        failing.fail_begin_once(StorageError::Storage("unavailable".to_string()));

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::Transaction(msg)) if msg.contains("unavailable")));
        assert_eq!(
            allocator.storage.read_counter().await.unwrap(),
            Counter::zero(2)
        );
        assert_eq!(allocator.storage.read_status("00").await.unwrap(), None);
        assert_eq!(allocator.next().await.unwrap(), "00");
    }

    #[tokio::test]
    async fn should_write_nothing_when_read_inside_transaction_fails() {
        // given
        let failing = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
        let allocator = allocator(failing.clone(), "01", 2).await;
        allocator.next().await.unwrap();
        failing.fail_get(StorageError::Storage("timeout".to_string()));

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::Transaction(msg)) if msg.contains("timeout")));
        failing.clear();
        assert_eq!(
            allocator.storage.read_counter().await.unwrap(),
            Counter::Next(vec![0, 1])
        );
        assert_eq!(allocator.storage.read_status("01").await.unwrap(), None);
        assert_eq!(allocator.next().await.unwrap(), "01");
    }

    #[tokio::test]
    async fn should_fail_on_malformed_counter() {
        // given
        let raw: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let allocator = allocator(raw.clone(), "01", 2).await;
        raw.put(vec![Record::new(counter_key(), Bytes::from_static(&[0xFF]))])
            .await
            .unwrap();

        // when
        let result = allocator.next().await;

        // then
        assert!(matches!(result, Err(Error::StateCorruption(_))));
        assert_eq!(allocator.storage.read_status("00").await.unwrap(), None);
    }
}
