//! Exact remaining-capacity computation.

use num_bigint::BigUint;

use crate::error::Result;
use crate::storage::CodeStorage;

/// Snapshot of how much of the code space is used.
///
/// `issued + remaining == total` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capacity {
    pub issued: BigUint,
    pub remaining: BigUint,
    pub total: BigUint,
}

#[derive(Clone)]
pub(crate) struct CapacityEstimator {
    storage: CodeStorage,
}

impl CapacityEstimator {
    pub(crate) fn new(storage: CodeStorage) -> Self {
        Self { storage }
    }

    /// Number of codes in the space, B^L.
    pub(crate) fn total(&self) -> BigUint {
        self.storage.space().total()
    }

    /// Reads the committed counter and computes issued, remaining and total
    /// codes with arbitrary-precision arithmetic.
    pub(crate) async fn capacity(&self) -> Result<Capacity> {
        let counter = self.storage.read_counter().await?;
        let space = self.storage.space();
        let total = space.total();
        let issued = counter
            .consumed(space.alphabet().radix())
            .unwrap_or_else(|| total.clone());
        let remaining = &total - &issued;
        Ok(Capacity {
            issued,
            remaining,
            total,
        })
    }

    /// Codes that can still be issued. Zero once exhausted.
    pub(crate) async fn remaining(&self) -> Result<BigUint> {
        Ok(self.capacity().await?.remaining)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use common::storage::in_memory::InMemoryStorage;
    use common::{Record, Storage};

    use super::*;
    use crate::alphabet::{Alphabet, CodeSpace};
    use crate::allocator::CodeAllocator;
    use crate::counter::Counter;
    use crate::error::Error;
    use crate::serde::{counter_key, encode_counter};

    async fn setup(symbols: &str, length: usize) -> (CodeAllocator, CapacityEstimator) {
        let space = CodeSpace::new(Alphabet::new(symbols).unwrap(), length).unwrap();
        let storage = CodeStorage::new(Arc::new(InMemoryStorage::new()), space);
        storage.initialize().await.unwrap();
        (
            CodeAllocator::new(storage.clone()),
            CapacityEstimator::new(storage),
        )
    }

    #[tokio::test]
    async fn should_count_down_with_each_issued_code() {
        // given
        let (allocator, estimator) = setup("01", 2).await;
        assert_eq!(estimator.remaining().await.unwrap(), BigUint::from(4u32));

        for k in 1..=4u32 {
            // when
            allocator.next().await.unwrap();

            // then
            let capacity = estimator.capacity().await.unwrap();
            assert_eq!(capacity.issued, BigUint::from(k));
            assert_eq!(capacity.remaining, BigUint::from(4 - k));
            assert_eq!(capacity.total, BigUint::from(4u32));
        }
    }

    #[tokio::test]
    async fn should_report_zero_remaining_when_exhausted() {
        // given
        let (allocator, estimator) = setup("01", 1).await;
        allocator.next().await.unwrap();
        allocator.next().await.unwrap();
        assert_eq!(allocator.next().await, Err(Error::Exhausted));

        // when
        let capacity = estimator.capacity().await.unwrap();

        // then
        assert_eq!(capacity.remaining, BigUint::from(0u32));
        assert_eq!(capacity.issued, capacity.total);
    }

    #[tokio::test]
    async fn should_compute_remaining_exactly_for_large_spaces() {
        // given
        let space = CodeSpace::new(Alphabet::default(), 20).unwrap();
        let raw: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let mut digits = vec![0u16; 20];
        digits[19] = 1;
        raw.put(vec![Record::new(
            counter_key(),
            encode_counter(&Counter::Next(digits)),
        )])
        .await
        .unwrap();
        let estimator = CapacityEstimator::new(CodeStorage::new(raw, space));

        // when
        let remaining = estimator.remaining().await.unwrap();

        // then
        // 62^20 - 1: an f64 would round this to 62^20.
        assert_eq!(remaining.to_string(), "704423425546998022968330264616370175");
        assert_eq!(
            estimator.total().to_string(),
            "704423425546998022968330264616370176"
        );
    }

    #[tokio::test]
    async fn should_fail_on_malformed_counter() {
        // given
        let space = CodeSpace::new(Alphabet::new("01").unwrap(), 2).unwrap();
        let raw: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let storage = CodeStorage::new(raw.clone(), space);
        storage.initialize().await.unwrap();
        raw.put(vec![Record::new(counter_key(), Bytes::from_static(&[0xFF]))])
            .await
            .unwrap();
        let estimator = CapacityEstimator::new(storage);

        // when
        let remaining = estimator.remaining().await;
        let capacity = estimator.capacity().await;

        // then
        assert!(matches!(remaining, Err(Error::StateCorruption(_))));
        assert!(matches!(capacity, Err(Error::StateCorruption(_))));
    }
}
