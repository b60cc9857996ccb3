//! Issued → Dumped transitions and status queries.

use crate::error::{Error, Result};
use crate::model::CodeStatus;
use crate::storage::{CodeStorage, CodeTransaction};

#[derive(Clone)]
pub(crate) struct LifecycleManager {
    storage: CodeStorage,
}

impl LifecycleManager {
    pub(crate) fn new(storage: CodeStorage) -> Self {
        Self { storage }
    }

    /// Returns the status of an issued code.
    ///
    /// Strings that cannot be codes of the configured space are reported as
    /// [`Error::NotFound`] without touching the store.
    pub(crate) async fn status(&self, code: &str) -> Result<CodeStatus> {
        if !self.storage.space().contains(code) {
            return Err(Error::NotFound(code.to_string()));
        }
        self.storage
            .read_status(code)
            .await?
            .ok_or_else(|| Error::NotFound(code.to_string()))
    }

    /// Moves an issued code to [`CodeStatus::Dumped`].
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the code was never issued.
    /// - [`Error::AlreadyDumped`] if it was dumped before.
    /// - [`Error::Transaction`] if the store fails. Nothing is written.
    pub(crate) async fn dump(&self, code: &str) -> Result<()> {
        if !self.storage.space().contains(code) {
            return Err(Error::NotFound(code.to_string()));
        }

        let mut txn = self.storage.begin().await?;
        if let Err(err) = Self::mark_dumped(&mut txn, code).await {
            txn.discard();
            return Err(err);
        }
        txn.commit().await?;
        tracing::debug!(code, "dumped code");
        Ok(())
    }

    async fn mark_dumped(txn: &mut CodeTransaction, code: &str) -> Result<()> {
        match txn.status(code).await? {
            None => Err(Error::NotFound(code.to_string())),
            Some(CodeStatus::Dumped) => Err(Error::AlreadyDumped(code.to_string())),
            Some(CodeStatus::Issued) => txn.put_status(code, CodeStatus::Dumped),
        }
    }
}
