pub mod storage;

pub use storage::config::StorageConfig;
pub use storage::factory::create_storage;
pub use storage::{
    Record, Storage, StorageError, StorageRead, StorageResult, StorageTransaction,
    TransactionState, WriteOptions,
};
