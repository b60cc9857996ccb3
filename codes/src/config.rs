//! Configuration for opening a [`CodeDb`](crate::CodeDb).

use common::{StorageConfig, WriteOptions};
use serde::Deserialize;

use crate::alphabet::{Alphabet, CodeSpace, DEFAULT_ALPHABET, DEFAULT_CODE_LENGTH};
use crate::error::Result;

/// Configuration for opening a [`CodeDb`](crate::CodeDb).
///
/// The alphabet and code length must stay the same for the lifetime of a
/// store; reopening with different values reports the stored counter as
/// corrupt unless it happens to fit.
///
/// # Example
///
/// ```ignore
/// use codes::{CodeDb, Config};
///
/// let config = Config {
///     alphabet: "01".to_string(),
///     code_length: 2,
///     ..Config::default()
/// };
/// let db = CodeDb::open(config).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage backend configuration.
    pub storage: StorageConfig,

    /// Symbols codes are drawn from, in issuance order.
    pub alphabet: String,

    /// Number of symbols per code.
    pub code_length: usize,

    /// Whether commits wait for durability before returning.
    pub await_durable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            alphabet: DEFAULT_ALPHABET.to_string(),
            code_length: DEFAULT_CODE_LENGTH,
            await_durable: false,
        }
    }
}

impl Config {
    /// Validates the alphabet and code length.
    pub fn code_space(&self) -> Result<CodeSpace> {
        CodeSpace::new(Alphabet::new(&self.alphabet)?, self.code_length)
    }

    pub(crate) fn write_options(&self) -> WriteOptions {
        WriteOptions {
            await_durable: self.await_durable,
        }
    }
}
