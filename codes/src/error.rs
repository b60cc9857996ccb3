//! Error types for code service operations.

use common::StorageError;

/// Error type for code service operations.
///
/// Every variant has a stable [`kind`](Error::kind) so callers can tell a
/// retryable failure ([`Error::Transaction`]) from a final one
/// ([`Error::Exhausted`], [`Error::AlreadyDumped`]) and from bad input
/// ([`Error::NotFound`], [`Error::InvalidInput`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Every code in the code space has been issued.
    ///
    /// Only operator action (a wider alphabet or longer codes on a fresh
    /// store) makes new codes available.
    Exhausted,

    /// No record exists for the code.
    NotFound(String),

    /// The code was already dumped; dumping is not idempotent.
    AlreadyDumped(String),

    /// The storage layer failed to read or commit. The transaction was
    /// discarded and left no partial writes, so retrying is safe.
    Transaction(String),

    /// Persisted counter or status bytes are not well-formed.
    ///
    /// Never repaired automatically; the embedding application decides
    /// whether to halt.
    StateCorruption(String),

    /// Invalid configuration or parameter.
    InvalidInput(String),
}

impl Error {
    /// Returns a stable, machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Exhausted => "exhausted",
            Error::NotFound(_) => "not_found",
            Error::AlreadyDumped(_) => "already_dumped",
            Error::Transaction(_) => "transaction",
            Error::StateCorruption(_) => "state_corruption",
            Error::InvalidInput(_) => "invalid_input",
        }
    }

    /// Returns true if repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transaction(_))
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Exhausted => write!(f, "Code space exhausted"),
            Error::NotFound(code) => write!(f, "Code not found: {}", code),
            Error::AlreadyDumped(code) => write!(f, "Code already dumped: {}", code),
            Error::Transaction(msg) => write!(f, "Transaction error: {}", msg),
            Error::StateCorruption(msg) => write!(f, "State corruption: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Transaction(err.to_string())
    }
}

/// Result type alias for code service operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_storage_errors_to_transaction_errors() {
        // given
        let err = StorageError::Storage("disk full".to_string());

        // when
        let err = Error::from(err);

        // then
        assert_eq!(
            err,
            Error::Transaction("Storage error: disk full".to_string())
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn should_expose_distinct_kinds() {
        let errors = [
            Error::Exhausted,
            Error::NotFound("a".to_string()),
            Error::AlreadyDumped("a".to_string()),
            Error::Transaction("t".to_string()),
            Error::StateCorruption("c".to_string()),
            Error::InvalidInput("i".to_string()),
        ];

        let mut kinds: Vec<_> = errors.iter().map(Error::kind).collect();
        kinds.sort();
        kinds.dedup();

        assert_eq!(kinds.len(), errors.len());
        assert!(errors.iter().filter(|e| e.is_retryable()).count() == 1);
    }

    #[test]
    fn should_format_code_in_message() {
        assert_eq!(
            Error::AlreadyDumped("01".to_string()).to_string(),
            "Code already dumped: 01"
        );
        assert_eq!(
            Error::NotFound("99".to_string()).to_string(),
            "Code not found: 99"
        );
    }
}
