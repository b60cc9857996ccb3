//! Codes - short unique code issuance over a transactional key-value store.
//!
//! Codes are strings of a fixed length L over an ordered alphabet of B
//! symbols. They are issued in lexicographic order by a persisted odometer,
//! each exactly once, until all B^L codes have been handed out. Every issued
//! code carries a status that moves one way, from issued to dumped.
//!
//! # Architecture
//!
//! All state lives in the store: one counter record holding the next code's
//! digits, and one status record per issued code. Each operation reads and
//! writes these records inside a single storage transaction, so concurrent
//! callers never observe or consume the same counter value and a failed
//! operation leaves nothing behind.
//!
//! # Key Concepts
//!
//! - **CodeDb**: The main entry point for issuing, dumping, and inspecting codes.
//! - **Alphabet** / **CodeSpace**: The symbols and code length that define
//!   which codes exist.
//! - **CodeStatus**: `Issued` or `Dumped`.
//! - **Error**: Distinguishes retryable storage failures from final outcomes
//!   such as exhaustion or a repeated dump.
//!
//! # Example
//!
//! ```ignore
//! use codes::{CodeDb, Config};
//!
//! let db = CodeDb::open(Config::default()).await?;
//!
//! let code = db.next().await?;          // "0000"
//! db.dump(&code).await?;
//! assert_eq!(db.status(&code).await?, CodeStatus::Dumped);
//!
//! let remaining = db.remaining().await?; // 62^4 - 1
//! ```

mod allocator;
mod alphabet;
mod capacity;
mod codes;
mod config;
mod counter;
mod error;
mod lifecycle;
mod model;
mod serde;
pub mod server;
mod storage;

pub use alphabet::{Alphabet, CodeSpace, DEFAULT_ALPHABET, DEFAULT_CODE_LENGTH, MAX_RADIX};
pub use capacity::Capacity;
pub use codes::CodeDb;
pub use config::Config;
pub use error::{Error, Result};
pub use model::CodeStatus;
