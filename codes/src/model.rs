//! Data types for code service operations.

/// Lifecycle status of an issued code.
///
/// A code with no record is unknown. `Issued` moves to `Dumped` once and
/// never back. The byte values are the persisted encoding and must not
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CodeStatus {
    Issued = 1,
    Dumped = 2,
}

impl CodeStatus {
    /// Persisted single-byte encoding.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(CodeStatus::Issued),
            2 => Some(CodeStatus::Dumped),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodeStatus::Issued => "issued",
            CodeStatus::Dumped => "dumped",
        }
    }
}

impl std::fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
