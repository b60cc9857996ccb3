//! Symbol alphabet and the code space it spans.

use std::collections::HashMap;
use std::sync::Arc;

use num_bigint::BigUint;

use crate::error::{Error, Result};

/// Digits, lowercase then uppercase ASCII letters.
pub const DEFAULT_ALPHABET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Code length used when none is configured.
pub const DEFAULT_CODE_LENGTH: usize = 4;

/// Largest supported alphabet. Digits are persisted as `u16`.
pub const MAX_RADIX: usize = 1 << 16;

/// An ordered set of distinct symbols.
///
/// Digit `d` renders as the `d`-th symbol, so the alphabet's order is the
/// order in which codes are issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
    digits: HashMap<char, u16>,
}

impl Alphabet {
    /// Builds an alphabet from the characters of `symbols`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if there are fewer than 2 or more than
    /// [`MAX_RADIX`] symbols, or if a symbol repeats.
    pub fn new(symbols: &str) -> Result<Self> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "alphabet needs at least 2 symbols, got {}",
                symbols.len()
            )));
        }
        if symbols.len() > MAX_RADIX {
            return Err(Error::InvalidInput(format!(
                "alphabet has {} symbols, at most {} are supported",
                symbols.len(),
                MAX_RADIX
            )));
        }

        let mut digits = HashMap::with_capacity(symbols.len());
        for (digit, &symbol) in symbols.iter().enumerate() {
            if digits.insert(symbol, digit as u16).is_some() {
                return Err(Error::InvalidInput(format!(
                    "alphabet repeats symbol {:?}",
                    symbol
                )));
            }
        }
        Ok(Self { symbols, digits })
    }

    /// Number of symbols (the radix B).
    pub fn radix(&self) -> u32 {
        self.symbols.len() as u32
    }

    /// Symbols in digit order.
    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    /// Returns the symbol for a digit, if the digit is in range.
    pub fn symbol(&self, digit: u16) -> Option<char> {
        self.symbols.get(digit as usize).copied()
    }

    /// Returns the digit for a symbol, if the symbol belongs to the alphabet.
    pub fn digit(&self, symbol: char) -> Option<u16> {
        self.digits.get(&symbol).copied()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        let symbols: Vec<char> = DEFAULT_ALPHABET.chars().collect();
        let digits = symbols
            .iter()
            .enumerate()
            .map(|(digit, &symbol)| (symbol, digit as u16))
            .collect();
        Self { symbols, digits }
    }
}

/// Every code of a fixed length over an alphabet.
///
/// Cheap to clone; the alphabet is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSpace {
    alphabet: Arc<Alphabet>,
    length: usize,
}

impl CodeSpace {
    /// Creates the space of all `length`-symbol codes over `alphabet`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `length` is 0 or does not fit the
    /// persisted counter format.
    pub fn new(alphabet: Alphabet, length: usize) -> Result<Self> {
        if length == 0 || length > u16::MAX as usize {
            return Err(Error::InvalidInput(format!(
                "code length must be between 1 and {}, got {}",
                u16::MAX,
                length
            )));
        }
        Ok(Self {
            alphabet: Arc::new(alphabet),
            length,
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Code length L.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of codes in the space, B^L, computed exactly.
    pub fn total(&self) -> BigUint {
        BigUint::from(self.alphabet.radix()).pow(self.length as u32)
    }

    /// Renders counter digits as a code string.
    ///
    /// Returns [`Error::StateCorruption`] when the digits do not describe a
    /// code of this space; digits only ever come from persisted state.
    pub fn render(&self, digits: &[u16]) -> Result<String> {
        if digits.len() != self.length {
            return Err(Error::StateCorruption(format!(
                "counter has {} digits, expected {}",
                digits.len(),
                self.length
            )));
        }
        digits
            .iter()
            .map(|&digit| {
                self.alphabet.symbol(digit).ok_or_else(|| {
                    Error::StateCorruption(format!(
                        "counter digit {} is outside radix {}",
                        digit,
                        self.alphabet.radix()
                    ))
                })
            })
            .collect()
    }

    /// Returns true if `code` has length L and only uses alphabet symbols.
    pub fn contains(&self, code: &str) -> bool {
        let mut len = 0;
        for symbol in code.chars() {
            if self.alphabet.digit(symbol).is_none() {
                return false;
            }
            len += 1;
        }
        len == self.length
    }
}

impl Default for CodeSpace {
    fn default() -> Self {
        Self {
            alphabet: Arc::new(Alphabet::default()),
            length: DEFAULT_CODE_LENGTH,
        }
    }
}
