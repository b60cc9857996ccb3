//! Key and value encoding for code service records.
//!
//! Keys carry the standard 2-byte record prefix:
//!
//! ```text
//! Counter key:    | version (u8) | 0x10 |
//! Code space key: | version (u8) | 0x11 |
//! Code key:       | version (u8) | 0x20 | code (UTF-8) |
//! ```
//!
//! The record tag keeps the reserved keys apart from every code key,
//! whatever the alphabet.
//!
//! Values:
//!
//! ```text
//! Counter:    | digit_count (u16 BE) | digit (u16 BE) * digit_count |
//! Code space: | code_length (u16 BE) | symbol_count (u32 BE) | symbols (UTF-8) |
//! Status:     | status (u8) |
//! ```
//!
//! A `digit_count` of 0 is the exhausted sentinel. Status bytes are 1 for
//! issued and 2 for dumped.

use bytes::{BufMut, Bytes, BytesMut};

use crate::alphabet::{Alphabet, CodeSpace};
use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::model::CodeStatus;

/// Key format version.
pub const KEY_VERSION: u8 = 0x01;

/// Record tag of the single counter record.
pub const COUNTER_RECORD_TAG: u8 = 0x10;

/// Record tag of the code space the store was created for.
pub const CODE_SPACE_RECORD_TAG: u8 = 0x11;

/// Record tag of per-code status records.
pub const CODE_RECORD_TAG: u8 = 0x20;

/// Returns the reserved key holding the counter.
pub fn counter_key() -> Bytes {
    Bytes::from_static(&[KEY_VERSION, COUNTER_RECORD_TAG])
}

/// Returns the reserved key holding the code space.
pub fn code_space_key() -> Bytes {
    Bytes::from_static(&[KEY_VERSION, CODE_SPACE_RECORD_TAG])
}

/// Encodes the key of a code's status record.
pub fn encode_code_key(code: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + code.len());
    buf.put_u8(KEY_VERSION);
    buf.put_u8(CODE_RECORD_TAG);
    buf.extend_from_slice(code.as_bytes());
    buf.freeze()
}

/// Encodes the counter. The same counter always yields the same bytes.
pub fn encode_counter(counter: &Counter) -> Bytes {
    match counter {
        Counter::Next(digits) => {
            let mut buf = BytesMut::with_capacity(2 + 2 * digits.len());
            buf.put_u16(digits.len() as u16);
            for &digit in digits {
                buf.put_u16(digit);
            }
            buf.freeze()
        }
        Counter::Exhausted => Bytes::from_static(&[0, 0]),
    }
}

/// Decodes the counter, validating it against the code space.
///
/// # Errors
///
/// Returns [`Error::StateCorruption`] if the buffer is truncated or has
/// trailing bytes, if the digit count is neither 0 nor the code length, or
/// if a digit is outside the alphabet.
pub fn decode_counter(data: &[u8], space: &CodeSpace) -> Result<Counter> {
    if data.len() < 2 {
        return Err(Error::StateCorruption(format!(
            "buffer too short for counter: need at least 2 bytes, got {}",
            data.len()
        )));
    }

    let digit_count = u16::from_be_bytes([data[0], data[1]]) as usize;
    let payload = &data[2..];
    if payload.len() != 2 * digit_count {
        return Err(Error::StateCorruption(format!(
            "counter declares {} digits but carries {} bytes",
            digit_count,
            payload.len()
        )));
    }
    if digit_count == 0 {
        return Ok(Counter::Exhausted);
    }
    if digit_count != space.length() {
        return Err(Error::StateCorruption(format!(
            "counter has {} digits, code length is {}",
            digit_count,
            space.length()
        )));
    }

    let radix = space.alphabet().radix();
    let mut digits = Vec::with_capacity(digit_count);
    for chunk in payload.chunks_exact(2) {
        let digit = u16::from_be_bytes([chunk[0], chunk[1]]);
        if u32::from(digit) >= radix {
            return Err(Error::StateCorruption(format!(
                "counter digit {} is outside radix {}",
                digit, radix
            )));
        }
        digits.push(digit);
    }
    Ok(Counter::Next(digits))
}

/// Encodes the alphabet and code length a store is bound to.
pub fn encode_code_space(space: &CodeSpace) -> Bytes {
    let symbols: String = space.alphabet().symbols().iter().collect();
    let mut buf = BytesMut::with_capacity(6 + symbols.len());
    buf.put_u16(space.length() as u16);
    buf.put_u32(space.alphabet().radix());
    buf.extend_from_slice(symbols.as_bytes());
    buf.freeze()
}

/// Decodes a persisted code space.
///
/// # Errors
///
/// Returns [`Error::StateCorruption`] if the buffer is truncated, the symbols
/// are not UTF-8, the symbol count does not match, or the stored alphabet or
/// length would not be accepted as configuration.
pub fn decode_code_space(data: &[u8]) -> Result<CodeSpace> {
    if data.len() < 6 {
        return Err(Error::StateCorruption(format!(
            "buffer too short for code space: need at least 6 bytes, got {}",
            data.len()
        )));
    }

    let length = u16::from_be_bytes([data[0], data[1]]) as usize;
    let symbol_count = u32::from_be_bytes([data[2], data[3], data[4], data[5]]) as usize;
    let symbols = std::str::from_utf8(&data[6..])
        .map_err(|e| Error::StateCorruption(format!("code space symbols are not UTF-8: {}", e)))?;
    if symbols.chars().count() != symbol_count {
        return Err(Error::StateCorruption(format!(
            "code space declares {} symbols but carries {}",
            symbol_count,
            symbols.chars().count()
        )));
    }

    let alphabet = Alphabet::new(symbols).map_err(invalid_as_corruption)?;
    CodeSpace::new(alphabet, length).map_err(invalid_as_corruption)
}

fn invalid_as_corruption(err: Error) -> Error {
    match err {
        Error::InvalidInput(msg) => Error::StateCorruption(format!("stored code space: {}", msg)),
        other => other,
    }
}

/// Encodes a status as its single persisted byte.
pub fn encode_status(status: CodeStatus) -> Bytes {
    Bytes::copy_from_slice(&[status.as_byte()])
}

/// Decodes a status value.
///
/// # Errors
///
/// Returns [`Error::StateCorruption`] unless the value is exactly one known
/// status byte.
pub fn decode_status(data: &[u8]) -> Result<CodeStatus> {
    match data {
        [byte] => CodeStatus::from_byte(*byte).ok_or_else(|| {
            Error::StateCorruption(format!("unknown status byte 0x{:02x}", byte))
        }),
        _ => Err(Error::StateCorruption(format!(
            "status value must be 1 byte, got {}",
            data.len()
        ))),
    }
}
