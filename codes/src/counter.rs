//! The persisted odometer that enumerates the code space.
//!
//! A [`Counter`] holds one digit per code position, most significant first.
//! Read as a base-B number it equals the count of codes already issued, and
//! its digits, rendered through the alphabet, are the next code to issue.
//! Advancing it is an increment with carry; carrying out of the most
//! significant position leaves it [`Counter::Exhausted`].

use num_bigint::BigUint;

/// State of the odometer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counter {
    /// Digits of the next code to issue, most significant first.
    Next(Vec<u16>),
    /// Every code has been issued.
    Exhausted,
}

impl Counter {
    /// The counter of a store that has issued nothing.
    pub fn zero(length: usize) -> Self {
        Counter::Next(vec![0; length])
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Counter::Exhausted)
    }

    /// Returns the counter one step further, carrying from the rightmost
    /// position.
    pub fn advance(&self, radix: u32) -> Counter {
        let Counter::Next(digits) = self else {
            return Counter::Exhausted;
        };

        let mut digits = digits.clone();
        for digit in digits.iter_mut().rev() {
            if u32::from(*digit) + 1 < radix {
                *digit += 1;
                return Counter::Next(digits);
            }
            *digit = 0;
        }
        Counter::Exhausted
    }

    /// Number of codes issued so far, or `None` once exhausted.
    pub fn consumed(&self, radix: u32) -> Option<BigUint> {
        let Counter::Next(digits) = self else {
            return None;
        };

        let radix = BigUint::from(radix);
        let consumed = digits
            .iter()
            .fold(BigUint::from(0u32), |acc, &digit| acc * &radix + u32::from(digit));
        Some(consumed)
    }
}
