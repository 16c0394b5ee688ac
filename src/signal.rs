//! Covert throttle signal carried in the `x` field of signed responses.
//!
//! The field is always a plain string of decimal digits. Its meaning is in the
//! digit sum: a client hashes its own code value, sums the decimal digits of
//! the hex digest, and compares with the digit sum of `x`.
//!
//! - equal: [`Signal::Proceed`]
//! - different: [`Signal::BackOff`]
//!
//! There is no status field to strip; a tampered `x` also breaks the response
//! signature.

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::models::AttemptCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Client is in good standing for this request.
    Proceed,
    /// Client should stop: rate limited, or the code is not usable.
    BackOff,
}

impl Signal {
    pub fn back_off_if(condition: bool) -> Self {
        if condition {
            Signal::BackOff
        } else {
            Signal::Proceed
        }
    }
}

/// Hex SHA-256 of the code value.
pub fn code_digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Sum of the decimal digit characters in `s`; other characters are ignored.
pub fn digit_sum(s: &str) -> u32 {
    s.chars().filter_map(|c| c.to_digit(10)).sum()
}

/// The digit sum a `Proceed` signal must hit for this code value.
pub fn target_sum(value: &str) -> u32 {
    digit_sum(&code_digest(value))
}

/// Encode `signal` for `value` using the thread-local RNG.
pub fn encode(value: &str, signal: Signal) -> String {
    encode_with(value, signal, &mut rand::thread_rng())
}

pub fn encode_with<R: Rng + ?Sized>(value: &str, signal: Signal, rng: &mut R) -> String {
    let target = target_sum(value);
    match signal {
        Signal::Proceed => digits_summing_to(target, rng),
        Signal::BackOff if target == 0 => rng.gen_range(1..10u32).to_string(),
        Signal::BackOff => digits_summing_to(rng.gen_range(0..target), rng),
    }
}

/// Client-side reading of an `x` field.
pub fn decode(value: &str, x: &str) -> Signal {
    Signal::back_off_if(digit_sum(x) != target_sum(value))
}

/// Random digit string with the given digit sum.
///
/// Draws digits 0-9 and keeps those that do not overshoot, so the loop always
/// lands on the exact sum.
fn digits_summing_to<R: Rng + ?Sized>(sum: u32, rng: &mut R) -> String {
    if sum == 0 {
        return "0".to_string();
    }

    let mut out = String::new();
    let mut current = 0;
    while current != sum {
        let digit = rng.gen_range(0..10u32);
        if current + digit <= sum {
            out.push(char::from_digit(digit, 10).unwrap_or('0'));
            current += digit;
        }
    }
    out
}

/// Attempt thresholds above which activation responses carry `BackOff`.
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    /// Attempts tolerated in the trailing hour
    pub hourly_limit: i64,
    /// Attempts tolerated over the lifetime of the code
    pub total_limit: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            hourly_limit: 3,
            total_limit: 5,
        }
    }
}

impl ThrottlePolicy {
    pub fn is_throttled(&self, counts: AttemptCounts) -> bool {
        counts.last_hour > self.hourly_limit || counts.total > self.total_limit
    }

    pub fn signal_for(&self, counts: AttemptCounts) -> Signal {
        Signal::back_off_if(self.is_throttled(counts))
    }
}
