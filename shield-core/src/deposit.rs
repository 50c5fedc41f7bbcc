//! ETH-denominated deposit amounts.

use crate::constants::{WEI_DECIMALS, WEI_PER_ETH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepositError {
    #[error("deposit amount is empty")]
    Empty,

    #[error("deposit amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("deposit amount does not fit in wei: {0}")]
    Overflow(String),
}

/// Convert a decimal ETH string to wei (×10^18), truncating extra fractional digits toward zero.
///
/// Accepted syntax: `digits`, `digits.digits` or `.digits`, with surrounding whitespace.
pub fn parse_eth_to_wei(input: &str) -> Result<u128, DepositError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DepositError::Empty);
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((int_part, frac_part)) => {
            if frac_part.is_empty() {
                return Err(DepositError::Malformed(input.to_string()));
            }
            (int_part, frac_part)
        }
        None => (s, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(DepositError::Malformed(input.to_string()));
    }

    let overflow = || DepositError::Overflow(input.to_string());

    let whole = digits_to_u128(int_part).ok_or_else(overflow)?;

    // Anything past the 18th fractional digit is below one wei.
    let kept = &frac_part[..frac_part.len().min(WEI_DECIMALS as usize)];
    let scale = 10u128.pow(WEI_DECIMALS - kept.len() as u32);
    let fraction = digits_to_u128(kept).ok_or_else(overflow)? * scale;

    whole
        .checked_mul(WEI_PER_ETH)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(overflow)
}

fn digits_to_u128(digits: &str) -> Option<u128> {
    digits.bytes().try_fold(0u128, |acc, b| {
        acc.checked_mul(10)?.checked_add(u128::from(b - b'0'))
    })
}

/// Render a wei amount as a decimal ETH string without trailing zeros (`10^16` → `"0.01"`).
pub fn format_wei(wei: u128) -> String {
    let whole = wei / WEI_PER_ETH;
    let fraction = wei % WEI_PER_ETH;
    if fraction == 0 {
        return whole.to_string();
    }

    let frac = format!("{:0width$}", fraction, width = WEI_DECIMALS as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
