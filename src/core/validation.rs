//! Field validation shared by the create operations.
//!
//! Failures are reported as [`Error::Validation`] naming the field, before
//! anything is written.

use crate::errors::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

// Both patterns are literals and known to compile.
#[allow(clippy::unwrap_used)]
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?\d{7,15}$").unwrap());

#[allow(clippy::unwrap_used)]
static PINCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,10}$").unwrap());

/// Rejects empty or whitespace-only values.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation {
            field,
            message: "cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// Phone numbers: optional leading `+`, then 7 to 15 digits.
pub fn validate_phone(value: &str) -> Result<()> {
    if PHONE_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::Validation {
            field: "phone",
            message: "must be 7-15 digits with an optional leading '+'".to_string(),
        })
    }
}

/// Postal codes: 4 to 10 digits.
pub fn validate_pincode(field: &'static str, value: &str) -> Result<()> {
    if PINCODE_PATTERN.is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::Validation {
            field,
            message: "must be between 4 and 10 digits".to_string(),
        })
    }
}

/// Finite, non-negative money amount.
pub fn validate_non_negative_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Finite, strictly positive money amount.
pub fn validate_positive_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}
