//! Card value objects: compared by value, validated at construction.

use serde::{Deserialize, Serialize};

use cardbank_core::{DomainError, DomainResult, ValueObject};

use crate::error::AccountError;

/// Opaque card number. Uniqueness is the caller's concern; this type only
/// guarantees the value is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(String);

impl CardNumber {
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::validation("card number must not be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for CardNumber {}

/// Card expiry as a year-month pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardExpiry {
    year: u16,
    month: u8,
}

impl CardExpiry {
    pub fn new(year: u16, month: u8) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "expiry month {month} out of range (1-12)"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }
}

impl core::fmt::Display for CardExpiry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

impl ValueObject for CardExpiry {}

/// 4-digit card pin, always in 1000-9999.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Pin(u16);

impl Pin {
    pub const MIN: u16 = 1000;
    pub const MAX: u16 = 9999;

    pub fn new(pin: u16) -> Result<Self, AccountError> {
        if !(Self::MIN..=Self::MAX).contains(&pin) {
            return Err(AccountError::InvalidPin { pin });
        }
        Ok(Self(pin))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

// Keep pins out of logs.
impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Pin(****)")
    }
}

impl ValueObject for Pin {}
