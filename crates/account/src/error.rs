use thiserror::Error;

use cardbank_core::DomainError;

/// Account operation error.
///
/// `InsufficientFunds` and `InvalidPin` are recoverable: the operation simply
/// does not apply and the caller decides what to do. Construction/amount
/// validation failures surface as [`DomainError::Validation`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Spend would drive the balance below zero. No mutation, no event.
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    /// Pin outside the 4-digit range (1000-9999). The old pin is kept.
    #[error("invalid pin {pin}: must be a 4-digit number (1000-9999)")]
    InvalidPin { pin: u16 },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
