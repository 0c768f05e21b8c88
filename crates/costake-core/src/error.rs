//! Error types for co-staking value types

use thiserror::Error;

/// Result type alias for core value operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while parsing or doing arithmetic on core values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // === Parsing ===
    /// Address bytes or hex encoding is malformed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Denomination does not match the allowed pattern
    #[error("Invalid denom: {0}")]
    InvalidDenom(String),

    /// Decimal string cannot be parsed
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    /// Coin set is malformed (duplicates, bad amount)
    #[error("Invalid coins: {0}")]
    InvalidCoins(String),

    /// Integer amount is not a base-10 number
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // === Arithmetic ===
    /// Result does not fit into 256 bits
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// Subtraction would produce a negative amount
    #[error("Negative amount for denom {denom}")]
    NegativeAmount { denom: String },

    /// Division by zero
    #[error("Division by zero")]
    DivisionByZero,
}
