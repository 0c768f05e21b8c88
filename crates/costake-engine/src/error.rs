//! Error types for the co-staking rewards engine

use costake_core::CoreError;
use costake_store::StoreError;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, CostakingError>;

/// Errors that can occur in co-staking operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostakingError {
    // === Governance ===
    /// Params bound violated
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Message signer is not the governance authority
    #[error("Unauthorized: expected authority {expected}, got {got}")]
    Unauthorized { expected: String, got: String },

    // === Reward accounting ===
    /// Tracker starts after the requested end period
    #[error("Invalid period: start {start} is after end {end}")]
    InvalidPeriod { start: u64, end: u64 },

    /// Cumulative rewards decreased between two periods
    #[error("Negative rewards between periods {start} and {end} for denom {denom}")]
    NegativeRewards { start: u64, end: u64, denom: String },

    /// Amount cannot be represented or is malformed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A tracker field would drop below zero
    #[error("Negative {field} for costaker {address}")]
    NegativeAmount { field: &'static str, address: String },

    /// Arithmetic overflow
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// State that must exist is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// State is inconsistent
    #[error("Invariant violated: {0}")]
    Invariant(String),

    // === Inputs ===
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Config error: {0}")]
    Config(String),

    // === Collaborators ===
    /// Storage error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Bank, staking, distribution or finality keeper failure
    #[error("{module} module error: {reason}")]
    External { module: &'static str, reason: String },
}

impl CostakingError {
    /// Wrap a collaborator failure
    pub fn external(module: &'static str, reason: impl ToString) -> Self {
        Self::External {
            module,
            reason: reason.to_string(),
        }
    }

    /// Registered error code
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidParams(_) => 1101,
            Self::InvalidPeriod { .. } => 1102,
            Self::NegativeRewards { .. } => 1103,
            Self::InvalidAmount(_) | Self::NegativeAmount { .. } => 1104,
            Self::Overflow(_) => 1105,
            Self::NotFound(_) => 1106,
            Self::Unauthorized { .. } => 1107,
            Self::InvalidAddress(_) => 1108,
            Self::InvalidGenesis(_) => 1109,
            Self::Invariant(_) => 1110,
            Self::Store(_) => 1111,
            Self::External { .. } => 1112,
            Self::Config(_) => 1113,
        }
    }

    /// Errors that signal corrupted state rather than bad input
    pub fn is_state_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidPeriod { .. } | Self::NegativeRewards { .. } | Self::Invariant(_)
        )
    }
}

impl From<CoreError> for CostakingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Overflow(op) => Self::Overflow(op.to_string()),
            CoreError::InvalidAddress(msg) => Self::InvalidAddress(msg),
            other => Self::InvalidAmount(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CostakingError::InvalidPeriod { start: 3, end: 2 }.code(), 1102);
        assert_eq!(CostakingError::external("bank", "insufficient funds").code(), 1112);
    }

    #[test]
    fn test_core_error_mapping() {
        let err: CostakingError = CoreError::Overflow("Coins::checked_mul_int").into();
        assert!(matches!(err, CostakingError::Overflow(_)));
        let err: CostakingError = CoreError::DivisionByZero.into();
        assert!(matches!(err, CostakingError::InvalidAmount(_)));
    }

    #[test]
    fn test_state_corruption() {
        assert!(CostakingError::Invariant("x".into()).is_state_corruption());
        assert!(!CostakingError::NotFound("x".into()).is_state_corruption());
    }
}
