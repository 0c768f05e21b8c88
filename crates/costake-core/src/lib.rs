//! # Co-staking Core
//!
//! Value types shared by the co-staking rewards engine:
//! - `AccAddress` / `ValAddress` / `ConsAddress` / `FpAddress` - hex-rendered byte addresses
//! - `Dec` - 18-digit unsigned fixed point (portions, shares, fractions)
//! - `Coins` / `DecCoins` - denom-keyed amount sets with checked arithmetic
//!
//! Coin amounts are 256-bit (`ethnum::U256`). Arithmetic never wraps: every
//! operation that can overflow or go negative returns a `CoreError`.

pub mod address;
pub mod coins;
pub mod dec;
pub mod error;
pub mod uint;

pub use address::*;
pub use coins::*;
pub use dec::*;
pub use error::*;
pub use uint::{mul_div_floor, to_u128, U256};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::address::{AccAddress, ConsAddress, FpAddress, ValAddress};
    pub use crate::coins::{Coin, Coins, DecCoin, DecCoins};
    pub use crate::dec::Dec;
    pub use crate::error::CoreError;
    pub use crate::uint::U256;
}
