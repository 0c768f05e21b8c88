//! Account, validator and consensus addresses
//!
//! Addresses are raw byte strings of 20 or 32 bytes. They render as lowercase
//! hex and are keyed in the store with a one-byte length prefix so that prefix
//! iteration stays unambiguous.

use crate::error::{CoreError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Accepted address lengths in bytes
pub const ADDRESS_LENGTHS: [usize; 2] = [20, 32];

fn check_length(bytes: &[u8]) -> Result<()> {
    if ADDRESS_LENGTHS.contains(&bytes.len()) {
        Ok(())
    } else {
        Err(CoreError::InvalidAddress(format!(
            "expected 20 or 32 bytes, got {}",
            bytes.len()
        )))
    }
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Build from raw bytes, rejecting unsupported lengths
            pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
                let bytes = bytes.into();
                check_length(&bytes)?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// Parse from hex string
            pub fn from_hex(s: &str) -> Result<Self> {
                let bytes = hex::decode(s).map_err(|e| CoreError::InvalidAddress(e.to_string()))?;
                Self::new(bytes)
            }

            /// Store key form: `len || bytes`
            pub fn length_prefixed(&self) -> Vec<u8> {
                let mut out = Vec::with_capacity(self.0.len() + 1);
                out.push(self.0.len() as u8);
                out.extend_from_slice(&self.0);
                out
            }

            /// Decode a length-prefixed address from the front of `bytes`,
            /// returning the address and the remaining bytes
            pub fn split_length_prefixed(bytes: &[u8]) -> Result<(Self, &[u8])> {
                let (&len, rest) = bytes
                    .split_first()
                    .ok_or_else(|| CoreError::InvalidAddress("empty key".to_string()))?;
                let len = len as usize;
                if rest.len() < len {
                    return Err(CoreError::InvalidAddress("truncated key".to_string()));
                }
                let (addr, rest) = rest.split_at(len);
                Ok((Self::new(addr.to_vec())?, rest))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let hex = self.to_hex();
                write!(f, "{}({})", stringify!($name), &hex[..12])
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let s = String::deserialize(deserializer)?;
                    Self::from_hex(&s).map_err(de::Error::custom)
                } else {
                    let bytes = <Vec<u8>>::deserialize(deserializer)?;
                    Self::new(bytes).map_err(de::Error::custom)
                }
            }
        }
    };
}

address_type!(
    /// Account address (delegators, co-stakers, module accounts)
    AccAddress
);

address_type!(
    /// Validator operator address
    ValAddress
);

address_type!(
    /// Validator consensus address, as found in commit vote infos
    ConsAddress
);

address_type!(
    /// Finality provider address on the BTC staking side
    FpAddress
);

impl AccAddress {
    /// Deterministic address of a module account: `blake3(name)[..20]`
    pub fn for_module(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        Self(hash.as_bytes()[..20].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_validation() {
        assert!(AccAddress::new(vec![1u8; 20]).is_ok());
        assert!(AccAddress::new(vec![1u8; 32]).is_ok());
        assert!(AccAddress::new(vec![1u8; 19]).is_err());
        assert!(ValAddress::from_hex("zz").is_err());
    }

    #[test]
    fn test_length_prefixed_split() {
        let val = ValAddress::new(vec![7u8; 20]).unwrap();
        let del = AccAddress::new(vec![9u8; 32]).unwrap();
        let mut key = val.length_prefixed();
        key.extend(del.length_prefixed());

        let (val2, rest) = ValAddress::split_length_prefixed(&key).unwrap();
        let (del2, rest) = AccAddress::split_length_prefixed(rest).unwrap();
        assert_eq!(val, val2);
        assert_eq!(del, del2);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_module_address_is_stable() {
        let a = AccAddress::for_module("costaking");
        let b = AccAddress::for_module("costaking");
        assert_eq!(a, b);
        assert_ne!(a, AccAddress::for_module("fee_collector"));
        assert_eq!(a.as_bytes().len(), 20);
    }

    #[test]
    fn test_hex_roundtrip_display() {
        let addr = AccAddress::new(vec![0xab; 20]).unwrap();
        let parsed: AccAddress = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }
}
