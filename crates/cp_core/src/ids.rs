//! crates/cp_core/src/ids.rs
//! Store and warehouse identifier tokens.
//! Deterministic, strict shapes; no I/O.
//!
//! Identifiers are caller-chosen (they arrive as JSON object keys), so the
//! accepted shape is deliberately wide: 1..=256 bytes, no control characters.
//! Ordering is byte-wise lexicographic and is the tie-break order everywhere.

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const MAX_ID_LEN: usize = 256;

/// Non-empty, bounded, and free of control characters (incl. NUL).
#[inline]
pub fn is_valid_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_ID_LEN && !s.chars().any(char::is_control)
}

macro_rules! def_id {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if is_valid_id(s) { Ok($name(s.to_owned())) } else { Err(CoreError::InvalidId) }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                if is_valid_id(&value) { Ok($name(value)) } else { Err(CoreError::InvalidId) }
            }
        }

        impl From<$name> for String {
            #[inline]
            fn from(id: $name) -> String { id.0 }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str { &self.0 }
        }
    }
}

def_id!(
    /// Demand point identifier (key of `needPerStore`).
    StoreId
);
def_id!(
    /// Supply source identifier (key of `warehouseAvailableQty`).
    WarehouseId
);
