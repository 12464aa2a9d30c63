//! cp_core: core types, ordered maps, rounding, and stable ordering helpers.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`cp_algo`, `cp_io`, `cp_pipeline`, `cp_cli`).
//!
//! - Identifier tokens: `StoreId`, `WarehouseId`
//! - Insertion-ordered, duplicate-free `OrderedMap` and the request maps built on it
//! - `Bundle` (size ratios of one casepack)
//! - Integer-first rounding helpers (round-half-up, exact)
//! - Deterministic ordering helpers used for tie-breaks
//!
//! Serialization impls are gated behind the `serde` feature.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors {
    use alloc::string::String;
    use core::fmt;

    /// Minimal error set for core-domain validation & arithmetic.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        /// Identifier is empty, too long, or contains control characters.
        InvalidId,
        /// Same key supplied twice for an ordered map.
        DuplicateKey(String),
        /// Division by zero requested from a rounding helper.
        ZeroDenominator,
        /// Intermediate product does not fit the working integer width.
        Overflow,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidId => write!(f, "invalid id"),
                CoreError::DuplicateKey(k) => write!(f, "duplicate key: {k}"),
                CoreError::ZeroDenominator => write!(f, "zero denominator"),
                CoreError::Overflow => write!(f, "arithmetic overflow"),
            }
        }
    }

    #[cfg(feature = "std")]
    impl std::error::Error for CoreError {}
}

pub mod determinism;
pub mod entities;
pub mod ids;
pub mod rounding;

pub use entities::{Allocation, Bundle, Distribution, NeedMap, OrderedMap, SupplyMap};
pub use errors::CoreError;
pub use ids::{StoreId, WarehouseId};
