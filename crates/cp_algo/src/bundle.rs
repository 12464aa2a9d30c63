//! Bundle sizer: items carried by one casepack.
//!
//! The sum of the size ratios is the divisor of every later casepack
//! conversion, so an empty bundle or a non-positive sum is rejected here.

use core::fmt;

use cp_core::entities::Bundle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// No size ratios at all.
    Empty,
    /// Ratios sum to zero or less.
    NonPositiveSum(i128),
    /// Ratio sum exceeds `u64`.
    Overflow,
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::Empty => write!(f, "bundle has no size ratios"),
            BundleError::NonPositiveSum(s) => write!(f, "bundle ratios sum to {s}, must be > 0"),
            BundleError::Overflow => write!(f, "bundle ratio sum exceeds u64"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BundleError {}

/// Sum of the bundle's ratios. Individual non-positive ratios are tolerated
/// as long as the total stays positive.
pub fn items_per_casepack(bundle: &Bundle) -> Result<u64, BundleError> {
    if bundle.is_empty() {
        return Err(BundleError::Empty);
    }
    // i64 terms summed in i128 cannot overflow below 2^64 terms.
    let sum: i128 = bundle.ratios().iter().map(|&r| r as i128).sum();
    if sum <= 0 {
        return Err(BundleError::NonPositiveSum(sum));
    }
    u64::try_from(sum).map_err(|_| BundleError::Overflow)
}
