//! Demand/supply aggregation.
//!
//! - Total need counts strictly positive needs only.
//! - Available casepacks count each warehouse at `max(supply, 0)`.
//! - Available items = casepacks × items per casepack (u128, cannot overflow
//!   from u64 × u64).

use core::fmt;

use cp_core::entities::{NeedMap, SupplyMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// Sum of warehouse supplies does not fit in `u64`.
    SupplyOverflow,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::SupplyOverflow => write!(f, "total warehouse supply exceeds u64"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AggregateError {}

/// Request-level totals consumed by the allocator and echoed in the run record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Totals {
    pub items_per_casepack: u64,
    /// Sum of strictly positive needs, in items.
    pub total_need: u128,
    pub available_casepacks: u64,
    pub available_items: u128,
    pub store_count: usize,
    pub warehouse_count: usize,
}

/// Warehouse capacity used by every supply computation.
#[inline]
pub fn capacity(supply: i64) -> u64 {
    supply.max(0) as u64
}

/// Sum of needs > 0.
pub fn total_positive_need(needs: &NeedMap) -> u128 {
    needs.values().filter(|&&n| n > 0).map(|&n| n as u128).sum()
}

/// Sum of clamped warehouse supplies.
pub fn total_available_casepacks(supply: &SupplyMap) -> Result<u64, AggregateError> {
    supply
        .values()
        .try_fold(0u64, |acc, &s| acc.checked_add(capacity(s)))
        .ok_or(AggregateError::SupplyOverflow)
}

pub fn aggregate(
    needs: &NeedMap,
    supply: &SupplyMap,
    items_per_casepack: u64,
) -> Result<Totals, AggregateError> {
    let available_casepacks = total_available_casepacks(supply)?;
    let totals = Totals {
        items_per_casepack,
        total_need: total_positive_need(needs),
        available_casepacks,
        available_items: available_casepacks as u128 * items_per_casepack as u128,
        store_count: needs.len(),
        warehouse_count: supply.len(),
    };
    tracing::debug!(
        items_per_casepack,
        total_need = %totals.total_need,
        available_casepacks,
        "aggregated demand and supply"
    );
    Ok(totals)
}
