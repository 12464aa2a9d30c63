//! Warehouse distribution: spread the allocated casepack total back over the
//! warehouses that supplied it.
//!
//! - capacity = max(supply, 0)
//! - allocated == Σ capacity → drain every warehouse (`DrainAll`)
//! - allocated  > Σ capacity → `DistError::ExceedsSupply`
//! - otherwise, in ascending `WarehouseId` order:
//!   share = round_half_up(capacity × allocated / Σ capacity), clamped to the
//!   capacity and to what is still unassigned; then round-robin one unit at a
//!   time to warehouses with spare capacity until nothing is unassigned.
//!
//! Output keeps input order and sums to `allocated` exactly.

use alloc::vec::Vec;
use core::fmt;

use cp_core::{
    determinism::indices_by_key,
    entities::{Distribution, SupplyMap},
    rounding::proportional_share,
};

use crate::aggregate::capacity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistError {
    /// More casepacks allocated than the warehouses hold.
    ExceedsSupply { allocated: u64, available: u64 },
    /// A full reconciliation pass placed nothing with units still unassigned.
    NoSpareCapacity { remaining: u64 },
    /// Supply total or share product out of range.
    Overflow,
}

impl fmt::Display for DistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistError::ExceedsSupply { allocated, available } => write!(
                f,
                "allocated {allocated} casepacks but warehouses hold only {available}"
            ),
            DistError::NoSpareCapacity { remaining } => write!(
                f,
                "reconciliation stalled with {remaining} casepacks unassigned"
            ),
            DistError::Overflow => write!(f, "warehouse share arithmetic overflow"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DistError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistributionMode {
    /// Allocation equals total capacity; every warehouse drained.
    DrainAll,
    /// Proportional shares plus round-robin reconciliation.
    FairShare,
}

impl DistributionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionMode::DrainAll => "drain_all",
            DistributionMode::FairShare => "fair_share",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarehousePlan {
    /// Every input warehouse, in input order.
    pub distribution: Distribution,
    pub mode: DistributionMode,
    /// Units placed by the round-robin pass after proportional shares.
    pub reconciled: u64,
}

pub fn distribute_warehouses(
    supply: &SupplyMap,
    total_allocated: u64,
) -> Result<WarehousePlan, DistError> {
    let caps: Vec<u64> = supply.values().map(|&s| capacity(s)).collect();
    let total_available = caps
        .iter()
        .try_fold(0u64, |acc, &c| acc.checked_add(c))
        .ok_or(DistError::Overflow)?;

    if total_allocated > total_available {
        return Err(DistError::ExceedsSupply {
            allocated: total_allocated,
            available: total_available,
        });
    }

    if total_allocated == total_available {
        tracing::debug!(total_allocated, "allocation drains every warehouse");
        return Ok(WarehousePlan {
            distribution: supply.zip_values(caps),
            mode: DistributionMode::DrainAll,
            reconciled: 0,
        });
    }

    // From here 0 <= total_allocated < total_available, so the divisor is positive.
    let order = indices_by_key(supply);
    let mut drawn = alloc::vec![0u64; caps.len()];
    let mut remaining = total_allocated;

    for &pos in &order {
        let share = proportional_share(
            caps[pos] as u128,
            total_allocated as u128,
            total_available as u128,
        )
        .map_err(|_| DistError::Overflow)?;
        // share <= cap after the clamp, and cap fits in u64
        let share = (share.min(caps[pos] as u128) as u64).min(remaining);
        drawn[pos] = share;
        remaining -= share;
    }

    let reconciled = remaining;
    if remaining > 0 {
        reconcile(&mut drawn, &caps, &order, remaining)?;
    }

    tracing::debug!(
        total_allocated,
        total_available,
        reconciled,
        "warehouse distribution complete"
    );

    Ok(WarehousePlan {
        distribution: supply.zip_values(drawn),
        mode: DistributionMode::FairShare,
        reconciled,
    })
}

/// Round-robin one unit per warehouse with spare capacity, in `order`, until
/// `remaining` is exhausted. A pass that places nothing is an error.
fn reconcile(
    drawn: &mut [u64],
    caps: &[u64],
    order: &[usize],
    mut remaining: u64,
) -> Result<(), DistError> {
    while remaining > 0 {
        let mut placed = 0u64;
        for &pos in order {
            if remaining == 0 {
                break;
            }
            if drawn[pos] < caps[pos] {
                drawn[pos] += 1;
                remaining -= 1;
                placed += 1;
            }
        }
        if placed == 0 {
            tracing::warn!(remaining, "reconciliation pass placed nothing");
            return Err(DistError::NoSpareCapacity { remaining });
        }
        tracing::trace!(placed, remaining, "reconciliation pass");
    }
    Ok(())
}
