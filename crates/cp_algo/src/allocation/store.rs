//! Store allocation: fair-share item targets, then greedy whole-casepack awards.
//!
//! Contract:
//! - Only strictly positive needs carry a target; every other store gets 0.
//! - total_need == 0 → every store 0, no awards (`SupplyMode::NoDemand`).
//! - available_items < total_need → target = need × available_items / total_need
//!   (`Constrained`); otherwise target = need (`Sufficient`).
//! - Awards: repeatedly give one casepack to the store with the largest
//!   remaining target, subtract one casepack of items, until casepacks run out
//!   or no remaining target is positive.
//! - Ties: remaining target ↓, then `StoreId` ↑.
//!
//! Exactness:
//! - Targets are kept as integers scaled by `scale` (total_need when
//!   constrained, 1 otherwise), so pro-rata shares never round and comparisons
//!   never divide. One casepack is `items_per_casepack × scale` scaled units.
//!
//! Performance:
//! - The greedy pops levels `t_i - j·step` in (level ↓, id ↑) order. All levels
//!   strictly above a threshold are awarded in bulk (threshold found by binary
//!   search), then a max-heap awards the few remaining casepacks at the
//!   threshold level. Outcome is identical to the one-at-a-time greedy.

use alloc::collections::BinaryHeap;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use cp_core::{
    determinism::ranks_by_key,
    entities::{Allocation, NeedMap},
};

use crate::aggregate::total_positive_need;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A casepack must carry at least one item.
    ZeroItemsPerCasepack,
    /// Scaled target arithmetic left the 128-bit range.
    Overflow,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::ZeroItemsPerCasepack => write!(f, "items per casepack must be > 0"),
            AllocError::Overflow => write!(f, "store target arithmetic overflow"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}

/// Which target regime applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupplyMode {
    /// No store has a positive need.
    NoDemand,
    /// Supply (in items) below total need: pro-rata targets.
    Constrained,
    /// Supply covers total need: target = need.
    Sufficient,
}

impl SupplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyMode::NoDemand => "no_demand",
            SupplyMode::Constrained => "constrained",
            SupplyMode::Sufficient => "sufficient",
        }
    }
}

/// Store allocation outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorePlan {
    /// Every input store, in input order.
    pub allocation: Allocation,
    pub mode: SupplyMode,
    /// Sum of `allocation`.
    pub allocated: u64,
}

/// Targets in scaled item units: real target = value / scale.
#[derive(Debug)]
struct ScaledTargets {
    mode: SupplyMode,
    scale: u128,
    values: Vec<i128>,
}

/// Allocate `available_casepacks` whole casepacks across `needs`.
pub fn allocate_stores(
    needs: &NeedMap,
    available_casepacks: u64,
    items_per_casepack: u64,
) -> Result<StorePlan, AllocError> {
    if items_per_casepack == 0 {
        return Err(AllocError::ZeroItemsPerCasepack);
    }

    let total_need = total_positive_need(needs);
    if total_need == 0 {
        tracing::debug!(stores = needs.len(), "no positive need; skipping awards");
        return Ok(StorePlan {
            allocation: needs.map_values(|_, _| 0u64),
            mode: SupplyMode::NoDemand,
            allocated: 0,
        });
    }

    let available_items = available_casepacks as u128 * items_per_casepack as u128;
    let targets = fair_share_targets(needs, total_need, available_items)?;

    let step = (items_per_casepack as u128)
        .checked_mul(targets.scale)
        .and_then(|s| i128::try_from(s).ok())
        .ok_or(AllocError::Overflow)?;

    // Equal to available_casepacks; kept in this form to mirror the item budget.
    let casepacks = (available_items / items_per_casepack as u128) as u64;
    debug_assert_eq!(casepacks, available_casepacks);

    let ranks = ranks_by_key(needs);
    let awarded = award_casepacks(&targets.values, &ranks, step, casepacks)?;
    let allocated: u64 = awarded.iter().sum();

    tracing::debug!(
        mode = targets.mode.as_str(),
        allocated,
        available_casepacks,
        "store allocation complete"
    );

    Ok(StorePlan {
        allocation: needs.zip_values(awarded),
        mode: targets.mode,
        allocated,
    })
}

/// Phase A: per-store targets in scaled units (non-positive need → 0).
fn fair_share_targets(
    needs: &NeedMap,
    total_need: u128,
    available_items: u128,
) -> Result<ScaledTargets, AllocError> {
    let (mode, scale, factor) = if available_items < total_need {
        // need × available_items / total_need, scaled by total_need
        (SupplyMode::Constrained, total_need, available_items)
    } else {
        (SupplyMode::Sufficient, 1, 1)
    };

    let values = needs
        .values()
        .map(|&need| {
            if need <= 0 {
                return Ok(0);
            }
            (need as u128)
                .checked_mul(factor)
                .and_then(|v| i128::try_from(v).ok())
                .ok_or(AllocError::Overflow)
        })
        .collect::<Result<Vec<i128>, AllocError>>()?;

    Ok(ScaledTargets { mode, scale, values })
}

/// Heap entry: a store's current remaining target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Candidate {
    remaining: i128,
    rank: usize,
    pos: usize,
}

impl Ord for Candidate {
    /// Larger remaining first; on equal remaining the smaller id rank wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.rank.cmp(&self.rank))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Phase B: award `casepacks` one at a time to the largest remaining target.
fn award_casepacks(
    targets: &[i128],
    ranks: &[usize],
    step: i128,
    casepacks: u64,
) -> Result<Vec<u64>, AllocError> {
    debug_assert!(step > 0);
    let mut awarded = vec![0u64; targets.len()];
    let mut remaining: Vec<i128> = targets.to_vec();

    // Bulk: every level strictly above `threshold` is taken before any level at
    // or below it, and there are at most `casepacks` such levels.
    let threshold = award_threshold(targets, step, casepacks);
    let mut left = casepacks;
    for (pos, t) in remaining.iter_mut().enumerate() {
        let n = levels_above(*t, threshold, step);
        if n == 0 {
            continue;
        }
        let n64 = u64::try_from(n).map_err(|_| AllocError::Overflow)?;
        let spent = (n as i128).checked_mul(step).ok_or(AllocError::Overflow)?;
        awarded[pos] = n64;
        *t -= spent;
        left -= n64;
    }
    tracing::trace!(%threshold, bulk = casepacks - left, left, "bulk awards placed");

    // Heap: remaining awards, one casepack per pop.
    let mut heap: BinaryHeap<Candidate> = remaining
        .iter()
        .enumerate()
        .filter(|(_, &r)| r > 0)
        .map(|(pos, &r)| Candidate { remaining: r, rank: ranks[pos], pos })
        .collect();

    while left > 0 {
        let Some(mut best) = heap.pop() else { break };
        awarded[best.pos] += 1;
        left -= 1;
        best.remaining -= step;
        if best.remaining > 0 {
            heap.push(best);
        }
    }

    Ok(awarded)
}

/// Number of a store's levels `t - j·step` (j ≥ 0) that are strictly greater
/// than `v`. With v ≥ 0 these are also the positive levels above v.
fn levels_above(t: i128, v: i128, step: i128) -> u128 {
    if t <= v {
        return 0;
    }
    let gap = (t - v) as u128;
    let step = step as u128;
    gap / step + u128::from(gap % step != 0)
}

/// Smallest v ≥ 0 such that the levels above v number at most `casepacks`.
fn award_threshold(targets: &[i128], step: i128, casepacks: u64) -> i128 {
    let count = |v: i128| -> u128 {
        targets
            .iter()
            .fold(0u128, |acc, &t| acc.saturating_add(levels_above(t, v, step)))
    };
    let budget = casepacks as u128;
    let (mut lo, mut hi) = (0i128, targets.iter().copied().max().unwrap_or(0).max(0));
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if count(mid) <= budget {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}
