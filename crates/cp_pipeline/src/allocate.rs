//! ALLOCATE stage: bundle size → totals → store allocation → warehouse
//! distribution, followed by a self-check of the conservation and capacity
//! post-conditions. Any failed check is an invariant violation, never a
//! silently wrong artifact.

use cp_algo::{
    aggregate, aggregate::capacity,
    allocation::{store_allocate, warehouse_distribute, StoreAllocError, WarehouseDistError},
    items_per_casepack, StorePlan, Totals, WarehousePlan,
};

use crate::load::AllocationRequest;
use crate::validate::{bundle_issue, ValidationReport};
use crate::PipelineError;

/// Everything the core computed for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub totals: Totals,
    pub stores: StorePlan,
    pub warehouses: WarehousePlan,
    /// available casepacks − allocated casepacks
    pub remaining_supply: u64,
}

pub fn allocate(req: &AllocationRequest) -> Result<AllocationOutcome, PipelineError> {
    let ipc = items_per_casepack(&req.bundle).map_err(|e| {
        PipelineError::from_report(ValidationReport::from_issues(vec![bundle_issue(&e)]))
    })?;

    let totals = aggregate(&req.needs, &req.supply, ipc)
        .map_err(|e| PipelineError::Overflow(e.to_string()))?;

    let stores = store_allocate(&req.needs, totals.available_casepacks, ipc).map_err(|e| match e {
        StoreAllocError::Overflow => PipelineError::Overflow(e.to_string()),
        StoreAllocError::ZeroItemsPerCasepack => PipelineError::Invariant(e.to_string()),
    })?;

    let warehouses = warehouse_distribute(&req.supply, stores.allocated).map_err(|e| match e {
        WarehouseDistError::Overflow => PipelineError::Overflow(e.to_string()),
        WarehouseDistError::ExceedsSupply { .. } | WarehouseDistError::NoSpareCapacity { .. } => {
            PipelineError::Invariant(e.to_string())
        }
    })?;

    let remaining_supply = totals
        .available_casepacks
        .checked_sub(stores.allocated)
        .ok_or_else(|| PipelineError::Invariant("allocated more casepacks than available".into()))?;

    let outcome = AllocationOutcome { totals, stores, warehouses, remaining_supply };
    verify(req, &outcome)?;

    tracing::info!(
        items_per_casepack = ipc,
        allocated = outcome.stores.allocated,
        available = outcome.totals.available_casepacks,
        remaining_supply,
        supply_mode = outcome.stores.mode.as_str(),
        distribution_mode = outcome.warehouses.mode.as_str(),
        "allocation complete"
    );
    Ok(outcome)
}

/// Post-conditions every outcome must satisfy.
fn verify(req: &AllocationRequest, out: &AllocationOutcome) -> Result<(), PipelineError> {
    let inv = |msg: String| Err(PipelineError::Invariant(msg));

    let store_sum: u64 = out.stores.allocation.values().sum();
    if store_sum != out.stores.allocated {
        return inv(format!("store sum {store_sum} != reported {}", out.stores.allocated));
    }
    for ((id, &need), (_, &got)) in req.needs.iter().zip(out.stores.allocation.iter()) {
        if need <= 0 && got != 0 {
            return inv(format!("store {id} with need {need} received {got}"));
        }
    }

    let mut drawn: u64 = 0;
    for ((id, &supply), (_, &got)) in req.supply.iter().zip(out.warehouses.distribution.iter()) {
        if got > capacity(supply) {
            return inv(format!("warehouse {id} drew {got} of {}", capacity(supply)));
        }
        drawn += got;
    }
    if drawn != store_sum {
        return inv(format!("warehouses drew {drawn} but stores received {store_sum}"));
    }
    if out.remaining_supply + store_sum != out.totals.available_casepacks {
        return inv("remaining supply does not balance".to_string());
    }
    Ok(())
}
