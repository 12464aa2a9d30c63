// crates/cp_algo/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

// Core IDs and request maps
pub use cp_core::{
    entities::{Allocation, Bundle, Distribution, NeedMap, SupplyMap},
    ids::{StoreId, WarehouseId},
};

// ----------------------------- Sizing & totals ---------------------------------------

pub mod aggregate;
pub mod bundle;

pub use aggregate::{aggregate, total_available_casepacks, total_positive_need, Totals};
pub use bundle::items_per_casepack;

// ----------------------------- Allocation (public surface) ---------------------------

pub mod allocation {
    // File modules (actual implementations)
    pub mod store;
    pub mod warehouse;

    // Pipeline-friendly names as plain aliases.
    pub use store::allocate_stores as store_allocate;
    pub use warehouse::distribute_warehouses as warehouse_distribute;

    pub use store::{StorePlan, SupplyMode};
    pub use warehouse::{DistributionMode, WarehousePlan};

    // Error type aliases for ergonomic matching in callers.
    pub type StoreAllocError = store::AllocError;
    pub type WarehouseDistError = warehouse::DistError;
}

// Convenience re-exports (pipeline imports these from crate root)
pub use allocation::{DistributionMode, StorePlan, SupplyMode, WarehousePlan};
pub use bundle::BundleError;
pub use aggregate::AggregateError;
