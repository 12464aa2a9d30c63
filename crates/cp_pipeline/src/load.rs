//! LOAD stage: wire document → typed domain request.
//!
//! Runs after VALIDATE, so failures here only happen when the stage is called
//! directly; they are reported with the same issue codes validation would use.

use std::str::FromStr;

use cp_core::{Bundle, NeedMap, OrderedMap, StoreId, SupplyMap, WarehouseId};
use cp_io::loader::RequestDoc;

use crate::validate::{EntityRef, ValidationIssue, ValidationReport};
use crate::PipelineError;

/// Semantic request handed to the allocation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    /// First casepack definition of the request.
    pub bundle: Bundle,
    pub needs: NeedMap,
    pub supply: SupplyMap,
    /// Casepack definitions after the first, echoed but not consulted.
    pub ignored_bundles: usize,
}

pub fn to_domain(doc: &RequestDoc) -> Result<AllocationRequest, PipelineError> {
    let packs = doc.case_packs.as_deref().unwrap_or(&[]);
    let Some(first) = packs.first() else {
        return Err(reject("Bundle.Missing", "casePacks is absent or empty", EntityRef::Root));
    };

    let needs_doc = doc
        .need_per_store
        .as_ref()
        .ok_or_else(|| reject("Needs.Missing", "needPerStore is absent", EntityRef::Root))?;
    let supply_doc = doc
        .warehouse_available_qty
        .as_ref()
        .ok_or_else(|| reject("Supply.Missing", "warehouseAvailableQty is absent", EntityRef::Root))?;

    let needs = convert_keys(needs_doc, |k| {
        StoreId::from_str(k).map_err(|_| {
            reject("Store.InvalidId", "invalid store id", EntityRef::Store(k.to_string()))
        })
    })?;
    let supply = convert_keys(supply_doc, |k| {
        WarehouseId::from_str(k).map_err(|_| {
            reject("Warehouse.InvalidId", "invalid warehouse id", EntityRef::Warehouse(k.to_string()))
        })
    })?;

    Ok(AllocationRequest {
        bundle: Bundle::new(first.ratios()),
        needs,
        supply,
        ignored_bundles: packs.len() - 1,
    })
}

fn convert_keys<K, F>(raw: &OrderedMap<String, i64>, mut parse: F) -> Result<OrderedMap<K, i64>, PipelineError>
where
    K: Ord + Clone + std::fmt::Display,
    F: FnMut(&str) -> Result<K, PipelineError>,
{
    let entries = raw
        .iter()
        .map(|(k, &v)| parse(k).map(|id| (id, v)))
        .collect::<Result<Vec<_>, _>>()?;
    // Keys were unique as strings and ids are their strings, so this cannot collide.
    OrderedMap::try_from_entries(entries).map_err(|e| PipelineError::Invariant(e.to_string()))
}

fn reject(code: &'static str, message: &str, where_: EntityRef) -> PipelineError {
    PipelineError::from_report(ValidationReport::from_issues(vec![ValidationIssue::error(
        code, message, where_,
    )]))
}
