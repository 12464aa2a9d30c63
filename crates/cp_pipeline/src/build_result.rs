//! BUILD_RESULT stage: assemble the response document and its digest.
//!
//! The response echoes every casepack definition and keeps request key order.
//! Its identity (`RES:<sha256>`) is taken over the canonical (sorted-key)
//! form, so it does not depend on map order or whitespace.

use serde::{Deserialize, Serialize};

use cp_core::{Allocation, Distribution};
use cp_io::{canonical_json, hasher, loader::CasePackDoc};

use crate::allocate::AllocationOutcome;
use crate::PipelineError;

/// `result.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDoc {
    pub case_packs: Vec<CasePackDoc>,
    pub stores: Allocation,
    pub warehouses: Distribution,
    pub remaining_supply: u64,
}

/// Identity of a response: `RES:<hex>` and the bare hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDigest {
    pub id: String,
    pub sha256: String,
}

pub fn build_response(case_packs: &[CasePackDoc], outcome: &AllocationOutcome) -> ResponseDoc {
    ResponseDoc {
        case_packs: case_packs.to_vec(),
        stores: outcome.stores.allocation.clone(),
        warehouses: outcome.warehouses.distribution.clone(),
        remaining_supply: outcome.remaining_supply,
    }
}

pub fn digest_response(response: &ResponseDoc) -> Result<ResultDigest, PipelineError> {
    let bytes = canonical_json::to_canonical_bytes(response)?;
    let sha256 = hasher::sha256_hex(&bytes);
    Ok(ResultDigest { id: format!("RES:{sha256}"), sha256 })
}
