//! BUILD_RUN_RECORD stage: audit record of one run.
//!
//! The record's id is `RUN:<timestamp>-<sha256>` over the canonical bytes of
//! the record without its id. The timestamp is normalized to RFC3339 UTC at
//! seconds precision, so a caller-fixed timestamp makes the record
//! byte-reproducible.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use cp_io::hasher;

use crate::allocate::AllocationOutcome;
use crate::build_result::ResultDigest;
use crate::{EngineMeta, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    pub request_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub result_id: String,
    pub result_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub items_per_casepack: u64,
    /// Decimal string: the sum of positive needs may exceed 64 bits.
    pub total_need: String,
    pub available_casepacks: u64,
    pub allocated_casepacks: u64,
    pub remaining_supply: u64,
    pub supply_mode: String,
    pub distribution_mode: String,
    pub reconciled_units: u64,
    pub store_count: u64,
    pub warehouse_count: u64,
    pub ignored_bundles: u64,
    pub validation_warnings: u64,
}

/// `run_record.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecordDoc {
    pub id: String,
    pub timestamp_utc: String,
    pub engine: EngineMeta,
    pub inputs: RunInputs,
    pub outputs: RunOutputs,
    pub summary: RunSummary,
}

/// Borrowed inputs for `build_run_record`.
#[derive(Debug, Clone, Copy)]
pub struct RunInputsRef<'a> {
    pub timestamp: &'a str,
    pub engine: &'a EngineMeta,
    pub request_sha256: &'a str,
    pub result: &'a ResultDigest,
    pub outcome: &'a AllocationOutcome,
    pub ignored_bundles: usize,
    pub warnings: usize,
}

/// Parse any RFC3339 timestamp and render it as UTC seconds with `Z`.
pub fn normalize_timestamp(ts: &str) -> Result<String, PipelineError> {
    let dt = DateTime::parse_from_rfc3339(ts.trim())
        .map_err(|e| PipelineError::Build(format!("bad timestamp {ts:?}: {e}")))?;
    Ok(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Current wall-clock time, already normalized.
pub fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn build_run_record(input: &RunInputsRef<'_>) -> Result<RunRecordDoc, PipelineError> {
    let timestamp_utc = normalize_timestamp(input.timestamp)?;
    let o = input.outcome;

    let summary = RunSummary {
        items_per_casepack: o.totals.items_per_casepack,
        total_need: o.totals.total_need.to_string(),
        available_casepacks: o.totals.available_casepacks,
        allocated_casepacks: o.stores.allocated,
        remaining_supply: o.remaining_supply,
        supply_mode: o.stores.mode.as_str().to_string(),
        distribution_mode: o.warehouses.mode.as_str().to_string(),
        reconciled_units: o.warehouses.reconciled,
        store_count: o.totals.store_count as u64,
        warehouse_count: o.totals.warehouse_count as u64,
        ignored_bundles: input.ignored_bundles as u64,
        validation_warnings: input.warnings as u64,
    };
    let inputs = RunInputs { request_sha256: input.request_sha256.to_string() };
    let outputs = RunOutputs {
        result_id: input.result.id.clone(),
        result_sha256: input.result.sha256.clone(),
    };

    #[derive(Serialize)]
    struct RunNoId<'a> {
        timestamp_utc: &'a str,
        engine: &'a EngineMeta,
        inputs: &'a RunInputs,
        outputs: &'a RunOutputs,
        summary: &'a RunSummary,
    }
    let id = hasher::run_id_from_canonical(
        &timestamp_utc,
        &RunNoId {
            timestamp_utc: &timestamp_utc,
            engine: input.engine,
            inputs: &inputs,
            outputs: &outputs,
            summary: &summary,
        },
    )
    .map_err(|e| PipelineError::Build(e.to_string()))?;

    Ok(RunRecordDoc {
        id,
        timestamp_utc,
        engine: input.engine.clone(),
        inputs,
        outputs,
        summary,
    })
}
