//! cp_pipeline: deterministic pipeline surface (load → validate → aggregate →
//! allocate → distribute → build artifacts).
//!
//! File/JSON/hash work is delegated to `cp_io` and the arithmetic to `cp_algo`;
//! this crate only sequences the stages and turns their failures into one
//! error surface.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cp_io::loader::{self, LoadLimits, LoadedRequest};

pub mod allocate;
pub mod build_result;
pub mod build_run_record;
pub mod load;
pub mod validate;

pub use allocate::AllocationOutcome;
pub use build_result::{ResponseDoc, ResultDigest};
pub use build_run_record::RunRecordDoc;
pub use load::AllocationRequest;
pub use validate::{EntityRef, Severity, ValidationIssue, ValidationReport};

/// Engine identifiers echoed in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub vendor: String,
    pub name: String,
    pub version: String,
    pub build: String,
}

/// Everything one run needs: the loaded request, who is running it, and when.
#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub loaded: LoadedRequest,
    pub engine_meta: EngineMeta,
    /// Any RFC3339 timestamp; normalized to UTC seconds in the run record.
    pub timestamp_utc: String,
}

/// Artifacts of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub response: ResponseDoc,
    pub result: ResultDigest,
    pub run_record: RunRecordDoc,
    /// Warnings only (a failing report aborts the run).
    pub report: ValidationReport,
    pub outcome: AllocationOutcome,
}

/// Single error surface for the pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bundle definition unusable; nothing was computed.
    #[error("invalid configuration: {}", .0.summary())]
    InvalidConfiguration(ValidationReport),

    /// Needs/supply missing or malformed; nothing was computed.
    #[error("invalid input: {}", .0.summary())]
    InvalidInput(ValidationReport),

    #[error(transparent)]
    Io(#[from] cp_io::IoError),

    /// Intermediate arithmetic left the supported integer range.
    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// A post-condition of the allocation did not hold.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Artifact assembly failed (timestamp, canonicalization, hashing).
    #[error("build error: {0}")]
    Build(String),
}

impl PipelineError {
    /// Classify a failing report: any bundle error is a configuration problem.
    pub fn from_report(report: ValidationReport) -> Self {
        if report.has_configuration_error() {
            PipelineError::InvalidConfiguration(report)
        } else {
            PipelineError::InvalidInput(report)
        }
    }

    /// Validation report attached to the error, if any.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            PipelineError::InvalidConfiguration(r) | PipelineError::InvalidInput(r) => Some(r),
            _ => None,
        }
    }
}

// -------------------------------------- Public API --------------------------------------

/// Run every stage against an already-loaded request.
pub fn run_with_ctx(ctx: PipelineCtx) -> Result<PipelineOutputs, PipelineError> {
    let doc = &ctx.loaded.doc;

    // VALIDATE
    let report = validate::validate(doc);
    for issue in &report.issues {
        match issue.severity {
            validate::Severity::Warning => {
                tracing::warn!(code = issue.code, at = %issue.where_, "{}", issue.message)
            }
            validate::Severity::Error => {
                tracing::error!(code = issue.code, at = %issue.where_, "{}", issue.message)
            }
        }
    }
    if !report.pass {
        return Err(PipelineError::from_report(report));
    }
    tracing::info!(warnings = report.issues.len(), "request validated");

    // LOAD (wire → domain)
    let request = load::to_domain(doc)?;
    if request.ignored_bundles > 0 {
        tracing::info!(
            ignored = request.ignored_bundles,
            "only the first casepack definition is used"
        );
    }

    // AGGREGATE → ALLOCATE → DISTRIBUTE (+ self-verify)
    let outcome = allocate::allocate(&request)?;

    // BUILD_RESULT
    let case_packs = doc.case_packs.as_deref().unwrap_or(&[]);
    let response = build_result::build_response(case_packs, &outcome);
    let result = build_result::digest_response(&response)?;

    // BUILD_RUN_RECORD
    let run_record = build_run_record::build_run_record(&build_run_record::RunInputsRef {
        timestamp: &ctx.timestamp_utc,
        engine: &ctx.engine_meta,
        request_sha256: &ctx.loaded.request_sha256,
        result: &result,
        outcome: &outcome,
        ignored_bundles: request.ignored_bundles,
        warnings: report.issues.len(),
    })?;
    tracing::info!(run_id = %run_record.id, result_id = %result.id, "artifacts built");

    Ok(PipelineOutputs { response, result, run_record, report, outcome })
}

/// Load a request file, then run the pipeline.
pub fn run_from_path(
    path: &Path,
    limits: LoadLimits,
    engine_meta: EngineMeta,
    timestamp_utc: &str,
) -> Result<PipelineOutputs, PipelineError> {
    let loaded = loader::load_request_path(path, limits)?;
    tracing::info!(path = %path.display(), request_sha256 = %loaded.request_sha256, "request loaded");
    run_with_ctx(PipelineCtx { loaded, engine_meta, timestamp_utc: timestamp_utc.to_string() })
}

/// Parse request bytes (stdin, tests), then run the pipeline.
pub fn run_from_bytes(
    bytes: &[u8],
    limits: LoadLimits,
    engine_meta: EngineMeta,
    timestamp_utc: &str,
) -> Result<PipelineOutputs, PipelineError> {
    let loaded = loader::load_request_bytes(bytes, limits)?;
    run_with_ctx(PipelineCtx { loaded, engine_meta, timestamp_utc: timestamp_utc.to_string() })
}

/// Semantic core: bundle + needs + supply → allocation, distribution, leftover.
pub fn optimize(request: &AllocationRequest) -> Result<AllocationOutcome, PipelineError> {
    allocate::allocate(request)
}

/// Engine identifiers: build-time overrides, else this crate's package metadata.
pub fn engine_identifiers() -> EngineMeta {
    EngineMeta {
        vendor: option_env!("CASEPACK_ENGINE_VENDOR").unwrap_or("casepack").to_string(),
        name: option_env!("CASEPACK_ENGINE_NAME")
            .unwrap_or(env!("CARGO_PKG_NAME"))
            .to_string(),
        version: option_env!("CASEPACK_ENGINE_VERSION")
            .unwrap_or(env!("CARGO_PKG_VERSION"))
            .to_string(),
        build: option_env!("CASEPACK_ENGINE_BUILD").unwrap_or("dev").to_string(),
    }
}
