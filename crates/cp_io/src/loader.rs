//! Loader: read a local (or stdin-supplied) allocation request, enforce the
//! size limit, parse the wire document, and digest it. No network I/O and no
//! semantic checks: identifiers and values stay raw here and are validated by
//! the pipeline, which can then report every problem at once.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cp_core::OrderedMap;
use serde::{Deserialize, Serialize};

use crate::{hasher, looks_like_url_strict, IoError};

/// 16 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadLimits {
    pub max_bytes: u64,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_BYTES }
    }
}

// ----------------------------- Public wire-facing types -----------------------------

/// One size ratio entry of a casepack definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRatioDoc {
    pub qty: i64,
}

/// One casepack definition. `packs` is informational and echoed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePackDoc {
    #[serde(default)]
    pub packs: i64,
    #[serde(default)]
    pub size_ratios: Vec<SizeRatioDoc>,
}

impl CasePackDoc {
    pub fn ratios(&self) -> Vec<i64> {
        self.size_ratios.iter().map(|r| r.qty).collect()
    }
}

/// The request document. Every section is optional on the wire so that a
/// missing one surfaces as a validation issue rather than a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDoc {
    pub case_packs: Option<Vec<CasePackDoc>>,
    pub need_per_store: Option<OrderedMap<String, i64>>,
    pub warehouse_available_qty: Option<OrderedMap<String, i64>>,
}

/// Parsed request plus the digest of its canonical form.
#[derive(Debug, Clone)]
pub struct LoadedRequest {
    pub doc: RequestDoc,
    pub request_sha256: String,
}

// ----------------------------- Loaders -----------------------------

/// Load a request from a local path.
pub fn load_request_path(path: &Path, limits: LoadLimits) -> Result<LoadedRequest, IoError> {
    let shown = path.to_string_lossy();
    if looks_like_url_strict(&shown) {
        return Err(IoError::Invalid(format!("not a local path: {shown}")));
    }
    let meta = std::fs::metadata(path).map_err(|e| IoError::Path(format!("{shown}: {e}")))?;
    if !meta.is_file() {
        return Err(IoError::Path(format!("{shown}: not a regular file")));
    }
    if meta.len() > limits.max_bytes {
        return Err(IoError::Limit(format!(
            "{shown}: {} bytes exceeds limit of {}",
            meta.len(),
            limits.max_bytes
        )));
    }
    let f = File::open(path).map_err(|e| IoError::Path(format!("{shown}: {e}")))?;
    let bytes = read_bounded(f, limits)?;
    load_request_bytes(&bytes, limits)
}

/// Read at most `max_bytes` from any reader (stdin included).
pub fn read_bounded<R: Read>(reader: R, limits: LoadLimits) -> Result<Vec<u8>, IoError> {
    let mut buf = Vec::new();
    // one extra byte distinguishes "exactly at the limit" from "over it"
    reader.take(limits.max_bytes.saturating_add(1)).read_to_end(&mut buf)?;
    if buf.len() as u64 > limits.max_bytes {
        return Err(IoError::Limit(format!(
            "request exceeds limit of {} bytes",
            limits.max_bytes
        )));
    }
    Ok(buf)
}

/// Parse a request from bytes already in memory.
pub fn load_request_bytes(bytes: &[u8], limits: LoadLimits) -> Result<LoadedRequest, IoError> {
    if bytes.len() as u64 > limits.max_bytes {
        return Err(IoError::Limit(format!(
            "{} bytes exceeds limit of {}",
            bytes.len(),
            limits.max_bytes
        )));
    }
    let doc: RequestDoc = serde_json::from_slice(bytes)?;
    let request_sha256 = hasher::sha256_canonical(&doc)?;
    Ok(LoadedRequest { doc, request_sha256 })
}
