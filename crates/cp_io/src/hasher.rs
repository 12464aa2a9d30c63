//! Deterministic hashing and ID builders for canonical artifacts.
//!
//! - Canonical JSON hashing: UTF-8, **sorted object keys**, array order preserved.
//! - `RES:<hex>` identifies a response by its canonical bytes.
//! - `RUN:<timestamp>-<hex>` identifies a run record; the timestamp must already
//!   be RFC3339 UTC at seconds precision (`YYYY-MM-DDTHH:MM:SSZ`).
//! - Hex digests are lowercase.

use chrono::NaiveDateTime;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::canonical_json::to_canonical_bytes;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("canonicalization error: {0}")]
    Canonical(String),

    #[error("invalid timestamp (expected RFC3339 UTC like 2025-08-12T10:00:00Z): {0}")]
    InvalidTimestamp(String),
}

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the **canonical JSON bytes** of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    let bytes = to_canonical_bytes(value).map_err(|e| HashError::Canonical(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

/// `RES:<hex>` for a response document.
pub fn res_id_from_canonical<T: Serialize>(value: &T) -> Result<String, HashError> {
    Ok(format!("RES:{}", sha256_canonical(value)?))
}

/// `RUN:<timestamp>-<hex>` over already-canonical run payload bytes.
pub fn run_id_from_bytes(timestamp_utc: &str, run_bytes_canonical: &[u8]) -> Result<String, HashError> {
    NaiveDateTime::parse_from_str(timestamp_utc, "%Y-%m-%dT%H:%M:%SZ")
        .map_err(|_| HashError::InvalidTimestamp(timestamp_utc.to_string()))?;
    Ok(format!("RUN:{timestamp_utc}-{}", sha256_hex(run_bytes_canonical)))
}

/// Same as `run_id_from_bytes`, canonicalizing `run_value` first.
pub fn run_id_from_canonical<T: Serialize>(timestamp_utc: &str, run_value: &T) -> Result<String, HashError> {
    let bytes = to_canonical_bytes(run_value).map_err(|e| HashError::Canonical(e.to_string()))?;
    run_id_from_bytes(timestamp_utc, &bytes)
}
