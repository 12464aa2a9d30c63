//! cp_io: request loading, canonical JSON, atomic artifact writes and hashing.
//!
//! - Shared error type (`IoError`) with `From` conversions used across modules.
//! - Local files and in-memory bytes only; any `<scheme>://` path is refused.
//! - Digests are computed over canonical JSON (sorted keys, compact).

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for cp_io (loader/canonical_json/hasher).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, read, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse/serialize errors, located by line/column when known.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Hashing / id construction errors.
    #[error("hash error: {0}")]
    Hash(String),

    /// Input exceeds the configured size limit.
    #[error("limit exceeded: {0}")]
    Limit(String),

    /// Anything else the caller handed us that cannot be used.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        let pointer = if e.line() == 0 {
            "/".to_string()
        } else {
            format!("line {} column {}", e.line(), e.column())
        };
        IoError::Json { pointer, msg: e.to_string() }
    }
}

impl From<hasher::HashError> for IoError {
    fn from(e: hasher::HashError) -> Self {
        IoError::Hash(e.to_string())
    }
}

pub mod canonical_json;
pub mod hasher;
pub mod loader;

/// True if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    s.trim().contains("://")
}
