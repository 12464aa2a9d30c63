// crates/cp_cli/src/args.rs
//
// Offline CLI argument surface.
// - The request is a local file or `-` (stdin); any scheme:// path is refused.
// - `--timestamp` must be RFC3339; it is normalized before any work starts.
// - Logging level: --quiet / -v / -vv, overridden by RUST_LOG.

use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

use cp_io::{loader::DEFAULT_MAX_BYTES, looks_like_url_strict};
use cp_pipeline::build_run_record::normalize_timestamp;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "casepack",
    version,
    disable_help_subcommand = true,
    about = "Allocate casepacks to stores and draw them from warehouses, deterministically"
)]
pub struct Args {
    /// Request JSON path, or `-` to read stdin.
    #[arg(long)]
    pub request: PathBuf,

    /// Output directory for result.json and run_record.json.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Print the response JSON to stdout instead of writing files.
    #[arg(long)]
    pub stdout: bool,

    /// Run-record timestamp (RFC3339). Defaults to the current UTC time.
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Load and validate the request only; no allocation, no artifacts.
    #[arg(long)]
    pub validate_only: bool,

    /// Maximum request size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: u64,

    /// Only log warnings and errors.
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn reads_stdin(&self) -> bool {
        self.request.as_os_str() == "-"
    }

    /// Default `tracing` filter when RUST_LOG is unset.
    pub fn log_directive(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

/// Errors surfaced by argument validation. Messages are short and stable.
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    BadTimestamp(String),
    ZeroLimit,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be local (no scheme): {p}"),
            CliError::BadTimestamp(t) => write!(f, "invalid --timestamp (expected RFC3339): {t}"),
            CliError::ZeroLimit => write!(f, "--max-bytes must be > 0"),
        }
    }
}

impl std::error::Error for CliError {}

/// Same rule as the loader: any `<scheme>://` is not a local path.
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    let s = p.to_string_lossy();
    if looks_like_url_strict(&s) {
        return Err(CliError::NonLocalPath(s.into_owned()));
    }
    Ok(())
}

/// Post-parse checks clap cannot express. Returns args with the timestamp normalized.
pub fn validate(mut args: Args) -> Result<Args, CliError> {
    if !args.reads_stdin() {
        ensure_local_path(&args.request)?;
    }
    ensure_local_path(&args.out)?;
    if args.max_bytes == 0 {
        return Err(CliError::ZeroLimit);
    }
    if let Some(ts) = &args.timestamp {
        let norm = normalize_timestamp(ts).map_err(|_| CliError::BadTimestamp(ts.clone()))?;
        args.timestamp = Some(norm);
    }
    Ok(args)
}

/// Parse from the process arguments, then validate.
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("casepack").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let a = parse(&["--request", "req.json"]);
        assert_eq!(a.out, PathBuf::from("."));
        assert_eq!(a.max_bytes, DEFAULT_MAX_BYTES);
        assert!(!a.stdout && !a.validate_only && !a.reads_stdin());
        assert_eq!(a.log_directive(), "info");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(parse(&["--request", "-", "--quiet"]).log_directive(), "warn");
        assert_eq!(parse(&["--request", "-", "-v"]).log_directive(), "debug");
        assert_eq!(parse(&["--request", "-", "-vv"]).log_directive(), "trace");
        assert!(Args::try_parse_from(["casepack", "--request", "-", "--quiet", "-v"]).is_err());
    }

    #[test]
    fn schemes_are_rejected() {
        for p in ["https://host/req.json", "file:///tmp/req.json", "HTTP://host/req.json"] {
            assert!(matches!(validate(parse(&["--request", p])), Err(CliError::NonLocalPath(_))));
        }
        assert!(matches!(
            validate(parse(&["--request", "r.json", "--out", "s3://bucket"])),
            Err(CliError::NonLocalPath(_))
        ));
        assert!(validate(parse(&["--request", "-"])).unwrap().reads_stdin());
    }

    #[test]
    fn scheme_like_file_names_stay_local() {
        for p in ["file:req.json", "http:req.json", "C:\\data\\req.json"] {
            let a = validate(parse(&["--request", p])).unwrap();
            assert_eq!(a.request, PathBuf::from(p));
            assert!(!looks_like_url_strict(p));
        }
    }

    #[test]
    fn timestamp_is_normalized_or_rejected() {
        let a = validate(parse(&["--request", "r.json", "--timestamp", "2025-01-02T05:04:05.9+02:00"])).unwrap();
        assert_eq!(a.timestamp.as_deref(), Some("2025-01-02T03:04:05Z"));
        assert!(matches!(
            validate(parse(&["--request", "r.json", "--timestamp", "noon"])),
            Err(CliError::BadTimestamp(_))
        ));
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            validate(parse(&["--request", "r.json", "--max-bytes", "0"])),
            Err(CliError::ZeroLimit)
        ));
    }
}
