// crates/cp_cli/src/main.rs
//
// Process boundary: parse args, set up logging, load the request (file or
// stdin), run the pipeline, write artifacts, map failures to exit codes.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    /// Bad arguments, invalid bundle/needs/supply.
    pub const VALIDATION: i32 = 2;
    /// A post-condition of the computed allocation did not hold.
    pub const SELF_VERIFY: i32 = 3;
    pub const IO: i32 = 4;
    /// Arithmetic left the supported integer range.
    pub const ALLOCATION: i32 = 5;
}

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};

use cp_io::canonical_json::{write_canonical_file, write_json_file};
use cp_io::loader::{self, LoadLimits, LoadedRequest};
use cp_io::IoError;
use cp_pipeline::{
    build_run_record::now_utc, engine_identifiers, run_with_ctx, validate, PipelineCtx,
    PipelineError, PipelineOutputs, Severity, ValidationReport,
};
use tracing_subscriber::EnvFilter;

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    Validation(String),
    SelfVerify(String),
    Io(String),
    Allocation(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation failed: {m}"),
            MainError::SelfVerify(m) => write!(f, "self-verification failed: {m}"),
            MainError::Io(m) => write!(f, "I/O error: {m}"),
            MainError::Allocation(m) => write!(f, "{m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("casepack: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    init_tracing(&args);

    let result = if args.validate_only { validate_only(&args) } else { run_once(&args) };
    let rc = match result {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("casepack: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// Logs go to stderr so `--stdout` output stays clean. RUST_LOG wins over flags.
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn map_error(e: &MainError) -> i32 {
    match e {
        MainError::Validation(_) => exitcodes::VALIDATION,
        MainError::SelfVerify(_) => exitcodes::SELF_VERIFY,
        MainError::Io(_) => exitcodes::IO,
        MainError::Allocation(_) => exitcodes::ALLOCATION,
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Invalid(_) => MainError::Validation(e.to_string()),
        IoError::Path(_) | IoError::Json { .. } | IoError::Limit(_) => MainError::Io(e.to_string()),
        IoError::Hash(_) => MainError::SelfVerify(e.to_string()),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    if let Some(report) = e.report() {
        print_issues(report);
    }
    match e {
        PipelineError::InvalidConfiguration(_) | PipelineError::InvalidInput(_) => {
            MainError::Validation(e.to_string())
        }
        PipelineError::Io(io) => map_io_err(io),
        PipelineError::Overflow(_) => MainError::Allocation(e.to_string()),
        PipelineError::Invariant(_) | PipelineError::Build(_) => MainError::SelfVerify(e.to_string()),
    }
}

/// One line per issue on stderr.
fn print_issues(report: &ValidationReport) {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    for issue in &report.issues {
        let sev = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let _ = writeln!(out, "{sev}: {} at {}: {}", issue.code, issue.where_, issue.message);
    }
}

fn load(args: &Args) -> Result<LoadedRequest, MainError> {
    let limits = LoadLimits { max_bytes: args.max_bytes };
    if args.reads_stdin() {
        let bytes = loader::read_bounded(std::io::stdin().lock(), limits).map_err(map_io_err)?;
        loader::load_request_bytes(&bytes, limits).map_err(map_io_err)
    } else {
        let loaded = loader::load_request_path(&args.request, limits).map_err(map_io_err)?;
        tracing::debug!(path = %args.request.display(), "request read");
        Ok(loaded)
    }
}

/// Load and validate only; nothing is computed or written.
fn validate_only(args: &Args) -> Result<(), MainError> {
    let loaded = load(args)?;
    let report = validate::validate(&loaded.doc);
    print_issues(&report);
    if !report.pass {
        return Err(MainError::Validation(report.summary()));
    }
    tracing::info!(
        request_sha256 = %loaded.request_sha256,
        warnings = report.issues.len(),
        "request is valid"
    );
    Ok(())
}

/// Full run: load → pipeline → artifacts (or stdout).
fn run_once(args: &Args) -> Result<(), MainError> {
    let loaded = load(args)?;
    let timestamp_utc = args.timestamp.clone().unwrap_or_else(now_utc);
    let ctx = PipelineCtx { loaded, engine_meta: engine_identifiers(), timestamp_utc };
    let outs = run_with_ctx(ctx).map_err(map_pipeline_err)?;

    if args.stdout {
        let text = serde_json::to_string_pretty(&outs.response)
            .map_err(|e| MainError::SelfVerify(e.to_string()))?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{text}").map_err(|e| MainError::Io(e.to_string()))?;
        return Ok(());
    }
    write_artifacts(&args.out, &outs)
}

/// `result.json` keeps request key order (pretty); `run_record.json` is canonical.
fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("create {}: {e}", out_dir.display())))?;

    let result_path = out_dir.join("result.json");
    write_json_file(&result_path, &outs.response, true).map_err(map_io_err)?;

    let run_path = out_dir.join("run_record.json");
    write_canonical_file(&run_path, &outs.run_record).map_err(map_io_err)?;

    tracing::info!(
        result = %result_path.display(),
        run_record = %run_path.display(),
        result_id = %outs.result.id,
        "artifacts written"
    );
    Ok(())
}
