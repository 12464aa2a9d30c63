//! Structural & semantic validation of a request document before any computation.
//! Deterministic output: issues are sorted by (code, location, message).
//!
//! Errors stop the run; warnings document inputs that are accepted but
//! handled specially (non-positive need, negative supply, ignored bundles).

use core::cmp::Ordering;
use core::fmt;
use std::str::FromStr;

use cp_algo::{bundle::BundleError, items_per_casepack, Bundle};
use cp_core::{StoreId, WarehouseId};
use cp_io::loader::{CasePackDoc, RequestDoc};

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Root,
    /// Index into `casePacks`.
    Bundle(usize),
    /// Raw store key as it appeared in the request.
    Store(String),
    /// Raw warehouse key as it appeared in the request.
    Warehouse(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Root => write!(f, "/"),
            EntityRef::Bundle(i) => write!(f, "/casePacks/{i}"),
            EntityRef::Store(k) => write!(f, "/needPerStore/{k:?}"),
            EntityRef::Warehouse(k) => write!(f, "/warehouseAvailableQty/{k:?}"),
        }
    }
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub where_: EntityRef,
}

impl ValidationIssue {
    pub fn error(code: &'static str, message: impl Into<String>, where_: EntityRef) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), where_ }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, where_: EntityRef) -> Self {
        Self { severity: Severity::Warning, code, message: message.into(), where_ }
    }
}

/// Deterministic report: pass = (no Error); ordering of issues is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Sort `issues` and derive `pass`.
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues_stably(&mut issues);
        Self {
            pass: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Any `Bundle.*` error.
    pub fn has_configuration_error(&self) -> bool {
        self.errors().any(|i| i.code.starts_with("Bundle."))
    }

    /// First error plus a count of the rest, for one-line messages.
    pub fn summary(&self) -> String {
        let mut errors = self.errors();
        match errors.next() {
            None => "no errors".to_string(),
            Some(first) => {
                let rest = errors.count();
                let head = format!("{} at {}: {}", first.code, first.where_, first.message);
                if rest == 0 {
                    head
                } else {
                    format!("{head} (+{rest} more)")
                }
            }
        }
    }
}

/// Top-level entry point.
pub fn validate(doc: &RequestDoc) -> ValidationReport {
    let mut issues: Vec<ValidationIssue> = Vec::new();

    issues.extend(check_bundles(doc.case_packs.as_deref()));

    match &doc.need_per_store {
        None => issues.push(ValidationIssue::error("Needs.Missing", "needPerStore is absent", EntityRef::Root)),
        Some(needs) => {
            for (key, &need) in needs.iter() {
                if StoreId::from_str(key).is_err() {
                    issues.push(ValidationIssue::error(
                        "Store.InvalidId",
                        "store id must be 1..=256 bytes without control characters",
                        EntityRef::Store(key.clone()),
                    ));
                }
                if need <= 0 {
                    issues.push(ValidationIssue::warning(
                        "Need.NonPositive",
                        format!("need {need} is not positive; store receives 0"),
                        EntityRef::Store(key.clone()),
                    ));
                }
            }
        }
    }

    match &doc.warehouse_available_qty {
        None => issues.push(ValidationIssue::error(
            "Supply.Missing",
            "warehouseAvailableQty is absent",
            EntityRef::Root,
        )),
        Some(supply) => {
            for (key, &qty) in supply.iter() {
                if WarehouseId::from_str(key).is_err() {
                    issues.push(ValidationIssue::error(
                        "Warehouse.InvalidId",
                        "warehouse id must be 1..=256 bytes without control characters",
                        EntityRef::Warehouse(key.clone()),
                    ));
                }
                if qty < 0 {
                    issues.push(ValidationIssue::warning(
                        "Supply.Negative",
                        format!("supply {qty} is negative; treated as 0"),
                        EntityRef::Warehouse(key.clone()),
                    ));
                }
            }
        }
    }

    ValidationReport::from_issues(issues)
}

/// Issue describing why the sizer rejected the first bundle.
pub fn bundle_issue(err: &BundleError) -> ValidationIssue {
    let code = match err {
        BundleError::Empty => "Bundle.EmptyRatios",
        BundleError::NonPositiveSum(_) => "Bundle.NonPositiveSum",
        BundleError::Overflow => "Bundle.Overflow",
    };
    ValidationIssue::error(code, err.to_string(), EntityRef::Bundle(0))
}

fn check_bundles(packs: Option<&[CasePackDoc]>) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    let Some((first, extra)) = packs.and_then(|p| p.split_first()) else {
        out.push(ValidationIssue::error("Bundle.Missing", "casePacks is absent or empty", EntityRef::Root));
        return out;
    };

    for (j, r) in first.size_ratios.iter().enumerate() {
        if r.qty <= 0 {
            out.push(ValidationIssue::warning(
                "Bundle.NonPositiveRatio",
                format!("sizeRatios[{j}].qty = {} is not positive", r.qty),
                EntityRef::Bundle(0),
            ));
        }
    }
    if let Err(e) = items_per_casepack(&Bundle::new(first.ratios())) {
        out.push(bundle_issue(&e));
    }

    if !extra.is_empty() {
        out.push(ValidationIssue::warning(
            "Bundle.ExtraIgnored",
            format!("{} additional casepack definition(s) echoed but not used", extra.len()),
            EntityRef::Bundle(1),
        ));
    }
    out
}

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.code
            .cmp(b.code)
            .then_with(|| cmp_where(&a.where_, &b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}

fn cmp_where(a: &EntityRef, b: &EntityRef) -> Ordering {
    fn rank(e: &EntityRef) -> u8 {
        match e {
            EntityRef::Root => 0,
            EntityRef::Bundle(_) => 1,
            EntityRef::Store(_) => 2,
            EntityRef::Warehouse(_) => 3,
        }
    }
    match (a, b) {
        (EntityRef::Bundle(x), EntityRef::Bundle(y)) => x.cmp(y),
        (EntityRef::Store(x), EntityRef::Store(y)) => x.cmp(y),
        (EntityRef::Warehouse(x), EntityRef::Warehouse(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
