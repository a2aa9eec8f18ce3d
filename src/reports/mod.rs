//! Report file location and delivery.
//!
//! Given license identifiers and a search root, find the per-license report
//! files already on disk and copy them into a destination directory. Report
//! files are pre-existing: this module never creates or mutates them, it
//! only reads and copies.
//!
//! # Matching rule
//!
//! A file is a candidate for a license when any maximal digit run in its
//! file name, with leading zeros stripped, equals the canonical license id
//! (see [`crate::models::canonical_license`]). Only spreadsheet extensions
//! participate. The rule is fixed here, not per call.
//!
//! # Policies
//!
//! - Two or more candidates: `Ambiguous`, nothing is copied, candidates are
//!   reported sorted.
//! - Destination name collision: overwrite. Re-running the same sweep is a
//!   harmless overwrite, never an error, which makes interrupted runs
//!   resumable.
//! - A single failed copy is recorded for that license and does not abort
//!   the remaining licenses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ReportError, ReportResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::canonical_license;

/// Extensions a report file may carry.
pub const REPORT_EXTENSIONS: [&str; 3] = ["xlsx", "xlsm", "xls"];

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

// =============================================================================
// Copy Result
// =============================================================================

/// Outcome of the sweep for one license identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CopyOutcome {
    /// Exactly one candidate existed and was copied.
    Copied { source: PathBuf },
    /// No candidate file; the destination is untouched for this license.
    NotFound,
    /// Two or more candidates; nothing was copied.
    Ambiguous { candidates: Vec<PathBuf> },
    /// The copy itself failed (permissions, disk full, invalid identifier).
    Failed { error: String },
}

/// One license identifier with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseReport {
    pub license: String,
    #[serde(flatten)]
    pub outcome: CopyOutcome,
}

/// Result of a full sweep, one entry per requested identifier in request
/// order. Partial failure is normal: consult the per-license outcomes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResult {
    pub reports: Vec<LicenseReport>,
    /// Number of report-like files enumerated under the search root.
    pub scanned_files: usize,
    /// Unreadable directory entries skipped during the scan.
    pub scan_errors: usize,
}

impl CopyResult {
    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Copied { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::NotFound))
    }

    pub fn ambiguous(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Ambiguous { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Failed { .. }))
    }

    /// True when every requested license was copied.
    pub fn is_complete(&self) -> bool {
        self.copied() == self.reports.len()
    }

    fn count(&self, pred: impl Fn(&CopyOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

// =============================================================================
// Enumeration and Matching
// =============================================================================

/// Recursively enumerate report-like files under `root`.
///
/// Symlinks are not followed, so cyclic trees terminate. The result is
/// sorted by path: every downstream decision is independent of filesystem
/// enumeration order. Unreadable entries are counted, not fatal.
pub fn scan_report_files(root: &Path) -> ReportResult<(Vec<PathBuf>, usize)> {
    if !root.is_dir() {
        return Err(ReportError::BadSearchRoot(root.display().to_string()));
    }

    let mut files = Vec::new();
    let mut errors = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_report_extension(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
            Err(_) => errors += 1,
        }
    }

    files.sort();
    Ok((files, errors))
}

fn has_report_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            REPORT_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// The canonical digit runs embedded in a file name.
fn filename_keys(file_name: &str) -> Vec<String> {
    DIGIT_RUN
        .find_iter(file_name)
        .filter_map(|m| canonical_license(m.as_str()))
        .collect()
}

/// Does `path`'s file name encode `canonical` under the matching rule?
pub fn file_matches(path: &Path, canonical: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    filename_keys(name).iter().any(|key| key == canonical)
}

// =============================================================================
// Copy Sweep
// =============================================================================

/// Locate and copy the report file of every license in `license_ids`.
///
/// Best-effort sweep: each identifier gets its own [`CopyOutcome`] and a
/// failure for one never aborts the rest. The only fatal errors are a
/// missing search root and an uncreatable destination directory.
pub fn copy_reports(
    license_ids: &[String],
    search_root: &Path,
    destination: &Path,
) -> ReportResult<CopyResult> {
    fs::create_dir_all(destination).map_err(|source| ReportError::CreateDest {
        path: destination.display().to_string(),
        source,
    })?;

    log_info(format!("🔍 Scanning for reports under {}", search_root.display()));
    let (files, scan_errors) = scan_report_files(search_root)?;
    log_success(format!("{} report file(s) found", files.len()));
    if scan_errors > 0 {
        log_warning(format!("{} unreadable entries skipped during scan", scan_errors));
    }

    let mut reports = Vec::with_capacity(license_ids.len());
    for raw in license_ids {
        let outcome = sweep_one(raw, &files, destination);
        reports.push(LicenseReport {
            license: raw.clone(),
            outcome,
        });
    }

    let result = CopyResult {
        reports,
        scanned_files: files.len(),
        scan_errors,
    };
    report_misses(&result);
    Ok(result)
}

fn sweep_one(raw_license: &str, files: &[PathBuf], destination: &Path) -> CopyOutcome {
    let Some(canonical) = canonical_license(raw_license) else {
        return CopyOutcome::Failed {
            error: format!("'{}' is not a numeric license identifier", raw_license),
        };
    };

    let candidates: Vec<&PathBuf> = files.iter().filter(|f| file_matches(f, &canonical)).collect();

    match candidates.as_slice() {
        [] => CopyOutcome::NotFound,
        [source] => copy_one(source, destination),
        many => CopyOutcome::Ambiguous {
            candidates: many.iter().map(|p| (*p).clone()).collect(),
        },
    }
}

/// Copy one report into the destination, preserving its file name.
/// An existing destination file of the same name is overwritten.
fn copy_one(source: &Path, destination: &Path) -> CopyOutcome {
    let Some(file_name) = source.file_name() else {
        return CopyOutcome::Failed {
            error: format!("source has no file name: {}", source.display()),
        };
    };
    let dest_path = destination.join(file_name);

    match fs::copy(source, &dest_path) {
        Ok(_) => {
            log_success(format!("{} → {}", source.display(), dest_path.display()));
            CopyOutcome::Copied {
                source: source.to_path_buf(),
            }
        }
        Err(e) => CopyOutcome::Failed {
            error: format!("copy to {} failed: {}", dest_path.display(), e),
        },
    }
}

/// Log licenses that have data but no report file on disk.
fn report_misses(result: &CopyResult) {
    let missing: Vec<&str> = result
        .reports
        .iter()
        .filter(|r| matches!(r.outcome, CopyOutcome::NotFound))
        .map(|r| r.license.as_str())
        .collect();

    if missing.is_empty() {
        log_success(format!("Copied {} of {} report(s)", result.copied(), result.reports.len()));
    } else {
        log_warning(format!("No report file found for license(s): {}", missing.join(", ")));
    }
}
