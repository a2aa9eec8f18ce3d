//! End-to-end transform pipeline: load → filter → convert → group → write.
//!
//! The single entry point is [`process`]. Steps run in fixed order over the
//! ordered record sequence; structural errors (schema, IO) abort before any
//! output exists, per-record rejections accumulate into [`Diagnostics`].
//!
//! The output write is atomic: groups are serialized to a temp file in the
//! destination directory which is renamed over `output_path` on success, so
//! a failed run never leaves a partial output file behind.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{Group, TransactionRecord, REQUIRED_COLUMNS};
use crate::parser::{load_table_file, TableFormat};
use crate::transform::clean::{convert_to_kilograms, filter_records, DroppedRow};
use crate::transform::grouper::{group_records, license_ids};

/// Result of a complete pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// Aggregated groups in first-seen key order.
    pub groups: Vec<Group>,
    /// Headline statistics.
    pub summary: Summary,
    /// Per-row and per-file details.
    pub diagnostics: Diagnostics,
}

impl ProcessResult {
    /// Unique canonical license identifiers, the copier's input.
    pub fn license_ids(&self) -> Vec<String> {
        license_ids(&self.groups)
    }
}

/// Headline statistics of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub group_count: usize,
    pub total_packages: f64,
    pub total_weight_kg: f64,
    pub unique_licenses: usize,
}

/// Accumulated per-run details. Never silently truncated: every drop that
/// happened is present here even when only the first few are logged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub files: Vec<FileInfo>,
    pub dropped: Vec<DroppedRow>,
}

/// Load metadata for one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub rows: usize,
    pub format: TableFormat,
}

/// Run the full pipeline over `inputs` and write the grouped table to
/// `output`.
///
/// Inputs are concatenated in the given order; row order is preserved, so
/// output group order is deterministic. Any missing required column in any
/// input aborts with [`PipelineError::Schema`] before output is written.
/// Zero valid records after filtering aborts with
/// [`PipelineError::EmptyInput`]; an output file is only ever created for a
/// successful run.
pub fn process(inputs: &[PathBuf], output: &Path) -> PipelineResult<ProcessResult> {
    log_info("📖 Loading input files...");
    let (records, files) = load_inputs(inputs)?;
    log_success(format!("Loaded {} rows from {} file(s)", records.len(), files.len()));

    log_info("🧹 Filtering records...");
    let (kept, dropped) = filter_records(&records);
    report_drops(&dropped);

    log_info("⚖️  Converting weights to kilograms...");
    let converted: Vec<_> = kept.into_iter().map(convert_to_kilograms).collect();

    if converted.is_empty() {
        return Err(PipelineError::EmptyInput { dropped: dropped.len() });
    }

    log_info("📦 Grouping by base-document reference...");
    let groups = group_records(&converted);
    log_success(format!("{} groups from {} records", groups.len(), converted.len()));

    log_info(format!("💾 Writing output: {}", output.display()));
    write_groups(&groups, output)?;

    let summary = Summary {
        rows_loaded: records.len(),
        rows_dropped: dropped.len(),
        group_count: groups.len(),
        total_packages: groups.iter().map(|g| g.total_packages).sum(),
        total_weight_kg: groups.iter().map(|g| g.total_weight_kg).sum(),
        unique_licenses: license_ids(&groups).len(),
    };
    log_success(format!(
        "Total: {} kg in {} packages across {} licenses",
        summary.total_weight_kg, summary.total_packages, summary.unique_licenses
    ));

    Ok(ProcessResult {
        groups,
        summary,
        diagnostics: Diagnostics { files, dropped },
    })
}

/// Load every input, validate its schema, and concatenate rows in path order.
fn load_inputs(inputs: &[PathBuf]) -> PipelineResult<(Vec<TransactionRecord>, Vec<FileInfo>)> {
    let mut records = Vec::new();
    let mut files = Vec::new();

    for path in inputs {
        let parsed = load_table_file(path)?;

        let missing = crate::models::missing_columns(&parsed.headers);
        if !missing.is_empty() {
            return Err(PipelineError::Schema {
                path: path.display().to_string(),
                missing,
            });
        }

        log_info(format!(
            "{}: {} rows, {}",
            path.display(),
            parsed.records.len(),
            parsed.format
        ));
        files.push(FileInfo {
            path: path.display().to_string(),
            rows: parsed.records.len(),
            format: parsed.format.clone(),
        });
        records.extend(parsed.records.iter().map(TransactionRecord::from_row));
    }

    Ok((records, files))
}

/// Log filter rejections: every drop is counted, the first few are shown.
fn report_drops(dropped: &[DroppedRow]) {
    if dropped.is_empty() {
        log_success("No rows dropped");
        return;
    }
    log_warning(format!("{} row(s) dropped by the filter", dropped.len()));
    for drop in dropped.iter().take(5) {
        log_warning(format!("• row {}: {}", drop.row, drop.reason));
    }
    if dropped.len() > 5 {
        log_warning(format!("• ... +{} more", dropped.len() - 5));
    }
}

// =============================================================================
// Output Writing
// =============================================================================

/// Serialize groups to `output`, format chosen by extension (`.csv` or
/// `.xlsx`). Atomic.
pub fn write_groups(groups: &[Group], output: &Path) -> PipelineResult<()> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => write_groups_csv(groups, output),
        "xlsx" => write_groups_excel(groups, output),
        _ => Err(PipelineError::UnsupportedFormat(ext)),
    }
}

/// Parent directory of the output path, for same-filesystem temp files.
fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn write_groups_csv(groups: &[Group], output: &Path) -> PipelineResult<()> {
    let temp = tempfile::NamedTempFile::new_in(output_dir(output))?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file());
        writer
            .write_record(REQUIRED_COLUMNS)
            .map_err(|e| PipelineError::Write(e.to_string()))?;
        for group in groups {
            writer
                .write_record(&[
                    group.license.clone().unwrap_or_default(),
                    group.reference.clone(),
                    group.card_name.clone(),
                    group.foreign_name.clone(),
                    group.address.clone(),
                    format!("{}", group.total_packages),
                    format!("{}", group.total_weight_kg),
                ])
                .map_err(|e| PipelineError::Write(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::Write(e.to_string()))?;
    }
    temp.persist(output).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

fn write_groups_excel(groups: &[Group], output: &Path) -> PipelineResult<()> {
    let temp = tempfile::Builder::new()
        .suffix(".xlsx")
        .tempfile_in(output_dir(output))?;

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in REQUIRED_COLUMNS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .map_err(|e| PipelineError::Write(e.to_string()))?;
    }

    for (i, group) in groups.iter().enumerate() {
        let row = (i + 1) as u32;
        let text_cells = [
            group.license.clone().unwrap_or_default(),
            group.reference.clone(),
            group.card_name.clone(),
            group.foreign_name.clone(),
            group.address.clone(),
        ];
        for (col, value) in text_cells.iter().enumerate() {
            sheet
                .write_string(row, col as u16, value)
                .map_err(|e| PipelineError::Write(e.to_string()))?;
        }
        sheet
            .write_number(row, 5, group.total_packages)
            .map_err(|e| PipelineError::Write(e.to_string()))?;
        sheet
            .write_number(row, 6, group.total_weight_kg)
            .map_err(|e| PipelineError::Write(e.to_string()))?;
    }

    workbook
        .save(temp.path())
        .map_err(|e| PipelineError::Write(e.to_string()))?;
    temp.persist(output).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}
