//! # Fishload - fish-trade transaction aggregation and report delivery
//!
//! Fishload ingests spreadsheet exports of fish-trade transactions
//! (Hebrew-labeled columns), cleans and aggregates them into a summary
//! table for regulatory submission, and collects the pre-existing
//! per-license report files into a delivery folder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / Excel │────▶│   Parser    │────▶│  Transform  │────▶│ Intermediate│
//! │   exports   │     │ (auto-enc)  │     │filter·kg·grp│     │    table    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │ licenses
//! ┌─────────────┐     ┌─────────────┐                                │
//! │  Delivery   │◀────│   Reports   │◀───────────────────────────────┘
//! │   folder    │     │ locate·copy │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fishload::{process, copy_reports};
//! use std::path::Path;
//!
//! let result = process(&[input.into()], Path::new("intermediate.xlsx"))?;
//! let sweep = copy_reports(&result.license_ids(), reports_dir, delivery_dir)?;
//! println!("{} groups, {} reports copied", result.groups.len(), sweep.copied());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error hierarchy
//! - [`models`] - Domain models (records, groups, column schema, licenses)
//! - [`parser`] - CSV/Excel table loading with auto-detection
//! - [`transform`] - Filtering, unit conversion, grouping, pipeline
//! - [`reports`] - Report file location and copying
//! - [`logs`] - Leveled progress logging

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Report delivery
pub mod reports;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{PipelineError, PipelineResult, ReportError, ReportResult};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    canonical_license,
    missing_columns,
    FilteredRecord,
    Group,
    TransactionRecord,
    REQUIRED_COLUMNS,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter,
    detect_encoding,
    load_table_file,
    parse_csv_file,
    parse_excel_file,
    ParseError,
    ParseResult,
    TableFormat,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    convert_to_kilograms,
    filter_records,
    group_records,
    license_ids,
    process,
    Diagnostics,
    DropReason,
    DroppedRow,
    ProcessResult,
    Summary,
};

// =============================================================================
// Re-exports - Reports
// =============================================================================

pub use reports::{copy_reports, scan_report_files, CopyOutcome, CopyResult, LicenseReport};
