//! Error types for the fishload pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`crate::parser::ParseError`] - table parsing errors (CSV and Excel)
//! - [`PipelineError`] - transform pipeline errors
//! - [`ReportError`] - report locator/copier errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Structural errors (`Schema`, `Io`, `EmptyInput`) abort the pipeline run
//! before any output is written. Per-record drops and per-license copy
//! failures are NOT errors at this level: they are accumulated into the
//! diagnostics / copy-result objects returned to the caller.

use thiserror::Error;

use crate::parser::ParseError;

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Errors from the transform pipeline.
///
/// This is the main error type returned by [`crate::transform::pipeline::process`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Input file is missing required columns.
    #[error("Schema error in '{path}': missing columns {missing:?}")]
    Schema { path: String, missing: Vec<String> },

    /// Read/write failure on an input or the output path.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No valid records remain after filtering. Nothing is written.
    #[error("No valid records after filtering ({dropped} rows dropped)")]
    EmptyInput { dropped: usize },

    /// Output extension is not a supported table format.
    #[error("Unsupported output format: '{0}' (expected csv or xlsx)")]
    UnsupportedFormat(String),

    /// Failure while serializing the output table.
    #[error("Failed to write output: {0}")]
    Write(String),
}

// =============================================================================
// Report Locator/Copier Errors
// =============================================================================

/// Fatal errors from the report locator/copier.
///
/// Per-license misses, ambiguities and copy failures are reported in
/// [`crate::reports::CopyResult`] instead; the only fatal conditions are the
/// ones that make the whole sweep impossible.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Search root does not exist or is not a directory.
    #[error("Search root is not a directory: {0}")]
    BadSearchRoot(String),

    /// Destination directory could not be created.
    #[error("Cannot create destination directory '{path}': {source}")]
    CreateDest {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_converts_to_pipeline_error() {
        let parse_err = ParseError::new(3, "bad row");
        let pipeline_err: PipelineError = parse_err.into();
        assert!(pipeline_err.to_string().contains("Line 3"));
    }

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = PipelineError::Schema {
            path: "input.csv".into(),
            missing: vec!["אסמכתת בסיס".into(), "סה'כ משקל".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("input.csv"));
        assert!(msg.contains("אסמכתת בסיס"));
        assert!(msg.contains("סה'כ משקל"));
    }

    #[test]
    fn test_empty_input_reports_drop_count() {
        let err = PipelineError::EmptyInput { dropped: 7 };
        assert!(err.to_string().contains('7'));
    }
}
