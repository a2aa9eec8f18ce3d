//! Domain models for the fishload pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`TransactionRecord`] - one input row after numeric coercion
//! - [`FilteredRecord`] - a row that survived the negative/missing-value filter
//! - [`Group`] - aggregated totals for one base-document reference
//!
//! It also owns the input column schema (Hebrew labels, validated by name)
//! and license-identifier canonicalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Column Schema
// =============================================================================

/// Business license / registered dealer number.
pub const COL_LICENSE: &str = "מספר עוסק מורשה";
/// Base document reference, the grouping key.
pub const COL_REFERENCE: &str = "אסמכתת בסיס";
/// Business card name (passthrough).
pub const COL_CARD_NAME: &str = "שם כרטיס";
/// Foreign (Latin) business name (passthrough).
pub const COL_FOREIGN_NAME: &str = "שם לועזי";
/// Business address (passthrough).
pub const COL_ADDRESS: &str = "כתובת";
/// Total packages per row (numeric).
pub const COL_PACKAGES: &str = "סה'כ אריזות";
/// Total weight per row (numeric, grams on input).
pub const COL_WEIGHT: &str = "סה'כ משקל";

/// All columns the input schema must carry, in output order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_LICENSE,
    COL_REFERENCE,
    COL_CARD_NAME,
    COL_FOREIGN_NAME,
    COL_ADDRESS,
    COL_PACKAGES,
    COL_WEIGHT,
];

/// Normalize a header label for comparison.
///
/// Real exports are inconsistent about the quote character inside labels
/// like `סה'כ משקל`: ASCII apostrophe, ASCII double quote, geresh and
/// gershayim all occur. All of them compare equal here.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            '"' | '״' | '׳' => '\'',
            c => c,
        })
        .collect()
}

/// Return the required columns that are absent from `headers`.
///
/// Empty result means the schema is valid. Comparison is label-normalized.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_label(h)).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| {
            let want = normalize_label(required);
            !normalized.iter().any(|have| *have == want)
        })
        .map(|s| s.to_string())
        .collect()
}

/// Look up a cell in a parsed row by schema label, tolerating quote variants.
pub fn field<'a>(row: &'a Value, label: &str) -> Option<&'a Value> {
    let obj = row.as_object()?;
    if let Some(v) = obj.get(label) {
        return Some(v);
    }
    let want = normalize_label(label);
    obj.iter()
        .find(|(key, _)| normalize_label(key) == want)
        .map(|(_, v)| v)
}

// =============================================================================
// Cell Coercion
// =============================================================================

/// Coerce a cell to a number.
///
/// Strings are trimmed and parsed; anything non-numeric (including the empty
/// cell) becomes `None` rather than an error, mirroring how a missing value
/// is treated downstream: it fails the filter, it does not abort the run.
pub fn cell_to_f64(cell: Option<&Value>) -> Option<f64> {
    match cell? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Coerce a cell to a display string.
///
/// Spreadsheet readers hand back integral identifiers as floats; those are
/// rendered without the trailing `.0`.
pub fn cell_to_string(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// License Identifiers
// =============================================================================

/// Canonicalize a license identifier.
///
/// Identifiers are numeric but arrive in formatting variants: spreadsheet
/// floats (`129520.0`), padded (`00223725`), or with separators (`22-3725`).
/// Canonical form is the digit string with leading zeros stripped.
/// Returns `None` when the input carries no digits at all.
pub fn canonical_license(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Spreadsheet float form first: "129520.0" must not become "1295200".
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.fract() == 0.0 && f >= 0.0 && f < 1e15 {
            return Some(format!("{}", f as i64));
        }
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        Some("0".to_string())
    } else {
        Some(stripped.to_string())
    }
}

// =============================================================================
// Records
// =============================================================================

/// One input row after numeric coercion, before filtering.
///
/// `weight` is in grams here. `None` numeric fields are rows whose cells
/// were empty or non-numeric; the filter step drops them.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub license: Option<String>,
    pub reference: String,
    pub card_name: String,
    pub foreign_name: String,
    pub address: String,
    pub weight: Option<f64>,
    pub packages: Option<f64>,
}

impl TransactionRecord {
    /// Build a record from a parsed row (header-keyed cells).
    pub fn from_row(row: &Value) -> Self {
        let license = canonical_license(&cell_to_string(field(row, COL_LICENSE)));
        Self {
            license,
            reference: cell_to_string(field(row, COL_REFERENCE)),
            card_name: cell_to_string(field(row, COL_CARD_NAME)),
            foreign_name: cell_to_string(field(row, COL_FOREIGN_NAME)),
            address: cell_to_string(field(row, COL_ADDRESS)),
            weight: cell_to_f64(field(row, COL_WEIGHT)),
            packages: cell_to_f64(field(row, COL_PACKAGES)),
        }
    }
}

/// A row that survived the filter: numeric fields are definite.
///
/// `weight` is in grams until [`crate::transform::clean::convert_to_kilograms`]
/// runs, kilograms afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredRecord {
    pub license: Option<String>,
    pub reference: String,
    pub card_name: String,
    pub foreign_name: String,
    pub address: String,
    pub weight: f64,
    pub packages: f64,
}

// =============================================================================
// Groups
// =============================================================================

/// Aggregated totals for one base-document reference.
///
/// Passthrough fields carry the values of the first record that contributed
/// to the group; they are representative, not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub reference: String,
    pub license: Option<String>,
    pub card_name: String,
    pub foreign_name: String,
    pub address: String,
    pub total_packages: f64,
    pub total_weight_kg: f64,
    /// Number of records folded into this group.
    pub record_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_columns_all_present() {
        let headers: Vec<String> = REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect();
        assert!(missing_columns(&headers).is_empty());
    }

    #[test]
    fn test_missing_columns_reports_absent_label() {
        let headers = vec![COL_LICENSE.to_string(), COL_WEIGHT.to_string()];
        let missing = missing_columns(&headers);
        assert!(missing.contains(&COL_REFERENCE.to_string()));
        assert!(!missing.contains(&COL_LICENSE.to_string()));
    }

    #[test]
    fn test_quote_variants_compare_equal() {
        // gershayim in the export, apostrophe in the schema
        let headers = vec![
            COL_LICENSE.to_string(),
            COL_REFERENCE.to_string(),
            COL_CARD_NAME.to_string(),
            COL_FOREIGN_NAME.to_string(),
            COL_ADDRESS.to_string(),
            "סה\"כ אריזות".to_string(),
            "סה״כ משקל".to_string(),
        ];
        assert!(missing_columns(&headers).is_empty());
    }

    #[test]
    fn test_field_lookup_tolerates_quote_variant() {
        let row = json!({ "סה\"כ משקל": 1000 });
        let cell = field(&row, COL_WEIGHT);
        assert_eq!(cell_to_f64(cell), Some(1000.0));
    }

    #[test]
    fn test_cell_to_f64_coercion() {
        assert_eq!(cell_to_f64(Some(&json!(12.5))), Some(12.5));
        assert_eq!(cell_to_f64(Some(&json!("  42 "))), Some(42.0));
        assert_eq!(cell_to_f64(Some(&json!("-50"))), Some(-50.0));
        assert_eq!(cell_to_f64(Some(&json!("abc"))), None);
        assert_eq!(cell_to_f64(Some(&json!(""))), None);
        assert_eq!(cell_to_f64(None), None);
    }

    #[test]
    fn test_cell_to_string_trims_float_identifiers() {
        assert_eq!(cell_to_string(Some(&json!(129520.0))), "129520");
        assert_eq!(cell_to_string(Some(&json!(12.5))), "12.5");
        assert_eq!(cell_to_string(Some(&json!(" text "))), "text");
        assert_eq!(cell_to_string(None), "");
    }

    #[test]
    fn test_canonical_license_variants() {
        assert_eq!(canonical_license("129520.0"), Some("129520".into()));
        assert_eq!(canonical_license(" 00223725 "), Some("223725".into()));
        assert_eq!(canonical_license("22-3725"), Some("223725".into()));
        assert_eq!(canonical_license("223725"), Some("223725".into()));
        assert_eq!(canonical_license("no digits"), None);
        assert_eq!(canonical_license(""), None);
        assert_eq!(canonical_license("000"), Some("0".into()));
    }

    #[test]
    fn test_record_from_row() {
        let row = json!({
            COL_LICENSE: 129520.0,
            COL_REFERENCE: "129520",
            COL_CARD_NAME: "דגי הים",
            COL_FOREIGN_NAME: "Sea Fish Ltd",
            COL_ADDRESS: "חיפה",
            COL_WEIGHT: "1000",
            COL_PACKAGES: 200,
        });
        let record = TransactionRecord::from_row(&row);
        assert_eq!(record.license.as_deref(), Some("129520"));
        assert_eq!(record.reference, "129520");
        assert_eq!(record.weight, Some(1000.0));
        assert_eq!(record.packages, Some(200.0));
        assert_eq!(record.card_name, "דגי הים");
    }

    #[test]
    fn test_record_from_row_missing_numerics() {
        let row = json!({
            COL_LICENSE: "123",
            COL_REFERENCE: "r1",
            COL_WEIGHT: "n/a",
        });
        let record = TransactionRecord::from_row(&row);
        assert_eq!(record.weight, None);
        assert_eq!(record.packages, None);
        assert_eq!(record.address, "");
    }
}
