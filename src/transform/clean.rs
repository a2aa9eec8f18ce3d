//! Per-record cleaning: the negative/missing-value filter and the
//! grams-to-kilograms conversion.
//!
//! Both steps are pure functions over records. Filtering never aborts the
//! run: each rejected row is returned as a [`DroppedRow`] so the caller can
//! count and report it.

use serde::Serialize;

use crate::models::{FilteredRecord, TransactionRecord};

/// Grams per kilogram.
const GRAMS_PER_KILOGRAM: f64 = 1000.0;

/// Why a row was rejected by the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum DropReason {
    NegativeWeight { value: f64 },
    NegativePackages { value: f64 },
    MissingWeight,
    MissingPackages,
    MissingReference,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::NegativeWeight { value } => write!(f, "negative weight ({})", value),
            DropReason::NegativePackages { value } => write!(f, "negative package count ({})", value),
            DropReason::MissingWeight => write!(f, "missing or non-numeric weight"),
            DropReason::MissingPackages => write!(f, "missing or non-numeric package count"),
            DropReason::MissingReference => write!(f, "empty base-document reference"),
        }
    }
}

/// One rejected row. `row` is the 1-based position in the concatenated
/// input sequence (all files, in path order).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    pub row: usize,
    #[serde(flatten)]
    pub reason: DropReason,
}

/// Check one record against the filter rules.
///
/// A record passes when its base reference is non-empty and both numeric
/// fields are present and non-negative. Zero is valid.
pub fn filter_record(record: &TransactionRecord) -> Result<FilteredRecord, DropReason> {
    if record.reference.is_empty() {
        return Err(DropReason::MissingReference);
    }
    let weight = match record.weight {
        Some(w) if w < 0.0 => return Err(DropReason::NegativeWeight { value: w }),
        Some(w) => w,
        None => return Err(DropReason::MissingWeight),
    };
    let packages = match record.packages {
        Some(p) if p < 0.0 => return Err(DropReason::NegativePackages { value: p }),
        Some(p) => p,
        None => return Err(DropReason::MissingPackages),
    };

    Ok(FilteredRecord {
        license: record.license.clone(),
        reference: record.reference.clone(),
        card_name: record.card_name.clone(),
        foreign_name: record.foreign_name.clone(),
        address: record.address.clone(),
        weight,
        packages,
    })
}

/// Apply the filter to a record sequence, preserving order.
///
/// Returns the surviving records and the rejected rows with their reasons.
pub fn filter_records(records: &[TransactionRecord]) -> (Vec<FilteredRecord>, Vec<DroppedRow>) {
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = Vec::new();

    for (i, record) in records.iter().enumerate() {
        match filter_record(record) {
            Ok(filtered) => kept.push(filtered),
            Err(reason) => dropped.push(DroppedRow { row: i + 1, reason }),
        }
    }

    (kept, dropped)
}

/// Rescale a record's weight from grams to kilograms.
///
/// Pure and total: defined for every numeric weight, including zero.
/// Full floating precision is retained; rounding is a presentation concern.
pub fn convert_to_kilograms(record: FilteredRecord) -> FilteredRecord {
    FilteredRecord {
        weight: record.weight / GRAMS_PER_KILOGRAM,
        ..record
    }
}
