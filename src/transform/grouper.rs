//! Group converted records by base-document reference.
//!
//! ```text
//! Converted input (rows)             →  Grouped output
//! ┌─────────────────────────────┐       ┌──────────────────────────┐
//! │ ref: 129520, 1.0 kg, 200 pk │       │ ref: 129520              │
//! │ ref: 129520, 0.5 kg,  50 pk │  →    │ 1.5 kg, 250 packages     │
//! │ ref: 129523, 3.6 kg, 800 pk │       ├──────────────────────────┤
//! └─────────────────────────────┘       │ ref: 129523              │
//!                                       │ 3.6 kg, 800 packages     │
//!                                       └──────────────────────────┘
//! ```
//!
//! Emitted groups follow the first-seen order of their key across the input
//! sequence, not sorted order. Weight and package totals are conserved: the
//! sums over all groups equal the sums over all input records.

use std::collections::{HashMap, HashSet};

use crate::models::{canonical_license, FilteredRecord, Group};

/// Builder accumulating one group's totals while grouping.
struct GroupBuilder {
    group: Group,
}

impl GroupBuilder {
    fn new(record: &FilteredRecord) -> Self {
        Self {
            group: Group {
                reference: record.reference.clone(),
                license: record.license.clone(),
                card_name: record.card_name.clone(),
                foreign_name: record.foreign_name.clone(),
                address: record.address.clone(),
                total_packages: 0.0,
                total_weight_kg: 0.0,
                record_count: 0,
            },
        }
    }

    fn add(&mut self, record: &FilteredRecord) {
        self.group.total_packages += record.packages;
        self.group.total_weight_kg += record.weight;
        self.group.record_count += 1;
    }

    fn build(self) -> Group {
        self.group
    }
}

/// Partition converted records by base-document reference and sum weight and
/// package counts. Passthrough fields come from the first record of each
/// group. Records must already be in kilograms.
pub fn group_records(records: &[FilteredRecord]) -> Vec<Group> {
    let mut builders: Vec<GroupBuilder> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let slot = match index.get(&record.reference) {
            Some(&i) => i,
            None => {
                index.insert(record.reference.clone(), builders.len());
                builders.push(GroupBuilder::new(record));
                builders.len() - 1
            }
        };
        builders[slot].add(record);
    }

    builders.into_iter().map(|b| b.build()).collect()
}

/// Unique canonical license identifiers across groups, in first-seen order.
///
/// These are the keys the report locator searches for. Duplicates collapse;
/// groups without a usable license contribute nothing.
pub fn license_ids(groups: &[Group]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ids = Vec::new();

    for group in groups {
        let Some(raw) = group.license.as_deref() else {
            continue;
        };
        let Some(canonical) = canonical_license(raw) else {
            continue;
        };
        if seen.insert(canonical.clone()) {
            ids.push(canonical);
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reference: &str, license: &str, weight_kg: f64, packages: f64) -> FilteredRecord {
        FilteredRecord {
            license: Some(license.into()),
            reference: reference.into(),
            card_name: format!("card-{}", reference),
            foreign_name: String::new(),
            address: "חיפה".into(),
            weight: weight_kg,
            packages,
        }
    }

    #[test]
    fn test_distinct_references_make_distinct_groups() {
        let records = vec![
            record("129520", "129520", 1.0, 200.0),
            record("129523", "129523", 3.6, 800.0),
        ];
        let groups = group_records(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].reference, "129520");
        assert_eq!(groups[0].total_weight_kg, 1.0);
        assert_eq!(groups[0].total_packages, 200.0);
        assert_eq!(groups[1].reference, "129523");
        assert_eq!(groups[1].total_weight_kg, 3.6);
        assert_eq!(groups[1].total_packages, 800.0);
    }

    #[test]
    fn test_sums_accumulate_within_group() {
        let records = vec![
            record("r1", "100", 1.0, 10.0),
            record("r1", "100", 0.5, 5.0),
            record("r1", "100", 0.25, 2.0),
        ];
        let groups = group_records(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].total_weight_kg, 1.75);
        assert_eq!(groups[0].total_packages, 17.0);
        assert_eq!(groups[0].record_count, 3);
    }

    #[test]
    fn test_first_seen_order_not_sorted() {
        let records = vec![
            record("zzz", "1", 1.0, 1.0),
            record("aaa", "2", 1.0, 1.0),
            record("zzz", "1", 1.0, 1.0),
            record("mmm", "3", 1.0, 1.0),
        ];
        let groups = group_records(&records);

        let order: Vec<&str> = groups.iter().map(|g| g.reference.as_str()).collect();
        assert_eq!(order, vec!["zzz", "aaa", "mmm"]);
    }

    #[test]
    fn test_conservation_of_totals() {
        let records = vec![
            record("a", "1", 1.25, 3.0),
            record("b", "2", 0.75, 7.0),
            record("a", "1", 2.5, 11.0),
            record("c", "3", 0.125, 13.0),
        ];
        let input_weight: f64 = records.iter().map(|r| r.weight).sum();
        let input_packages: f64 = records.iter().map(|r| r.packages).sum();

        let groups = group_records(&records);
        let group_weight: f64 = groups.iter().map(|g| g.total_weight_kg).sum();
        let group_packages: f64 = groups.iter().map(|g| g.total_packages).sum();
        let group_count: usize = groups.iter().map(|g| g.record_count).sum();

        assert_eq!(input_weight, group_weight);
        assert_eq!(input_packages, group_packages);
        assert_eq!(group_count, records.len());
    }

    #[test]
    fn test_passthrough_fields_from_first_record() {
        let mut second = record("r1", "100", 1.0, 1.0);
        second.card_name = "other name".into();
        let records = vec![record("r1", "100", 1.0, 1.0), second];

        let groups = group_records(&records);
        assert_eq!(groups[0].card_name, "card-r1");
    }

    #[test]
    fn test_license_ids_unique_first_seen() {
        let groups = group_records(&[
            record("a", "129520", 1.0, 1.0),
            record("b", "129523", 1.0, 1.0),
            record("c", "129520", 1.0, 1.0),
        ]);
        assert_eq!(license_ids(&groups), vec!["129520", "129523"]);
    }

    #[test]
    fn test_license_ids_skip_missing() {
        let mut group_without = record("a", "x", 1.0, 1.0);
        group_without.license = None;
        let groups = group_records(&[group_without, record("b", "42", 1.0, 1.0)]);
        assert_eq!(license_ids(&groups), vec!["42"]);
    }
}
