//! Historical trend aggregation across prior audit cycles.
//!
//! One record set is fetched per report run and reused for every
//! per-section, per-cycle lookup within that run. The audit being rendered
//! is excluded up front, by document number, regardless of cycle.
//!
//! A missing cycle yields `None` rather than the legacy `"0.1"` sentinel;
//! the view layer renders it as a blank cell, keeping "no data" visually
//! distinct from a true 0% score.

use serde::Serialize;

use super::domain::{HistoricalRecord, HistoricalSectionScore};
use super::scoring::{rollup_category, round2, CategoryBasis};

/// Default number of trailing cycle columns (C1..C6).
pub const DEFAULT_CYCLE_SLOTS: usize = 6;

/// Cycle codes in display order.
pub fn cycle_codes(slots: usize) -> Vec<String> {
    (1..=slots).map(|slot| format!("C{slot}")).collect()
}

/// A historical record's cycle label matches a requested code by substring,
/// so both `"C1 (Jan/Feb)"` and `"Cycle C1"` match `"C1"` while `"C2"` does
/// not.
pub fn cycle_matches(label: &str, code: &str) -> bool {
    label.trim().contains(code)
}

/// One run's view over a store's prior audits.
#[derive(Debug)]
pub struct HistoricalSet {
    /// Newest-first, with the current audit already excluded.
    records: Vec<HistoricalRecord>,
}

/// A category rollup for one historical cycle, tagged with the formula that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCycleScore {
    pub percentage: f64,
    pub basis: CategoryBasis,
}

/// Prior occurrences of a finding's reference value across the store's
/// historical audits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepetitiveFinding {
    pub reference_value: String,
    pub occurrences: usize,
    /// Deduplicated prior document numbers, capped for display.
    pub documents: Vec<String>,
    /// How many matching documents were cut by the display cap.
    pub overflow: usize,
}

/// Display cap for prior document numbers on a repetitive finding.
pub const MAX_REPETITIVE_DOCUMENTS: usize = 5;

impl HistoricalSet {
    /// Build the run-scoped set. `records` must arrive newest-first from the
    /// source query; ties within one cycle keep that order. Any record whose
    /// document number equals `current_document` is dropped here.
    pub fn new(records: Vec<HistoricalRecord>, current_document: &str) -> Self {
        let records = records
            .into_iter()
            .filter(|record| record.document_number != current_document)
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    /// The record counted for one cycle: the most recently created match,
    /// first-in-source-order on a timestamp tie.
    pub fn record_for_cycle(&self, code: &str) -> Option<&HistoricalRecord> {
        let mut best: Option<&HistoricalRecord> = None;
        for record in self
            .records
            .iter()
            .filter(|record| cycle_matches(&record.cycle, code))
        {
            // Strict comparison keeps the earliest source position on ties.
            if best.map_or(true, |current| record.created > current.created) {
                best = Some(record);
            }
        }
        best
    }

    /// Per-section trend: one slot per requested cycle, `None` where the
    /// store has no matching audit or that audit has no row for the section.
    pub fn section_series(&self, section_name: &str, codes: &[String]) -> Vec<Option<f64>> {
        codes
            .iter()
            .map(|code| {
                let record = self.record_for_cycle(code)?;
                let score = record.section_scores.get(section_name)?;
                Some(score.percentage)
            })
            .collect()
    }

    /// Per-category trend over the member sections of each cycle's record.
    pub fn category_series(
        &self,
        member_sections: &[String],
        codes: &[String],
    ) -> Vec<Option<CategoryCycleScore>> {
        codes
            .iter()
            .map(|code| {
                let record = self.record_for_cycle(code)?;
                let members: Vec<HistoricalSectionScore> = member_sections
                    .iter()
                    .filter_map(|name| record.section_scores.get(name).copied())
                    .collect();
                let (percentage, basis) = rollup_category(&members)?;
                Some(CategoryCycleScore { percentage, basis })
            })
            .collect()
    }

    /// Total-score trend used by the summary table's bottom row.
    pub fn total_series(&self, codes: &[String]) -> Vec<Option<f64>> {
        codes
            .iter()
            .map(|code| {
                self.record_for_cycle(code)
                    .map(|record| round2(record.total_score))
            })
            .collect()
    }

    /// Flag a finding as repetitive when its reference value carried a
    /// finding in at least one prior audit for the store.
    pub fn repetitive_finding(&self, reference_value: &str) -> Option<RepetitiveFinding> {
        let mut documents: Vec<String> = Vec::new();
        for record in &self.records {
            if record
                .finding_refs
                .iter()
                .any(|reference| reference == reference_value)
                && !documents.contains(&record.document_number)
            {
                documents.push(record.document_number.clone());
            }
        }
        if documents.is_empty() {
            return None;
        }

        let occurrences = documents.len();
        let overflow = occurrences.saturating_sub(MAX_REPETITIVE_DOCUMENTS);
        documents.truncate(MAX_REPETITIVE_DOCUMENTS);

        Some(RepetitiveFinding {
            reference_value: reference_value.to_string(),
            occurrences,
            documents,
            overflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(
        document: &str,
        cycle: &str,
        created_day: u32,
        sections: &[(&str, Option<(f64, f64)>, f64)],
    ) -> HistoricalRecord {
        let mut section_scores = BTreeMap::new();
        for (name, weighted, percentage) in sections {
            section_scores.insert(
                (*name).to_string(),
                HistoricalSectionScore {
                    earned: weighted.map(|(earned, _)| earned),
                    max: weighted.map(|(_, max)| max),
                    percentage: *percentage,
                },
            );
        }
        HistoricalRecord {
            document_number: document.to_string(),
            store_name: "Galleria Mall".to_string(),
            cycle: cycle.to_string(),
            year: 2025,
            total_score: 80.0,
            created: Utc.with_ymd_and_hms(2025, 3, created_day, 12, 0, 0).unwrap(),
            section_scores,
            finding_refs: Vec::new(),
        }
    }

    #[test]
    fn cycle_labels_match_by_substring() {
        assert!(cycle_matches("C1 (Jan/Feb)", "C1"));
        assert!(cycle_matches("Cycle C3", "C3"));
        assert!(cycle_matches("C4", "C4"));
        assert!(!cycle_matches("C2", "C1"));
        assert!(!cycle_matches("", "C1"));
    }

    #[test]
    fn current_audit_is_always_excluded() {
        let set = HistoricalSet::new(
            vec![
                record("GMRL-FSACR-0048", "C3", 10, &[]),
                record("GMRL-FSACR-0040", "C3", 5, &[]),
            ],
            "GMRL-FSACR-0048",
        );
        let chosen = set.record_for_cycle("C3").expect("prior audit found");
        assert_eq!(chosen.document_number, "GMRL-FSACR-0040");
    }

    #[test]
    fn latest_creation_wins_within_one_cycle() {
        let set = HistoricalSet::new(
            vec![
                record("GMRL-FSACR-0042", "C3 (May/Jun)", 20, &[]),
                record("GMRL-FSACR-0041", "C3 (May/Jun)", 8, &[]),
            ],
            "GMRL-FSACR-0048",
        );
        let chosen = set.record_for_cycle("C3").expect("match found");
        assert_eq!(chosen.document_number, "GMRL-FSACR-0042");
    }

    #[test]
    fn timestamp_ties_keep_source_order() {
        let set = HistoricalSet::new(
            vec![
                record("GMRL-FSACR-0042", "C3", 8, &[]),
                record("GMRL-FSACR-0041", "C3", 8, &[]),
            ],
            "GMRL-FSACR-0048",
        );
        let chosen = set.record_for_cycle("C3").expect("match found");
        assert_eq!(chosen.document_number, "GMRL-FSACR-0042");
    }

    #[test]
    fn missing_cycles_are_none_not_zero() {
        let set = HistoricalSet::new(
            vec![record(
                "GMRL-FSACR-0040",
                "C2 (Mar/Apr)",
                5,
                &[("Hygiene", Some((8.0, 10.0)), 80.0)],
            )],
            "GMRL-FSACR-0048",
        );
        let series = set.section_series("Hygiene", &cycle_codes(3));
        assert_eq!(series, vec![None, Some(80.0), None]);
    }

    #[test]
    fn category_series_tags_the_formula_used() {
        let weighted = record(
            "GMRL-FSACR-0040",
            "C1",
            5,
            &[
                ("Hygiene", Some((8.0, 10.0)), 80.0),
                ("Storage", Some((5.0, 10.0)), 50.0),
            ],
        );
        let legacy = record(
            "GMRL-FSACR-0039",
            "C2",
            4,
            &[("Hygiene", None, 80.0), ("Storage", None, 50.0)],
        );
        let set = HistoricalSet::new(vec![weighted, legacy], "GMRL-FSACR-0048");

        let members = vec!["Hygiene".to_string(), "Storage".to_string()];
        let series = set.category_series(&members, &cycle_codes(2));

        let c1 = series[0].expect("weighted cycle present");
        assert_eq!(c1.basis, CategoryBasis::Weighted);
        assert_eq!(c1.percentage, 65.0);

        let c2 = series[1].expect("legacy cycle present");
        assert_eq!(c2.basis, CategoryBasis::AveragedLegacy);
        assert_eq!(c2.percentage, 65.0);
    }

    #[test]
    fn repetitive_findings_are_deduplicated_and_capped() {
        let mut records = Vec::new();
        for index in 0..8 {
            let mut prior = record(&format!("GMRL-FSACR-00{index:02}"), "C1", 1, &[]);
            prior.finding_refs = vec!["2.26".to_string()];
            records.push(prior);
        }
        // Same document listed twice must not double-count.
        let mut duplicate = record("GMRL-FSACR-0000", "C1", 1, &[]);
        duplicate.finding_refs = vec!["2.26".to_string()];
        records.push(duplicate);

        let set = HistoricalSet::new(records, "GMRL-FSACR-0048");

        let repetitive = set
            .repetitive_finding("2.26")
            .expect("reference recurs in history");
        assert_eq!(repetitive.occurrences, 8);
        assert_eq!(repetitive.documents.len(), MAX_REPETITIVE_DOCUMENTS);
        assert_eq!(repetitive.overflow, 3);

        assert_eq!(set.repetitive_finding("9.99"), None);
    }
}
