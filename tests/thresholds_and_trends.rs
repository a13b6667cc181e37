use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use audit_report::report::assembler::{
    assemble_report, AuditRequest, ReportContext, ReportOptions, ANSWERS_LIST, HISTORY_LIST,
};
use audit_report::report::scoring::{CategoryBasis, Verdict};
use audit_report::report::sources::{
    ListQuery, PictureSource, RecordSource, SettingsStore, SourceError,
};
use audit_report::report::thresholds::ThresholdResolver;
use serde_json::{json, Value};

struct StaticRecords {
    lists: HashMap<&'static str, Vec<Value>>,
}

#[async_trait]
impl RecordSource for StaticRecords {
    async fn list_items(&self, list: &str, _query: &ListQuery) -> Result<Vec<Value>, SourceError> {
        Ok(self.lists.get(list).cloned().unwrap_or_default())
    }
}

struct NoImages;

#[async_trait]
impl PictureSource for NoImages {
    async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, SourceError> {
        Err(SourceError::NotFound)
    }
}

/// Schema-level grade plus optional per-section overrides.
struct GradedSettings {
    schema_grade: f64,
    section_grades: HashMap<&'static str, f64>,
}

#[async_trait]
impl SettingsStore for GradedSettings {
    async fn passing_grade(
        &self,
        _schema_id: &str,
        section_id: Option<&str>,
    ) -> Result<Option<f64>, SourceError> {
        match section_id {
            Some(section) => Ok(self.section_grades.get(section).copied()),
            None => Ok(Some(self.schema_grade)),
        }
    }
}

fn records() -> StaticRecords {
    let mut lists = HashMap::new();
    lists.insert(
        ANSWERS_LIST,
        vec![
            json!({
                "SectionId": "s1",
                "SectionName": "Hygiene",
                "SectionNumber": 1,
                "ResponseJSON": "[\
                    {\"Id\": \"STOR-FS-0101-1\", \"Title\": \"1.1 Surfaces sanitized\", \"Coeff\": 2, \"SelectedChoice\": \"Yes\"},\
                    {\"Id\": \"STOR-FS-0101-2\", \"Title\": \"1.2 Wiping cloths stored in sanitizer\", \"Coeff\": 2, \"SelectedChoice\": \"Partially\", \"finding\": \"Cloths left on counters\"}\
                ]",
            }),
            json!({
                "SectionId": "s2",
                "SectionName": "Pest Control",
                "SectionNumber": 2,
                "ResponseJSON": "[{\"Id\": \"STOR-FS-0101-9\", \"Title\": \"5.1 No pest activity\", \"Coeff\": 4, \"SelectedChoice\": \"Yes\"}]",
            }),
        ],
    );
    lists.insert(
        HISTORY_LIST,
        vec![
            // Legacy record: flat percentages only.
            json!({
                "Title": "STOR-FS-0092",
                "Store": "Downtown Market",
                "Cycle": "C1 (Jan/Feb)",
                "Year": 2025,
                "TotalScore": 75.0,
                "Created": "2025-01-20T08:00:00Z",
                "SectionScores": { "Hygiene": 70.0, "Pest Control": 90.0 },
            }),
            // Weighted record in a later cycle.
            json!({
                "Title": "STOR-FS-0097",
                "Store": "Downtown Market",
                "Cycle": "C2 (Mar/Apr)",
                "Year": 2025,
                "TotalScore": 85.0,
                "Created": "2025-04-05T08:00:00Z",
                "SectionScores": {
                    "Hygiene": { "Earned": 9, "Max": 10, "Percentage": 90.0 },
                    "Pest Control": { "Earned": 3, "Max": 4, "Percentage": 75.0 },
                },
            }),
        ],
    );
    StaticRecords { lists }
}

fn request() -> AuditRequest {
    AuditRequest {
        schema_id: "FS".to_string(),
        store_name: "Downtown Market".to_string(),
        document_number: "STOR-FS-0101".to_string(),
        cycle: "C3".to_string(),
        year: 2025,
    }
}

#[tokio::test]
async fn configured_grades_drive_section_and_overall_verdicts() {
    let settings = GradedSettings {
        schema_grade: 80.0,
        section_grades: HashMap::from([("s1", 70.0)]),
    };
    let resolver = ThresholdResolver::new(settings, Duration::from_secs(300));
    let source = records();

    let document = assemble_report(ReportContext {
        records: &source,
        pictures: &NoImages,
        thresholds: &resolver,
        request: request(),
        options: ReportOptions::default(),
    })
    .await
    .expect("report assembles");

    // Hygiene: 3/4 = 75%, passing its 70 override but below the schema 80.
    let hygiene = &document.sections[0];
    assert_eq!(hygiene.score.percentage, 75.0);
    assert_eq!(hygiene.threshold, 70.0);
    assert_eq!(hygiene.verdict, Verdict::Pass);

    // Pest Control has no override and inherits the schema grade.
    let pests = &document.sections[1];
    assert_eq!(pests.threshold, 80.0);
    assert_eq!(pests.verdict, Verdict::Pass);

    // Overall 7/8 = 87.5 against the schema-level 80.
    assert_eq!(document.total_score.percentage, 87.5);
    assert_eq!(document.overall_verdict, Verdict::Pass);
    assert_eq!(document.thresholds.overall, 80.0);
}

#[tokio::test]
async fn category_trend_tags_legacy_and_weighted_cycles() {
    let resolver = ThresholdResolver::new(
        GradedSettings {
            schema_grade: 83.0,
            section_grades: HashMap::new(),
        },
        Duration::from_secs(300),
    );
    let source = records();

    let document = assemble_report(ReportContext {
        records: &source,
        pictures: &NoImages,
        thresholds: &resolver,
        request: request(),
        options: ReportOptions::default(),
    })
    .await
    .expect("report assembles");

    // No category list rows: both sections land in the synthetic group.
    assert_eq!(document.categories.len(), 1);
    let group = &document.categories[0];
    assert!(group.synthetic);

    let c1 = group.history[0].expect("legacy cycle rolls up");
    assert_eq!(c1.basis, CategoryBasis::AveragedLegacy);
    assert_eq!(c1.percentage, 80.0);

    let c2 = group.history[1].expect("weighted cycle rolls up");
    assert_eq!(c2.basis, CategoryBasis::Weighted);
    // (9 + 3) / (10 + 4) = 85.71%
    assert_eq!(c2.percentage, 85.71);

    assert_eq!(group.history[2], None);
}
