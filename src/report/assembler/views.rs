//! Serializable document model handed to the external renderer.
//!
//! The assembler produces one [`ReportDocument`] per generation request; it
//! is immutable once built and carries everything a templating layer needs,
//! with `None` serialized as `null` for "no data" cells so a renderer can
//! show them distinctly from a real 0%.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::domain::{AuditItem, Priority, SectionScore, TemperatureReading};
use crate::report::history::{CategoryCycleScore, RepetitiveFinding};
use crate::report::pictures::GalleryEntry;
use crate::report::scoring::Verdict;
use crate::report::thresholds::Thresholds;

/// Identity of the audit being rendered.
#[derive(Debug, Clone, Serialize)]
pub struct AuditMeta {
    pub store_name: String,
    pub document_number: String,
    pub schema_id: String,
    pub cycle: String,
    pub year: i32,
    pub generated_at: DateTime<Utc>,
}

/// One row of a section's findings sub-table.
#[derive(Debug, Clone, Serialize)]
pub struct FindingRow {
    pub reference_value: String,
    pub question_title: String,
    pub choice_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrective_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Present when the same reference value carried findings in prior
    /// audits for this store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetitive: Option<RepetitiveFinding>,
}

/// A scored section with its items, findings, and historical trend.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub section_id: String,
    pub section_name: String,
    pub section_number: u32,
    pub items: Vec<AuditItem>,
    pub score: SectionScore,
    pub threshold: f64,
    pub verdict: Verdict,
    pub findings: Vec<FindingRow>,
    /// One slot per requested cycle, `null` where no prior data exists.
    pub history: Vec<Option<f64>>,
}

/// A category rollup row.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub category_id: String,
    pub name: String,
    pub display_order: u32,
    pub section_names: Vec<String>,
    /// `null` when none of the member sections exist in this audit.
    pub percentage: Option<f64>,
    pub verdict: Option<Verdict>,
    pub history: Vec<Option<CategoryCycleScore>>,
    /// True for the trailing synthetic group holding uncategorized sections.
    pub synthetic: bool,
}

/// One of the three cross-cutting galleries.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryView {
    pub title: &'static str,
    pub entries: Vec<GalleryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Galleries {
    pub good: GalleryView,
    pub finding: GalleryView,
    pub corrective: GalleryView,
}

/// Bad-vs-good temperature readings for one section.
#[derive(Debug, Clone, Serialize)]
pub struct FridgeExceptionView {
    pub section_id: String,
    pub section_name: String,
    pub out_of_range: Vec<TemperatureReading>,
    pub in_range: Vec<TemperatureReading>,
}

/// Current score plus up to six historical cycle columns.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub current: f64,
    pub verdict: Verdict,
    pub cycles: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    pub cycle_codes: Vec<String>,
    pub sections: Vec<SummaryRow>,
    pub categories: Vec<SummaryRow>,
    pub total: SummaryRow,
}

/// Where a non-fatal degradation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningScope {
    Answers,
    Pictures,
    Historical,
    Categories,
    Temperatures,
}

impl WarningScope {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Answers => "answers",
            Self::Pictures => "pictures",
            Self::Historical => "historical",
            Self::Categories => "categories",
            Self::Temperatures => "temperatures",
        }
    }
}

/// Non-fatal degradation notice attached to the finished document.
#[derive(Debug, Clone, Serialize)]
pub struct ReportWarning {
    pub scope: WarningScope,
    pub detail: String,
}

impl ReportWarning {
    pub fn new(scope: WarningScope, detail: impl Into<String>) -> Self {
        Self {
            scope,
            detail: detail.into(),
        }
    }
}

/// The finished, renderer-agnostic report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub audit_meta: AuditMeta,
    pub sections: Vec<SectionView>,
    pub categories: Vec<CategoryView>,
    pub galleries: Galleries,
    pub fridge_exceptions: Vec<FridgeExceptionView>,
    pub summary: SummaryTable,
    pub total_score: SectionScore,
    pub overall_verdict: Verdict,
    pub thresholds: Thresholds,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReportWarning>,
}
