use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical answer states for an audit question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Yes,
    Partially,
    No,
    Na,
}

impl Choice {
    /// Case-insensitive parse of the raw answer text. `None` for
    /// empty/unknown values, which stay distinct from an explicit NA.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "partially" | "partial" => Some(Self::Partially),
            "no" => Some(Self::No),
            "na" | "n/a" | "not applicable" => Some(Self::Na),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::Partially => "Partially",
            Self::No => "No",
            Self::Na => "N/A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// One normalized question/response pair.
///
/// `value()` is always recomputed from the choice and coefficient; a stored
/// value from an upstream shape is never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditItem {
    pub id: String,
    /// Trailing segment of `id` when the id is composite, else `id` itself.
    pub question_id: String,
    /// Ordering/display key such as `"2.26"`. Synthesized when absent.
    pub reference_value: String,
    pub title: String,
    pub coefficient: f64,
    pub selected_choice: Option<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrective_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl AuditItem {
    /// Weighted score contribution. `None` only for an explicit NA answer;
    /// an empty/unknown answer scores zero (and is excluded from section
    /// aggregates alongside NA, see the scoring module).
    pub fn value(&self) -> Option<f64> {
        super::scoring::item_value(self.selected_choice, self.coefficient)
    }

    /// Whether the item participates in earned/max aggregation.
    pub fn is_scoreable(&self) -> bool {
        !matches!(self.selected_choice, None | Some(Choice::Na))
    }

    /// Whether the item belongs in a findings sub-table: a negative answer
    /// carrying finding or corrective-action text. A bare comment does not
    /// qualify; it rides along as display data when the item qualifies.
    pub fn has_finding_content(&self) -> bool {
        let carries_text = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        };
        matches!(self.selected_choice, Some(Choice::No) | Some(Choice::Partially))
            && (carries_text(&self.finding) || carries_text(&self.corrective_action))
    }
}

/// A named, ordered group of audit items under a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub section_id: String,
    pub section_name: String,
    pub section_number: u32,
    pub items: Vec<AuditItem>,
}

/// Derived earned/max/percentage aggregate. Never stored independently of
/// the items that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    pub earned: f64,
    pub max: f64,
    pub percentage: f64,
}

/// Optional grouping of sections for rollup display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub name: String,
    pub display_order: u32,
    pub section_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureType {
    Good,
    Finding,
    Corrective,
}

impl PictureType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good Practice",
            Self::Finding => "Finding",
            Self::Corrective => "Corrective Action",
        }
    }
}

/// A picture attached to an audit response. Classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    /// Composite identifier, e.g. `"GMRL-FSACR-0048-87"`.
    pub image_id: String,
    pub picture_type: PictureType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Per-section aggregate inside a historical record. Legacy rows carry only
/// a flat percentage; weighted rows also carry earned/max.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSectionScore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earned: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub percentage: f64,
}

/// A prior audit's aggregate, read-only for the duration of one report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub document_number: String,
    pub store_name: String,
    /// Cycle label as stored, e.g. `"C1 (Jan/Feb)"`.
    pub cycle: String,
    pub year: i32,
    pub total_score: f64,
    pub created: DateTime<Utc>,
    pub section_scores: BTreeMap<String, HistoricalSectionScore>,
    /// Reference values that carried a finding in that audit.
    #[serde(default)]
    pub finding_refs: Vec<String>,
}

/// A fridge/temperature log entry, joined to sections by its raw
/// `section_id` foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub reading_id: String,
    pub section_id: String,
    pub unit_label: String,
    pub temperature_c: f64,
    pub within_range: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded: Option<DateTime<Utc>>,
}
