//! Normalization boundary for raw response records.
//!
//! Upstream data arrives in several shapes: SharePoint list items whose
//! `ResponseJSON` field holds an escaped JSON document, relational rows, and
//! debug-folder JSON dumps. Each shape spells the same concepts differently
//! (`Coeff`/`Coef`, `Id`/`ID`/`ImageID`, `comment`/`Comments`). Everything
//! downstream of this module operates on [`AuditItem`] only.

use serde_json::Value;
use tracing::warn;

use super::domain::{AuditItem, Choice, Priority};
use super::keys::question_key;

pub const DEFAULT_COEFFICIENT: f64 = 2.0;
pub const DEFAULT_TITLE: &str = "Unknown Question";

/// Provenance tag for a raw answer record. All shapes funnel through the
/// same alias table; the tag exists so call sites state what they ingested.
#[derive(Debug, Clone)]
pub enum RawAnswerShape {
    /// An entry parsed out of a SharePoint `ResponseJSON` field.
    ResponseJson(Value),
    /// A relational row serialized to JSON by the record source.
    Row(Value),
    /// An entry from a frozen debug-folder dump.
    DebugEntry(Value),
}

impl RawAnswerShape {
    fn fields(&self) -> &Value {
        match self {
            Self::ResponseJson(value) | Self::Row(value) | Self::DebugEntry(value) => value,
        }
    }
}

const ID_ALIASES: &[&str] = &["Id", "ID", "id", "ImageID"];
const REF_ALIASES: &[&str] = &["RefValue", "ReferenceValue", "Ref", "refValue"];
const TITLE_ALIASES: &[&str] = &["Title", "title", "Question", "question"];
const COEFF_ALIASES: &[&str] = &["Coeff", "Coef", "coeff", "coef"];
const CHOICE_ALIASES: &[&str] = &["SelectedChoice", "selectedchoice", "selectedChoice", "Answer"];
const COMMENT_ALIASES: &[&str] = &["comment", "Comment", "Comments"];
const FINDING_ALIASES: &[&str] = &["finding", "Finding", "Findings"];
const CORRECTIVE_ALIASES: &[&str] = &["correctiveAction", "correctedaction", "cr", "CorrectiveAction"];
const PRIORITY_ALIASES: &[&str] = &["priority", "Priority"];

/// Strip ASCII control characters and collapse escaped backslashes so that
/// historically double-encoded `ResponseJSON` payloads parse.
pub fn sanitize_response_json(raw: &str) -> String {
    let unescaped = raw.replace("\\\\", "\\");
    unescaped.chars().filter(|ch| !ch.is_control()).collect()
}

/// Parse a `ResponseJSON` field into a list of answer entries. A non-array
/// root is wrapped into a one-element list. Returns the serde error on an
/// unparseable payload; callers skip and log rather than abort.
pub fn parse_response_json(raw: &str) -> Result<Vec<Value>, serde_json::Error> {
    let sanitized = sanitize_response_json(raw);
    let root: Value = serde_json::from_str(&sanitized)?;
    Ok(match root {
        Value::Array(entries) => entries,
        other => vec![other],
    })
}

/// Normalize a whole answer list, skipping entries that fail to normalize.
/// The per-list sequence feeds synthesized reference values for items whose
/// title carries no leading numeric token.
pub fn normalize_answer_list(shapes: Vec<RawAnswerShape>) -> Vec<AuditItem> {
    let mut sequence = 0u32;
    shapes
        .into_iter()
        .filter_map(|shape| match normalize_answer(&shape, &mut sequence) {
            Some(item) => Some(item),
            None => {
                warn!(shape = ?shape, "skipping answer record with no usable fields");
                None
            }
        })
        .collect()
}

/// Normalize one raw record into an [`AuditItem`]. Returns `None` only when
/// the record is not a JSON object at all; missing individual fields resolve
/// to documented defaults. Normalization is deterministic: the same record
/// and sequence state always produce the same item.
pub fn normalize_answer(shape: &RawAnswerShape, sequence: &mut u32) -> Option<AuditItem> {
    let fields = shape.fields().as_object()?;
    let lookup = |aliases: &[&str]| -> Option<&Value> {
        aliases.iter().find_map(|alias| fields.get(*alias))
    };

    let id = lookup(ID_ALIASES)
        .map(value_to_string)
        .unwrap_or_default();
    let question_id = question_key(&id).to_string();

    let title = lookup(TITLE_ALIASES)
        .map(value_to_string)
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    *sequence += 1;
    let reference_value = lookup(REF_ALIASES)
        .map(value_to_string)
        .filter(|reference| !reference.trim().is_empty())
        .or_else(|| leading_numeric_token(&title))
        .unwrap_or_else(|| sequence.to_string());

    let coefficient = lookup(COEFF_ALIASES)
        .and_then(value_to_number)
        .filter(|coefficient| *coefficient >= 0.0)
        .unwrap_or(DEFAULT_COEFFICIENT);

    let selected_choice = lookup(CHOICE_ALIASES)
        .map(value_to_string)
        .as_deref()
        .and_then(Choice::parse);

    let optional_text = |aliases: &[&str]| {
        lookup(aliases)
            .map(value_to_string)
            .filter(|text| !text.trim().is_empty())
    };

    let priority = optional_text(PRIORITY_ALIASES)
        .as_deref()
        .and_then(Priority::parse);

    Some(AuditItem {
        id,
        question_id,
        reference_value,
        title,
        coefficient,
        selected_choice,
        comment: optional_text(COMMENT_ALIASES),
        finding: optional_text(FINDING_ALIASES),
        corrective_action: optional_text(CORRECTIVE_ALIASES),
        priority,
    })
}

/// Leading numeric token of a question title, e.g. `"2.26 Hand washing"`
/// yields `"2.26"`.
fn leading_numeric_token(title: &str) -> Option<String> {
    let token = title.split_whitespace().next()?;
    let looks_numeric = !token.is_empty()
        && token
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch == '.');
    if looks_numeric && token.chars().any(|ch| ch.is_ascii_digit()) {
        Some(token.trim_end_matches('.').to_string())
    } else {
        None
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

fn value_to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}
