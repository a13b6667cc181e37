//! Parsing of raw list items into domain values.
//!
//! Everything here is the same normalization boundary the answer normalizer
//! establishes: alias-tolerant field lookup, documented defaults, and
//! skip-and-warn on records that cannot be read. Downstream code never sees
//! a raw shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::report::domain::{
    Category, HistoricalRecord, HistoricalSectionScore, Picture, Section, TemperatureReading,
};
use crate::report::normalizer::{
    normalize_answer_list, parse_response_json, RawAnswerShape,
};
use crate::report::pictures::classify_picture;

fn field<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    aliases.iter().find_map(|alias| object.get(*alias))
}

fn string_field(record: &Value, aliases: &[&str]) -> Option<String> {
    match field(record, aliases)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn number_field(record: &Value, aliases: &[&str]) -> Option<f64> {
    match field(record, aliases)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn datetime_field(record: &Value, aliases: &[&str]) -> Option<DateTime<Utc>> {
    let raw = string_field(record, aliases)?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Group raw answer rows into ordered sections. Each row carries its section
/// identity plus either a `ResponseJSON` payload (one or more answer
/// entries) or inline answer fields. An unparseable payload skips that row
/// only; the rest of the section survives.
pub fn build_sections(rows: &[Value]) -> Vec<Section> {
    // Keyed by section id; insertion order preserved for numbering
    // fallbacks by sorting at the end.
    let mut sections: Vec<(String, String, u32, Vec<RawAnswerShape>)> = Vec::new();

    for row in rows {
        let section_id = string_field(row, &["SectionId", "sectionId", "SectionID"])
            .unwrap_or_else(|| "0".to_string());
        let section_name = string_field(row, &["SectionName", "sectionName", "Section"])
            .unwrap_or_else(|| format!("Section {section_id}"));
        let section_number = number_field(row, &["SectionNumber", "sectionNumber", "Order"])
            .map(|number| number.max(0.0) as u32)
            .unwrap_or(0);

        let shapes = answer_shapes(row);

        match sections
            .iter_mut()
            .find(|(existing_id, ..)| *existing_id == section_id)
        {
            Some((_, _, _, existing)) => existing.extend(shapes),
            None => sections.push((section_id, section_name, section_number, shapes)),
        }
    }

    let mut built: Vec<Section> = sections
        .into_iter()
        .map(|(section_id, section_name, section_number, shapes)| Section {
            section_id,
            section_name,
            section_number,
            items: normalize_answer_list(shapes),
        })
        .collect();
    built.sort_by_key(|section| section.section_number);
    built
}

fn answer_shapes(row: &Value) -> Vec<RawAnswerShape> {
    if let Some(payload) = string_field(row, &["ResponseJSON", "ResponseJson", "responseJson"]) {
        return match parse_response_json(&payload) {
            Ok(entries) => entries.into_iter().map(RawAnswerShape::ResponseJson).collect(),
            Err(err) => {
                warn!(error = %err, "skipping answer row with unparseable ResponseJSON");
                Vec::new()
            }
        };
    }
    // Relational rows carry the answer fields inline.
    vec![RawAnswerShape::Row(row.clone())]
}

/// Parse one raw picture record; unclassifiable or id-less records are
/// dropped with a warning.
pub fn parse_picture(record: &Value) -> Option<Picture> {
    let image_id = string_field(record, &["ImageID", "ImageId", "Id", "ID"])?;
    let Some(picture_type) = classify_picture(record) else {
        warn!(image_id = %image_id, "dropping picture with no usable classification");
        return None;
    };

    let remote_url = string_field(record, &["Url", "url", "ServerRelativeUrl", "remoteUrl"]);
    let data_url = string_field(record, &["DataUrl", "dataUrl"]);
    let file_name = string_field(record, &["FileName", "fileName", "Name"])
        .unwrap_or_else(|| format!("{image_id}.jpg"));

    Some(Picture {
        image_id,
        picture_type,
        remote_url,
        data_url,
        file_name,
        created: datetime_field(record, &["Created", "created"]),
    })
}

/// Parse one historical aggregate row. Section scores arrive either as
/// weighted objects (`{"Earned": 8, "Max": 10, "Percentage": 80}`) or as a
/// bare legacy percentage number.
pub fn parse_historical(record: &Value) -> Option<HistoricalRecord> {
    let document_number =
        string_field(record, &["DocumentNumber", "documentNumber", "Title"])?;
    let store_name = string_field(record, &["StoreName", "storeName", "Store"])
        .unwrap_or_default();
    let cycle = string_field(record, &["Cycle", "cycle"]).unwrap_or_default();
    let year = number_field(record, &["Year", "year"]).map(|year| year as i32).unwrap_or(0);
    let total_score = number_field(record, &["TotalScore", "totalScore", "Score"])
        .unwrap_or(0.0);
    let created = datetime_field(record, &["Created", "created"])
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);

    let mut section_scores = BTreeMap::new();
    if let Some(Value::Object(scores)) = field(record, &["SectionScores", "sectionScores"]) {
        for (name, value) in scores {
            let score = match value {
                Value::Number(percentage) => HistoricalSectionScore {
                    earned: None,
                    max: None,
                    percentage: percentage.as_f64().unwrap_or(0.0),
                },
                Value::Object(_) => HistoricalSectionScore {
                    earned: number_field(value, &["Earned", "earned"]),
                    max: number_field(value, &["Max", "max"]),
                    percentage: number_field(value, &["Percentage", "percentage"])
                        .unwrap_or(0.0),
                },
                _ => continue,
            };
            section_scores.insert(name.clone(), score);
        }
    }

    let finding_refs = field(record, &["FindingRefs", "findingRefs"])
        .and_then(Value::as_array)
        .map(|refs| {
            refs.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(HistoricalRecord {
        document_number,
        store_name,
        cycle,
        year,
        total_score,
        created,
        section_scores,
        finding_refs,
    })
}

/// Parse one category membership row. Member sections arrive as either a
/// JSON array or a `";"`-separated string.
pub fn parse_category(record: &Value) -> Option<Category> {
    let category_id = string_field(record, &["CategoryId", "categoryId", "Id", "ID"])?;
    let name = string_field(record, &["Title", "Name", "name"])
        .unwrap_or_else(|| format!("Category {category_id}"));
    let display_order = number_field(record, &["DisplayOrder", "displayOrder", "Order"])
        .map(|order| order.max(0.0) as u32)
        .unwrap_or(u32::MAX);

    let section_names = match field(record, &["Sections", "sections", "SectionNames"]) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Some(Category {
        category_id,
        name,
        display_order,
        section_names,
    })
}

/// Parse one fridge/temperature log row. The section join is a raw foreign
/// key, never composite-id parsing.
pub fn parse_temperature(record: &Value) -> Option<TemperatureReading> {
    let reading_id = string_field(record, &["Id", "ID", "ReadingId"])?;
    let section_id = string_field(record, &["SectionId", "sectionId", "SectionID"])?;
    let unit_label = string_field(record, &["UnitLabel", "Unit", "unit"])
        .unwrap_or_else(|| "Unit".to_string());
    let temperature_c = number_field(record, &["Temperature", "TempC", "temperature"])?;
    let within_range = field(record, &["WithinRange", "withinRange", "IsOk"])
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Some(TemperatureReading {
        reading_id,
        section_id,
        unit_label,
        temperature_c,
        within_range,
        recorded: datetime_field(record, &["Recorded", "recorded", "Created"]),
    })
}
