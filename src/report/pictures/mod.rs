//! Picture association and gallery construction.
//!
//! Pictures arrive as a flat collection keyed by composite identifiers.
//! They are filtered to the document being rendered, grouped by the trailing
//! question-id segment, and bucketed by type. Items join against the groups
//! through the same derived question key, so a missing match is a "no
//! picture" placeholder rather than an error.

pub mod fetch;

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::domain::{AuditItem, Picture, PictureType, Section};
use super::keys::{parse_composite, question_key};

/// Pictures attached to one question, split by classification.
#[derive(Debug, Clone, Default)]
pub struct PictureGroup {
    pub good: Vec<Picture>,
    pub finding: Vec<Picture>,
    pub corrective: Vec<Picture>,
}

impl PictureGroup {
    fn push(&mut self, picture: Picture) {
        match picture.picture_type {
            PictureType::Good => self.good.push(picture),
            PictureType::Finding => self.finding.push(picture),
            PictureType::Corrective => self.corrective.push(picture),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.good.is_empty() && self.finding.is_empty() && self.corrective.is_empty()
    }
}

/// Question-id keyed index of the pictures belonging to one document.
#[derive(Debug, Default)]
pub struct PictureIndex {
    groups: HashMap<String, PictureGroup>,
}

impl PictureIndex {
    /// Keep only pictures whose composite identifier's leading three
    /// segments equal `document_number`, then group by the trailing
    /// question id. Identifiers with fewer than four segments carry no
    /// document number and are dropped here.
    pub fn build(pictures: Vec<Picture>, document_number: &str) -> Self {
        let mut groups: HashMap<String, PictureGroup> = HashMap::new();
        for picture in pictures {
            let Some(key) = parse_composite(&picture.image_id) else {
                continue;
            };
            if key.document_number != document_number {
                continue;
            }
            groups.entry(key.question_id).or_default().push(picture);
        }
        Self { groups }
    }

    /// Look up the pictures for an item via its derived question key.
    pub fn for_item(&self, item: &AuditItem) -> Option<&PictureGroup> {
        self.groups.get(question_key(&item.id))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Classify a raw picture record. Typed sources carry an explicit
/// `pictureType` and may produce all three buckets; flag-based sources only
/// distinguish before/after and never yield `Good`.
pub fn classify_picture(fields: &Value) -> Option<PictureType> {
    if let Some(kind) = fields
        .get("pictureType")
        .or_else(|| fields.get("PictureType"))
        .and_then(Value::as_str)
    {
        return match kind.trim().to_ascii_lowercase().as_str() {
            "good" => Some(PictureType::Good),
            "finding" | "before" => Some(PictureType::Finding),
            "corrective" | "after" => Some(PictureType::Corrective),
            _ => None,
        };
    }

    let corrective = fields
        .get("isCorrective")
        .or_else(|| fields.get("IsCorrective"))
        .and_then(Value::as_bool)?;
    Some(if corrective {
        PictureType::Corrective
    } else {
        PictureType::Finding
    })
}

/// One flattened gallery entry, carrying the owning item's reference value
/// for ordering and captioning.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GalleryEntry {
    pub reference_value: String,
    pub section_name: String,
    pub question_title: String,
    pub picture: Picture,
}

/// Flatten one picture type across all sections, ordered by reference value
/// using numeric-aware comparison (`"2.9"` sorts before `"2.10"`).
pub fn build_gallery(
    sections: &[Section],
    index: &PictureIndex,
    picture_type: PictureType,
) -> Vec<GalleryEntry> {
    let mut entries: Vec<GalleryEntry> = Vec::new();
    for section in sections {
        for item in &section.items {
            let Some(group) = index.for_item(item) else {
                continue;
            };
            let bucket = match picture_type {
                PictureType::Good => &group.good,
                PictureType::Finding => &group.finding,
                PictureType::Corrective => &group.corrective,
            };
            for picture in bucket {
                entries.push(GalleryEntry {
                    reference_value: item.reference_value.clone(),
                    section_name: section.section_name.clone(),
                    question_title: item.title.clone(),
                    picture: picture.clone(),
                });
            }
        }
    }
    entries.sort_by(|a, b| natural_cmp(&a.reference_value, &b.reference_value));
    entries
}

/// Numeric-aware string ordering: digit runs compare as numbers, everything
/// else byte-wise.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(lc), Some(rc)) => {
                if lc.is_ascii_digit() && rc.is_ascii_digit() {
                    let lnum = take_number(&mut left);
                    let rnum = take_number(&mut right);
                    match lnum.cmp(&rnum) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }
                match lc.cmp(&rc) {
                    Ordering::Equal => {
                        left.next();
                        right.next();
                    }
                    unequal => return unequal,
                }
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut number = 0u64;
    while let Some(ch) = chars.peek().copied() {
        let Some(digit) = ch.to_digit(10) else { break };
        number = number.saturating_mul(10).saturating_add(u64::from(digit));
        chars.next();
    }
    number
}
