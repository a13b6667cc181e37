//! Composite-identifier parsing.
//!
//! Several upstream shapes encode store, document type, document number, and
//! question id in a single hyphen-delimited string such as
//! `"GMRL-FSACR-0048-87"`. All splitting lives here; call sites never
//! re-implement the segment logic.

/// Parsed view of a four-or-more-segment composite identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKey {
    /// The leading three segments re-joined, e.g. `"GMRL-FSACR-0048"`.
    pub document_number: String,
    /// The trailing segment, e.g. `"87"`.
    pub question_id: String,
}

/// Parse a composite identifier. Identifiers with fewer than four segments
/// do not carry a document number and yield `None`.
pub fn parse_composite(id: &str) -> Option<CompositeKey> {
    let segments: Vec<&str> = id.split('-').collect();
    if segments.len() < 4 {
        return None;
    }
    let question_id = (*segments.last()?).to_string();
    let document_number = segments[..3].join("-");
    Some(CompositeKey {
        document_number,
        question_id,
    })
}

/// Derive the question key used to join items and pictures: the trailing
/// hyphen segment, or the whole id when no hyphen is present.
pub fn question_key(id: &str) -> &str {
    id.rsplit('-').next().unwrap_or(id)
}
