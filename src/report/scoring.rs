//! Weighted-coefficient scoring with NA-exclusion semantics.
//!
//! Per-item rule: Yes earns the full coefficient, Partially half, No zero.
//! An explicit NA earns `None` and drops out of both the numerator and the
//! denominator; an empty/unknown answer scores zero at the item level but is
//! likewise excluded from section aggregates.

use serde::Serialize;

use super::domain::{Choice, HistoricalSectionScore, Section, SectionScore};

/// Default passing grade applied when no configuration row is resolvable.
pub const DEFAULT_PASSING_GRADE: f64 = 83.0;

/// Weighted score for one answer. `None` only for an explicit NA.
pub fn item_value(choice: Option<Choice>, coefficient: f64) -> Option<f64> {
    match choice {
        Some(Choice::Yes) => Some(coefficient),
        Some(Choice::Partially) => Some(0.5 * coefficient),
        Some(Choice::No) => Some(0.0),
        Some(Choice::Na) => None,
        None => Some(0.0),
    }
}

/// Round half-up to two decimals. Applied once, at aggregate computation
/// time; downstream consumers must not re-round.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Earned/max/percentage for one section. A section whose items are all NA
/// (or unset) has no denominator and scores 0, not 100 and not null.
pub fn score_section(section: &Section) -> SectionScore {
    let scoreable = section.items.iter().filter(|item| item.is_scoreable());

    let mut earned = 0.0;
    let mut max = 0.0;
    for item in scoreable {
        earned += item.value().unwrap_or(0.0);
        max += item.coefficient;
    }

    SectionScore {
        earned,
        max,
        percentage: percentage_of(earned, max),
    }
}

/// Overall rollup: earned/max summed across every section.
pub fn score_overall(sections: &[Section]) -> SectionScore {
    let mut earned = 0.0;
    let mut max = 0.0;
    for section in sections {
        let score = score_section(section);
        earned += score.earned;
        max += score.max;
    }
    SectionScore {
        earned,
        max,
        percentage: percentage_of(earned, max),
    }
}

fn percentage_of(earned: f64, max: f64) -> f64 {
    if max > 0.0 {
        round2(earned / max * 100.0)
    } else {
        0.0
    }
}

/// Which formula produced a category percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryBasis {
    /// Earned/max summed across member sections (preferred).
    Weighted,
    /// Plain average of member percentages. Only taken when no member
    /// section carries weighted fields, which happens for legacy
    /// historical rows stored as flat percentages.
    AveragedLegacy,
}

/// Roll member-section aggregates up into one category percentage.
///
/// Returns `None` for an empty member list. The averaged branch is never
/// taken while any member has earned/max data.
pub fn rollup_category(members: &[HistoricalSectionScore]) -> Option<(f64, CategoryBasis)> {
    if members.is_empty() {
        return None;
    }

    let weighted: Vec<(f64, f64)> = members
        .iter()
        .filter_map(|score| Some((score.earned?, score.max?)))
        .collect();

    if !weighted.is_empty() {
        let earned: f64 = weighted.iter().map(|(earned, _)| earned).sum();
        let max: f64 = weighted.iter().map(|(_, max)| max).sum();
        return Some((percentage_of(earned, max), CategoryBasis::Weighted));
    }

    let sum: f64 = members.iter().map(|score| score.percentage).sum();
    Some((
        round2(sum / members.len() as f64),
        CategoryBasis::AveragedLegacy,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

/// Threshold comparison is inclusive: a score exactly at the passing grade
/// passes.
pub fn evaluate(percentage: f64, threshold: f64) -> Verdict {
    if percentage >= threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}
