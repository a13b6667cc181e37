//! Report assembly: one generation request in, one document model out.
//!
//! Every piece of the document (sections, galleries, history, fridge
//! tables) is built independently; an upstream failure degrades that piece
//! to an empty placeholder plus a [`ReportWarning`] instead of aborting the
//! run. The only fatal condition is a missing document identity.

pub mod ingest;
pub mod views;

use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{Category, HistoricalSectionScore, Picture, Section, TemperatureReading};
use super::history::{cycle_codes, HistoricalSet};
use super::pictures::fetch::resolve_data_urls;
use super::pictures::{build_gallery, PictureIndex};
use super::scoring::{evaluate, rollup_category, score_overall, score_section};
use super::sources::{ListQuery, PictureSource, RecordSource, SettingsStore};
use super::thresholds::ThresholdResolver;
use views::{
    AuditMeta, CategoryView, FindingRow, FridgeExceptionView, Galleries, GalleryView,
    ReportDocument, ReportWarning, SectionView, SummaryRow, SummaryTable, WarningScope,
};

pub const ANSWERS_LIST: &str = "AuditAnswers";
pub const PICTURES_LIST: &str = "AuditPictures";
pub const HISTORY_LIST: &str = "AuditHistory";
pub const CATEGORIES_LIST: &str = "AuditCategories";
pub const TEMPERATURES_LIST: &str = "TemperatureLogs";

/// Identity of the audit to render.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub schema_id: String,
    pub store_name: String,
    pub document_number: String,
    pub cycle: String,
    pub year: i32,
}

/// Per-run knobs, normally sourced from [`crate::config::AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub image_concurrency: usize,
    pub cycle_slots: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            image_concurrency: 4,
            cycle_slots: super::history::DEFAULT_CYCLE_SLOTS,
        }
    }
}

/// Collaborators and identity for one report generation.
pub struct ReportContext<'a, S: SettingsStore> {
    pub records: &'a dyn RecordSource,
    pub pictures: &'a dyn PictureSource,
    pub thresholds: &'a ThresholdResolver<S>,
    pub request: AuditRequest,
    pub options: ReportOptions,
}

/// The single fatal failure mode: everything else degrades to warnings.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no document identity supplied")]
    MissingDocumentIdentity,
}

/// Assemble the full document model for one audit.
pub async fn assemble_report<S: SettingsStore>(
    ctx: ReportContext<'_, S>,
) -> Result<ReportDocument, ReportError> {
    let request = &ctx.request;
    if request.document_number.trim().is_empty() {
        return Err(ReportError::MissingDocumentIdentity);
    }

    let mut warnings: Vec<ReportWarning> = Vec::new();
    let codes = cycle_codes(ctx.options.cycle_slots);

    let sections = load_sections(&ctx, &mut warnings).await;
    let history = load_history(&ctx, &mut warnings).await;
    let categories = load_categories(&ctx, &mut warnings).await;
    let readings = load_temperatures(&ctx, &mut warnings).await;
    let picture_index = load_pictures(&ctx, &mut warnings).await;

    let thresholds = ctx.thresholds.get(&request.schema_id).await;

    let mut section_views = Vec::with_capacity(sections.len());
    for section in &sections {
        let score = score_section(section);
        let threshold = ctx
            .thresholds
            .section_threshold(&request.schema_id, &section.section_id)
            .await;

        let findings = section
            .items
            .iter()
            .filter(|item| item.has_finding_content())
            .map(|item| FindingRow {
                reference_value: item.reference_value.clone(),
                question_title: item.title.clone(),
                choice_label: item
                    .selected_choice
                    .map(|choice| choice.label())
                    .unwrap_or(""),
                finding: item.finding.clone(),
                corrective_action: item.corrective_action.clone(),
                comment: item.comment.clone(),
                priority: item.priority,
                repetitive: history.repetitive_finding(&item.reference_value),
            })
            .collect();

        section_views.push(SectionView {
            section_id: section.section_id.clone(),
            section_name: section.section_name.clone(),
            section_number: section.section_number,
            items: section.items.clone(),
            score,
            threshold,
            verdict: evaluate(score.percentage, threshold),
            findings,
            history: history.section_series(&section.section_name, &codes),
        });
    }

    let category_views =
        build_category_views(&categories, &section_views, &history, &codes, thresholds.category);

    let galleries = Galleries {
        good: GalleryView {
            title: "Good Practices",
            entries: build_gallery(&sections, &picture_index, super::domain::PictureType::Good),
        },
        finding: GalleryView {
            title: "Findings",
            entries: build_gallery(&sections, &picture_index, super::domain::PictureType::Finding),
        },
        corrective: GalleryView {
            title: "Corrective Actions",
            entries: build_gallery(
                &sections,
                &picture_index,
                super::domain::PictureType::Corrective,
            ),
        },
    };

    let fridge_exceptions = build_fridge_exceptions(&sections, readings);

    let total_score = score_overall(&sections);
    let overall_verdict = evaluate(total_score.percentage, thresholds.overall);

    let summary = SummaryTable {
        cycle_codes: codes.clone(),
        sections: section_views
            .iter()
            .map(|view| SummaryRow {
                label: view.section_name.clone(),
                current: view.score.percentage,
                verdict: view.verdict,
                cycles: view.history.clone(),
            })
            .collect(),
        categories: category_views
            .iter()
            .filter_map(|view| {
                let current = view.percentage?;
                Some(SummaryRow {
                    label: view.name.clone(),
                    current,
                    verdict: view.verdict.unwrap_or(super::scoring::Verdict::Fail),
                    cycles: view
                        .history
                        .iter()
                        .map(|slot| slot.map(|cycle| cycle.percentage))
                        .collect(),
                })
            })
            .collect(),
        total: SummaryRow {
            label: "Total".to_string(),
            current: total_score.percentage,
            verdict: overall_verdict,
            cycles: history.total_series(&codes),
        },
    };

    info!(
        document = %request.document_number,
        sections = section_views.len(),
        warnings = warnings.len(),
        "report assembled"
    );

    Ok(ReportDocument {
        audit_meta: AuditMeta {
            store_name: request.store_name.clone(),
            document_number: request.document_number.clone(),
            schema_id: request.schema_id.clone(),
            cycle: request.cycle.clone(),
            year: request.year,
            generated_at: Utc::now(),
        },
        sections: section_views,
        categories: category_views,
        galleries,
        fridge_exceptions,
        summary,
        total_score,
        overall_verdict,
        thresholds,
        warnings,
    })
}

async fn fetch_list<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    list: &str,
    query: ListQuery,
    scope: WarningScope,
    warnings: &mut Vec<ReportWarning>,
) -> Vec<Value> {
    match ctx.records.list_items(list, &query).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(list, error = %err, "record source fetch failed, continuing with empty list");
            warnings.push(ReportWarning::new(
                scope,
                format!("{list} unavailable: {err}"),
            ));
            Vec::new()
        }
    }
}

async fn load_sections<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    warnings: &mut Vec<ReportWarning>,
) -> Vec<Section> {
    let query = ListQuery::filtered(format!(
        "DocumentNumber eq '{}'",
        ctx.request.document_number
    ));
    let rows = fetch_list(ctx, ANSWERS_LIST, query, WarningScope::Answers, warnings).await;
    ingest::build_sections(&rows)
}

async fn load_history<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    warnings: &mut Vec<ReportWarning>,
) -> HistoricalSet {
    let query = ListQuery::filtered(format!("StoreName eq '{}'", ctx.request.store_name));
    let rows = fetch_list(ctx, HISTORY_LIST, query, WarningScope::Historical, warnings).await;
    let records = rows.iter().filter_map(ingest::parse_historical).collect();
    HistoricalSet::new(records, &ctx.request.document_number)
}

async fn load_categories<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    warnings: &mut Vec<ReportWarning>,
) -> Vec<Category> {
    let query = ListQuery::filtered(format!("SchemaId eq '{}'", ctx.request.schema_id));
    let rows = fetch_list(ctx, CATEGORIES_LIST, query, WarningScope::Categories, warnings).await;
    let mut categories: Vec<Category> = rows.iter().filter_map(ingest::parse_category).collect();
    categories.sort_by_key(|category| category.display_order);
    categories
}

async fn load_temperatures<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    warnings: &mut Vec<ReportWarning>,
) -> Vec<TemperatureReading> {
    let query = ListQuery::filtered(format!(
        "DocumentNumber eq '{}'",
        ctx.request.document_number
    ));
    let rows = fetch_list(
        ctx,
        TEMPERATURES_LIST,
        query,
        WarningScope::Temperatures,
        warnings,
    )
    .await;
    rows.iter().filter_map(ingest::parse_temperature).collect()
}

async fn load_pictures<S: SettingsStore>(
    ctx: &ReportContext<'_, S>,
    warnings: &mut Vec<ReportWarning>,
) -> PictureIndex {
    let query = ListQuery::filtered(format!(
        "DocumentNumber eq '{}'",
        ctx.request.document_number
    ));
    let rows = fetch_list(ctx, PICTURES_LIST, query, WarningScope::Pictures, warnings).await;
    let parsed: Vec<Picture> = rows.iter().filter_map(ingest::parse_picture).collect();

    let (resolved, outcome) =
        resolve_data_urls(parsed, ctx.pictures, ctx.options.image_concurrency).await;
    if outcome.fallback > 0 {
        warnings.push(ReportWarning::new(
            WarningScope::Pictures,
            format!(
                "{} picture(s) kept remote references after failed downloads",
                outcome.fallback
            ),
        ));
    }

    PictureIndex::build(resolved, &ctx.request.document_number)
}

fn build_category_views(
    categories: &[Category],
    section_views: &[SectionView],
    history: &HistoricalSet,
    codes: &[String],
    category_threshold: f64,
) -> Vec<CategoryView> {
    let mut views = Vec::with_capacity(categories.len() + 1);
    let mut categorized: HashSet<&str> = HashSet::new();

    for category in categories {
        for name in &category.section_names {
            categorized.insert(name.as_str());
        }
        views.push(category_view(
            category.category_id.clone(),
            category.name.clone(),
            category.display_order,
            category.section_names.clone(),
            section_views,
            history,
            codes,
            category_threshold,
            false,
        ));
    }

    let uncategorized: Vec<String> = section_views
        .iter()
        .filter(|view| !categorized.contains(view.section_name.as_str()))
        .map(|view| view.section_name.clone())
        .collect();
    if !uncategorized.is_empty() {
        views.push(category_view(
            "uncategorized".to_string(),
            "Uncategorized".to_string(),
            u32::MAX,
            uncategorized,
            section_views,
            history,
            codes,
            category_threshold,
            true,
        ));
    }

    views
}

#[allow(clippy::too_many_arguments)]
fn category_view(
    category_id: String,
    name: String,
    display_order: u32,
    section_names: Vec<String>,
    section_views: &[SectionView],
    history: &HistoricalSet,
    codes: &[String],
    category_threshold: f64,
    synthetic: bool,
) -> CategoryView {
    // Live members always carry weighted fields, so the current rollup
    // never takes the legacy averaging branch.
    let members: Vec<HistoricalSectionScore> = section_names
        .iter()
        .filter_map(|name| {
            section_views
                .iter()
                .find(|view| &view.section_name == name)
                .map(|view| HistoricalSectionScore {
                    earned: Some(view.score.earned),
                    max: Some(view.score.max),
                    percentage: view.score.percentage,
                })
        })
        .collect();

    let rollup = rollup_category(&members);
    let percentage = rollup.map(|(percentage, _)| percentage);

    CategoryView {
        category_id,
        name,
        display_order,
        history: history.category_series(&section_names, codes),
        section_names,
        percentage,
        verdict: percentage.map(|current| evaluate(current, category_threshold)),
        synthetic,
    }
}

fn build_fridge_exceptions(
    sections: &[Section],
    readings: Vec<TemperatureReading>,
) -> Vec<FridgeExceptionView> {
    let mut views: Vec<FridgeExceptionView> = Vec::new();

    for reading in readings {
        let index = match views
            .iter()
            .position(|view| view.section_id == reading.section_id)
        {
            Some(index) => index,
            None => {
                let section_name = sections
                    .iter()
                    .find(|section| section.section_id == reading.section_id)
                    .map(|section| section.section_name.clone())
                    .unwrap_or_else(|| reading.section_id.clone());
                views.push(FridgeExceptionView {
                    section_id: reading.section_id.clone(),
                    section_name,
                    out_of_range: Vec::new(),
                    in_range: Vec::new(),
                });
                views.len() - 1
            }
        };
        if reading.within_range {
            views[index].in_range.push(reading);
        } else {
            views[index].out_of_range.push(reading);
        }
    }

    // Only sections with at least one bad reading form an exception pair.
    views.retain(|view| !view.out_of_range.is_empty());
    views
}
