//! Per-section content statistics
//!
//! A section runs from just after one heading to just before the next (any
//! heading level counts as a boundary). Words and paragraphs come from the
//! non-blank paragraphs in that span. Tables and pictures anchored to a
//! paragraph are attributed by that paragraph; unanchored ones fall back to
//! comparing the object's ordinal index with the span, which is only an
//! approximation.

use rand::Rng;
use tracing::{debug, info};

use crate::document::{DocumentSnapshot, EmbeddedObject};
use crate::domain::{PlanItem, SectionStats, SectionStatus, normalize_title};

/// Statistics measured under one heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMeasure {
    pub title: String,
    /// 1, 2, or 3 for headings the plan never matches
    pub level: u8,
    pub stats: SectionStats,
}

/// Plan after a refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsOutcome {
    pub plan: Vec<PlanItem>,
    /// Items whose statistics came from a matching section
    pub matched: usize,
    /// Items promoted from `empty` to `created`
    pub promoted: usize,
}

fn count_objects(objects: &[EmbeddedObject], start: usize, end: usize) -> u32 {
    objects
        .iter()
        .enumerate()
        .filter(|(ordinal, object)| {
            let index = object.paragraph_index.unwrap_or(*ordinal);
            (start..end).contains(&index)
        })
        .count() as u32
}

/// Measure every heading-delimited section of the document
pub fn measure_sections(snapshot: &DocumentSnapshot) -> Vec<SectionMeasure> {
    let headings = snapshot.headings();
    debug!(headings = %headings.len(), paragraphs = %snapshot.paragraphs.len(), "measure_sections: called");

    headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let start = heading.position + 1;
            let end = headings
                .get(i + 1)
                .map(|next| next.position)
                .unwrap_or(snapshot.paragraphs.len());

            let body: Vec<&str> = snapshot.paragraphs[start.min(end)..end]
                .iter()
                .filter(|p| !p.is_blank())
                .map(|p| p.text.as_str())
                .collect();

            SectionMeasure {
                title: heading.text.clone(),
                level: heading.level,
                stats: SectionStats {
                    words: body.iter().map(|text| text.split_whitespace().count() as u32).sum(),
                    paragraphs: body.len() as u32,
                    tables: count_objects(&snapshot.tables, start, end),
                    graphics: count_objects(&snapshot.pictures, start, end),
                },
            }
        })
        .collect()
}

/// Exact title match first, then containment in either direction
fn find_measure<'a>(item: &PlanItem, measures: &'a [SectionMeasure]) -> Option<&'a SectionMeasure> {
    let title = item.normalized_title();
    if title.is_empty() {
        return None;
    }
    let candidates = || {
        measures
            .iter()
            .filter(|m| m.level <= 2)
            .map(|m| (m, normalize_title(&m.title)))
            .filter(|(_, t)| !t.is_empty())
    };

    candidates()
        .find(|(_, t)| *t == title)
        .or_else(|| candidates().find(|(_, t)| t.contains(&title) || title.contains(t.as_str())))
        .map(|(m, _)| m)
}

/// Copy measured statistics onto matching plan items
///
/// Items without a matching section keep their previous statistics.
pub fn apply_measures(plan: &[PlanItem], measures: &[SectionMeasure]) -> StatsOutcome {
    let mut matched = 0;
    let mut promoted = 0;

    let plan = plan
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if let Some(measure) = find_measure(&item, measures) {
                item.set_stats(measure.stats);
                matched += 1;
                if item.status == SectionStatus::Empty && measure.stats.words > 0 {
                    item.status = SectionStatus::Created;
                    promoted += 1;
                }
            }
            item
        })
        .collect();

    info!(%matched, %promoted, "apply_measures: done");
    StatsOutcome { plan, matched, promoted }
}

/// Recompute statistics from the document body
pub fn refresh(plan: &[PlanItem], snapshot: &DocumentSnapshot) -> StatsOutcome {
    apply_measures(plan, &measure_sections(snapshot))
}

/// Random statistics for working without a document host
///
/// Only meant for development: every field is drawn independently.
pub fn simulate<R: Rng + ?Sized>(plan: &[PlanItem], rng: &mut R) -> Vec<PlanItem> {
    debug!(items = %plan.len(), "simulate: called");
    plan.iter()
        .map(|item| {
            let mut item = item.clone();
            item.set_stats(SectionStats {
                words: rng.random_range(50..=2000),
                paragraphs: rng.random_range(1..=30),
                tables: rng.random_range(0..=3),
                graphics: rng.random_range(0..=5),
            });
            item
        })
        .collect()
}
