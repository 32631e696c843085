//! Plan / document heading synchronization
//!
//! Works in both directions at once:
//! - document headings the plan does not know become new plan items
//! - top-level plan items missing from the document become new headings
//!
//! and reorders the plan to follow the document. The function is pure: it
//! returns the new plan, outline and the edit batch, and the caller commits
//! them only once the document accepted the batch.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::document::{BuiltinStyle, EditBatch, FontOptions, Heading};
use crate::domain::{IdAllocator, IdsExhausted, Level, OutlineItem, PlanItem, SectionStatus, default_comment, normalize_title};

const PLACEHOLDER_FALLBACK: &str = "Write this section";

/// Everything a sync decided
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub plan: Vec<PlanItem>,
    pub toc: Vec<OutlineItem>,
    /// Ids of plan items created from document headings
    pub added_to_plan: Vec<u32>,
    /// Ids of plan items that get a heading appended to the document
    pub added_to_document: Vec<u32>,
    /// Paragraphs to append to the document, in plan order
    pub batch: EditBatch,
}

impl SyncOutcome {
    pub fn additions_to_plan(&self) -> usize {
        self.added_to_plan.len()
    }

    pub fn additions_to_document(&self) -> usize {
        self.added_to_document.len()
    }
}

/// Placeholder text written under a heading inserted for `item`
pub fn placeholder_text(item: &PlanItem) -> String {
    let text = default_comment(&item.title)
        .map(str::to_string)
        .or_else(|| Some(item.comments.trim().to_string()).filter(|c| !c.is_empty()))
        .unwrap_or_else(|| PLACEHOLDER_FALLBACK.to_string());
    format!("<{}>", text)
}

/// Reconcile the plan with the document's level 1/2 headings
///
/// Returns `None` when there are no usable headings; nothing is decided and
/// `ids` is untouched in that case. Fails when a new item cannot get an id.
pub fn synchronize(
    plan: &[PlanItem],
    toc: &[OutlineItem],
    headings: &[Heading],
    ids: &mut IdAllocator,
) -> Result<Option<SyncOutcome>, IdsExhausted> {
    debug!(plan = %plan.len(), headings = %headings.len(), "synchronize: called");

    let headings: Vec<&Heading> = headings
        .iter()
        .filter(|h| h.outline_level().is_some() && !h.text.trim().is_empty())
        .collect();
    if headings.is_empty() {
        info!("synchronize: document has no headings");
        return Ok(None);
    }

    let mut by_title: HashMap<String, usize> = HashMap::new();
    for (index, item) in plan.iter().enumerate() {
        by_title.entry(item.normalized_title()).or_insert(index);
    }

    // Matched plan items in document order, each paired with its heading position
    let mut placed: Vec<(PlanItem, Option<usize>)> = Vec::with_capacity(plan.len() + headings.len());
    let mut used = vec![false; plan.len()];
    let mut unmatched: Vec<&Heading> = Vec::new();
    let mut unmatched_titles: HashSet<String> = HashSet::new();

    for heading in &headings {
        let title = normalize_title(&heading.text);
        match by_title.get(&title) {
            Some(&index) if !used[index] => {
                used[index] = true;
                placed.push((plan[index].clone(), Some(heading.position)));
            }
            Some(_) => debug!(%title, "synchronize: repeated heading skipped"),
            None => {
                if unmatched_titles.insert(title) {
                    unmatched.push(heading);
                }
            }
        }
    }

    // Undocumented plan items keep their relative order at the end
    placed.extend(
        plan.iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(item, _)| (item.clone(), None)),
    );

    let mut toc = toc.to_vec();
    let mut added_to_plan = Vec::with_capacity(unmatched.len());

    for heading in unmatched {
        let level = heading.outline_level().unwrap_or_default();
        let title = heading.text.trim();
        let comments = default_comment(title).unwrap_or("");
        let item = PlanItem::new(ids.mint()?, title, level, comments).with_status(SectionStatus::Created);

        // Before the first item placed later in the document or not in it at all
        let at = placed
            .iter()
            .position(|(_, pos)| pos.is_none_or(|p| p > heading.position))
            .unwrap_or(placed.len());

        let outline = item.to_outline(false);
        let toc_at = match at.checked_sub(1).map(|prev| placed[prev].0.id) {
            Some(prev_id) => toc.iter().position(|o| o.id == prev_id).map(|i| i + 1).unwrap_or(toc.len()),
            None => 0,
        };
        toc.insert(toc_at, outline);

        debug!(id = %item.id, %title, %at, "synchronize: heading added to plan");
        added_to_plan.push(item.id);
        placed.insert(at, (item, Some(heading.position)));
    }

    let mut batch = EditBatch::new();
    let mut added_to_document = Vec::new();
    for (item, _) in placed.iter().filter(|(item, pos)| pos.is_none() && item.level == Level::Section) {
        batch
            .styled(item.title.clone(), BuiltinStyle::Heading1)
            .formatted(placeholder_text(item), FontOptions::italic())
            .blank();
        added_to_document.push(item.id);
    }

    info!(
        added_to_plan = %added_to_plan.len(),
        added_to_document = %added_to_document.len(),
        "synchronize: done"
    );

    Ok(Some(SyncOutcome {
        plan: placed.into_iter().map(|(item, _)| item).collect(),
        toc,
        added_to_plan,
        added_to_document,
        batch,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str, level: u8, position: usize) -> Heading {
        Heading {
            text: text.to_string(),
            level,
            position,
        }
    }

    fn item(id: u32, title: &str, level: Level) -> PlanItem {
        PlanItem::new(id, title, level, "")
    }

    fn outline_of(plan: &[PlanItem]) -> Vec<OutlineItem> {
        plan.iter().map(|i| i.to_outline(true)).collect()
    }

    fn titles(plan: &[PlanItem]) -> Vec<&str> {
        plan.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_no_headings_is_nothing_to_sync() {
        let plan = vec![item(1, "Intro", Level::Section)];
        let mut ids = IdAllocator::new(2);

        assert!(synchronize(&plan, &outline_of(&plan), &[], &mut ids).unwrap().is_none());
        assert!(synchronize(&plan, &[], &[heading("Detail", 3, 0)], &mut ids).unwrap().is_none());
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_matching_headings_reorder_plan() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Methods", Level::Section)];
        let headings = vec![heading("methods", 1, 0), heading("INTRO", 1, 4)];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        assert_eq!(titles(&outcome.plan), vec!["Methods", "Intro"]);
        assert_eq!(outcome.additions_to_plan(), 0);
        assert_eq!(outcome.additions_to_document(), 0);
        assert!(outcome.batch.is_empty());
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_sync_is_idempotent_when_titles_match() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Scope", Level::Subsection)];
        let headings = vec![heading("Intro", 1, 0), heading("Scope", 2, 2)];
        let mut ids = IdAllocator::new(3);

        let first = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();
        let second = synchronize(&first.plan, &first.toc, &headings, &mut ids).unwrap().unwrap();

        assert_eq!(second.additions_to_plan(), 0);
        assert_eq!(second.additions_to_document(), 0);
        assert_eq!(second.plan, first.plan);
    }

    #[test]
    fn test_undocumented_section_gets_heading_placeholder_and_blank() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Conclusion", Level::Section)];
        let headings = vec![heading("Intro", 1, 0)];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        assert_eq!(outcome.added_to_document, vec![2]);
        let inserts = outcome.batch.inserts();
        assert_eq!(inserts.len(), 3);
        assert_eq!(inserts[0].text, "Conclusion");
        assert_eq!(inserts[0].style, Some(BuiltinStyle::Heading1));
        assert!(inserts[1].text.starts_with('<') && inserts[1].text.ends_with('>'));
        assert_eq!(inserts[1].font.italic, Some(true));
        assert_eq!(inserts[2].text, "");
    }

    #[test]
    fn test_undocumented_subsection_is_left_alone() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Scope", Level::Subsection)];
        let headings = vec![heading("Intro", 1, 0)];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        assert_eq!(outcome.additions_to_document(), 0);
        assert_eq!(titles(&outcome.plan), vec!["Intro", "Scope"]);
    }

    #[test]
    fn test_unknown_heading_becomes_created_item() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Results", Level::Section)];
        let toc = outline_of(&plan);
        let headings = vec![
            heading("Intro", 1, 0),
            heading("Background", 2, 3),
            heading("Results", 1, 6),
            heading("background", 2, 9),
        ];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &toc, &headings, &mut ids).unwrap().unwrap();

        assert_eq!(titles(&outcome.plan), vec!["Intro", "Background", "Results"]);
        let added = &outcome.plan[1];
        assert_eq!(added.id, 3);
        assert_eq!(added.status, SectionStatus::Created);
        assert_eq!(added.level, Level::Subsection);
        assert_eq!(added.comments, default_comment("Background").unwrap());
        assert_eq!(outcome.added_to_plan, vec![3]);
        assert_eq!(ids.next_id(), 4);

        let toc_titles: Vec<&str> = outcome.toc.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(toc_titles, vec!["Intro", "Background", "Results"]);
        assert!(!outcome.toc[1].is_default);
    }

    #[test]
    fn test_unknown_heading_without_default_comment() {
        let plan = vec![item(1, "Intro", Level::Section)];
        let headings = vec![heading("Budget", 1, 0), heading("Intro", 1, 2)];
        let mut ids = IdAllocator::new(2);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        assert_eq!(titles(&outcome.plan), vec!["Budget", "Intro"]);
        assert_eq!(outcome.plan[0].comments, "");
        assert_eq!(outcome.toc[0].title, "Budget");
    }

    #[test]
    fn test_new_heading_placed_before_undocumented_tail() {
        let plan = vec![item(1, "Intro", Level::Section), item(2, "Later", Level::Subsection)];
        let headings = vec![heading("Intro", 1, 0), heading("Extra", 1, 5)];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        assert_eq!(titles(&outcome.plan), vec!["Intro", "Extra", "Later"]);
    }

    #[test]
    fn test_interleaved_new_headings_are_all_added() {
        let plan = vec![item(1, "A", Level::Section), item(2, "C", Level::Section)];
        let headings = vec![
            heading("X", 1, 0),
            heading("A", 1, 1),
            heading("Y", 2, 2),
            heading("C", 1, 3),
            heading("Z", 1, 4),
        ];
        let mut ids = IdAllocator::new(3);

        let outcome = synchronize(&plan, &outline_of(&plan), &headings, &mut ids).unwrap().unwrap();

        // Positions are best effort; every heading lands in the plan exactly once
        assert_eq!(outcome.plan.len(), 5);
        assert_eq!(outcome.additions_to_plan(), 3);
        let ids_seen: HashSet<u32> = outcome.plan.iter().map(|i| i.id).collect();
        assert_eq!(ids_seen.len(), 5);
        assert_eq!(outcome.toc.len(), 5);
    }

    #[test]
    fn test_placeholder_text() {
        let intro = item(1, "Introduction", Level::Section);
        assert_eq!(
            placeholder_text(&intro),
            format!("<{}>", default_comment("Introduction").unwrap())
        );

        let custom = PlanItem::new(2, "Budget", Level::Section, " costs by quarter ");
        assert_eq!(placeholder_text(&custom), "<costs by quarter>");

        let bare = item(3, "Budget", Level::Section);
        assert_eq!(placeholder_text(&bare), "<Write this section>");
    }

    #[test]
    fn test_new_heading_without_ids_left_fails() {
        let plan = vec![item(1, "Intro", Level::Section)];
        let headings = vec![heading("Intro", 1, 0), heading("Appendix", 1, 5)];
        let mut ids = IdAllocator::new(crate::domain::MAX_ITEM_ID);
        ids.mint().unwrap();

        let result = synchronize(&plan, &outline_of(&plan), &headings, &mut ids);

        assert!(result.is_err());
    }
}
