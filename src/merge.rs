//! Merging generated sections into the plan
//!
//! `Replace` throws the current plan away. `Update` matches proposed
//! sections to existing ones by normalized title, keeps the existing id,
//! status and statistics, and never drops an existing section.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{IdAllocator, IdsExhausted, OutlineItem, PlanItem, ProposedItem};

/// How generated sections combine with the current plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Discard the current plan
    #[default]
    Replace,
    /// Modify matching sections and add new ones
    Update,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::Replace => write!(f, "replace"),
            MergeMode::Update => write!(f, "update"),
        }
    }
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub plan: Vec<PlanItem>,
    /// Ids minted for new sections, in plan order
    pub minted: Vec<u32>,
    /// Existing sections that matched a proposal
    pub matched: usize,
}

fn fresh_item(proposed: &ProposedItem, ids: &mut IdAllocator) -> Result<PlanItem, IdsExhausted> {
    Ok(PlanItem::new(ids.mint()?, proposed.title.trim(), proposed.level(), proposed.comments()).with_default(true))
}

/// Merge `proposed` into `existing` under `mode`, minting ids from `ids`
pub fn merge(
    existing: &[PlanItem],
    proposed: &[ProposedItem],
    mode: MergeMode,
    ids: &mut IdAllocator,
) -> Result<MergeOutcome, IdsExhausted> {
    debug!(existing = %existing.len(), proposed = %proposed.len(), %mode, "merge: called");

    let mut seen: HashSet<String> = HashSet::new();
    let proposed: Vec<&ProposedItem> = proposed
        .iter()
        .filter(|p| !p.title.trim().is_empty())
        .filter(|p| seen.insert(p.normalized_title()))
        .collect();

    let outcome = match mode {
        MergeMode::Replace => {
            let plan = proposed
                .iter()
                .map(|p| fresh_item(p, ids))
                .collect::<Result<Vec<PlanItem>, _>>()?;
            let minted = plan.iter().map(|item| item.id).collect();
            MergeOutcome {
                plan,
                minted,
                matched: 0,
            }
        }
        MergeMode::Update => merge_update(existing, &proposed, ids)?,
    };

    info!(
        sections = %outcome.plan.len(),
        minted = %outcome.minted.len(),
        matched = %outcome.matched,
        "merge: done"
    );
    Ok(outcome)
}

fn merge_update(
    existing: &[PlanItem],
    proposed: &[&ProposedItem],
    ids: &mut IdAllocator,
) -> Result<MergeOutcome, IdsExhausted> {
    // First item with a given title is the match target; later duplicates ride along untouched
    let mut by_title: HashMap<String, usize> = HashMap::new();
    for (index, item) in existing.iter().enumerate() {
        by_title.entry(item.normalized_title()).or_insert(index);
    }

    let mut plan = Vec::with_capacity(existing.len() + proposed.len());
    let mut used = vec![false; existing.len()];
    let mut minted = Vec::new();
    let mut matched = 0;

    for p in proposed {
        match by_title.get(&p.normalized_title()) {
            Some(&index) => {
                let mut item = existing[index].clone();
                if !p.comments().is_empty() {
                    item.comments = p.comments().to_string();
                }
                used[index] = true;
                matched += 1;
                plan.push(item);
            }
            None => {
                let item = fresh_item(p, ids)?;
                minted.push(item.id);
                plan.push(item);
            }
        }
    }

    plan.extend(
        existing
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(item, _)| item.clone()),
    );

    Ok(MergeOutcome { plan, minted, matched })
}

/// Outline that accompanies a merged plan
///
/// After a replace the outline is the plan's projection, all default. After
/// an update the existing outline is kept and every plan item without an
/// outline entry is appended as a default entry.
pub fn merged_outline(toc: &[OutlineItem], plan: &[PlanItem], mode: MergeMode) -> Vec<OutlineItem> {
    match mode {
        MergeMode::Replace => plan.iter().map(|item| item.to_outline(true)).collect(),
        MergeMode::Update => {
            let known: HashSet<u32> = toc.iter().map(|o| o.id).collect();
            let mut outline = toc.to_vec();
            outline.extend(
                plan.iter()
                    .filter(|item| !known.contains(&item.id))
                    .map(|item| item.to_outline(true)),
            );
            outline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Level, SectionStats, SectionStatus};
    use proptest::prelude::*;

    fn existing_plan() -> Vec<PlanItem> {
        let mut intro = PlanItem::new(1, "Introduction", Level::Section, "old intro").with_status(SectionStatus::Drafted);
        intro.set_stats(SectionStats {
            words: 120,
            paragraphs: 3,
            tables: 1,
            graphics: 0,
        });
        let methods = PlanItem::new(2, "Methods", Level::Section, "old methods").with_status(SectionStatus::Checked);
        vec![intro, methods]
    }

    #[test]
    fn test_replace_single_item() {
        let mut ids = IdAllocator::default();
        let proposed = vec![ProposedItem::new("Intro").with_level(1).with_comments("x")];

        let outcome = merge(&[], &proposed, MergeMode::Replace, &mut ids).unwrap();

        assert_eq!(outcome.plan.len(), 1);
        let item = &outcome.plan[0];
        assert_eq!(item.id, 1);
        assert_eq!(item.level, Level::Section);
        assert_eq!(item.comments, "x");
        assert_eq!(item.status, SectionStatus::Empty);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_replace_discards_existing_and_defaults_fields() {
        let mut ids = IdAllocator::new(3);
        let proposed = vec![ProposedItem::new("Introduction"), ProposedItem::new("Scope").with_level(2)];

        let outcome = merge(&existing_plan(), &proposed, MergeMode::Replace, &mut ids).unwrap();

        assert_eq!(outcome.plan.len(), 2);
        assert_eq!(outcome.plan[0].id, 3);
        assert_eq!(outcome.plan[0].status, SectionStatus::Empty);
        assert_eq!(outcome.plan[0].words, 0);
        assert_eq!(outcome.plan[0].comments, "");
        assert_eq!(outcome.plan[1].level, Level::Subsection);
        assert_eq!(outcome.minted, vec![3, 4]);
        assert_eq!(ids.next_id(), 5);
    }

    #[test]
    fn test_replace_deduplicates_titles() {
        let mut ids = IdAllocator::default();
        let proposed = vec![
            ProposedItem::new("Results").with_comments("first"),
            ProposedItem::new("  RESULTS ").with_comments("second"),
        ];

        let outcome = merge(&[], &proposed, MergeMode::Replace, &mut ids).unwrap();

        assert_eq!(outcome.plan.len(), 1);
        assert_eq!(outcome.plan[0].comments, "first");
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_update_preserves_matched_items() {
        let mut ids = IdAllocator::new(3);
        let proposed = vec![
            ProposedItem::new("introduction").with_comments("new intro"),
            ProposedItem::new("Discussion").with_comments("discuss"),
            ProposedItem::new("METHODS"),
        ];

        let outcome = merge(&existing_plan(), &proposed, MergeMode::Update, &mut ids).unwrap();

        assert_eq!(outcome.plan.len(), 3);
        let intro = &outcome.plan[0];
        assert_eq!(intro.id, 1);
        assert_eq!(intro.title, "Introduction");
        assert_eq!(intro.status, SectionStatus::Drafted);
        assert_eq!(intro.words, 120);
        assert_eq!(intro.comments, "new intro");

        assert_eq!(outcome.plan[1].id, 3);
        assert_eq!(outcome.plan[1].title, "Discussion");

        // Empty proposed comments keep the existing ones
        assert_eq!(outcome.plan[2].comments, "old methods");
        assert_eq!(outcome.minted, vec![3]);
        assert_eq!(outcome.matched, 2);
        assert_eq!(ids.next_id(), 4);
    }

    #[test]
    fn test_update_retains_unmentioned_items_in_order() {
        let mut ids = IdAllocator::new(3);
        let proposed = vec![ProposedItem::new("Conclusion")];

        let outcome = merge(&existing_plan(), &proposed, MergeMode::Update, &mut ids).unwrap();

        let titles: Vec<&str> = outcome.plan.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Conclusion", "Introduction", "Methods"]);
    }

    #[test]
    fn test_update_keeps_existing_duplicates() {
        let mut ids = IdAllocator::new(3);
        let mut existing = existing_plan();
        existing.push(PlanItem::new(9, "methods", Level::Subsection, "dup"));

        let outcome = merge(&existing, &[ProposedItem::new("Methods").with_comments("c")], MergeMode::Update, &mut ids).unwrap();

        assert_eq!(outcome.plan.len(), 3);
        assert_eq!(outcome.plan[0].id, 2);
        assert_eq!(outcome.plan[0].comments, "c");
        assert!(outcome.plan.iter().any(|i| i.id == 9 && i.comments == "dup"));
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_merged_outline_replace_projects_plan() {
        let plan = vec![PlanItem::new(4, "Intro", Level::Section, "")];
        let toc = vec![OutlineItem::new(1, "Old", Level::Section, false)];

        let outline = merged_outline(&toc, &plan, MergeMode::Replace);
        assert_eq!(outline, vec![OutlineItem::new(4, "Intro", Level::Section, true)]);
    }

    #[test]
    fn test_merged_outline_update_appends_missing() {
        let plan = vec![
            PlanItem::new(1, "Intro", Level::Section, ""),
            PlanItem::new(5, "New", Level::Subsection, ""),
        ];
        let toc = vec![
            OutlineItem::new(1, "Intro", Level::Section, false),
            OutlineItem::new(2, "Spare", Level::Section, true),
        ];

        let outline = merged_outline(&toc, &plan, MergeMode::Update);
        assert_eq!(outline.len(), 3);
        assert_eq!(outline[1].title, "Spare");
        assert_eq!(outline[2], OutlineItem::new(5, "New", Level::Subsection, true));
    }

    #[test]
    fn test_merge_fails_when_ids_run_out() {
        let mut ids = IdAllocator::new(crate::domain::MAX_ITEM_ID);
        let proposed = vec![ProposedItem::new("One"), ProposedItem::new("Two")];

        let result = merge(&existing_plan(), &proposed, MergeMode::Update, &mut ids);

        assert!(result.is_err());
    }

    fn arb_titles() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[A-Za-z]{1,8}( [A-Za-z]{1,8})?", 1..12)
    }

    proptest! {
        #[test]
        fn prop_replace_mints_fresh_ids(titles in arb_titles(), start in 1u32..1000) {
            let mut unique = HashSet::new();
            let titles: Vec<String> = titles.into_iter().filter(|t| unique.insert(t.to_lowercase())).collect();
            let proposed: Vec<ProposedItem> = titles.iter().map(ProposedItem::new).collect();
            let mut ids = IdAllocator::new(start);

            let outcome = merge(&existing_plan(), &proposed, MergeMode::Replace, &mut ids).unwrap();

            prop_assert_eq!(outcome.plan.len(), proposed.len());
            let distinct: HashSet<u32> = outcome.plan.iter().map(|i| i.id).collect();
            prop_assert_eq!(distinct.len(), outcome.plan.len());
            for item in &outcome.plan {
                prop_assert!(item.id >= start);
                prop_assert_eq!(item.status, SectionStatus::Empty);
                prop_assert_eq!(item.stats(), SectionStats::default());
            }
            prop_assert_eq!(ids.next_id(), start + proposed.len() as u32);
        }

        #[test]
        fn prop_update_preserves_intersection(titles in arb_titles()) {
            let existing = existing_plan();
            let mut proposed: Vec<ProposedItem> = titles.iter().map(ProposedItem::new).collect();
            proposed.push(ProposedItem::new("INTRODUCTION"));
            let mut ids = IdAllocator::new(3);
            let before = ids.next_id();

            let outcome = merge(&existing, &proposed, MergeMode::Update, &mut ids).unwrap();

            prop_assert!(outcome.plan.len() >= existing.len());
            for old in &existing {
                let kept = outcome.plan.iter().find(|i| i.id == old.id);
                prop_assert!(kept.is_some());
                let kept = kept.unwrap();
                prop_assert_eq!(kept.status, old.status);
                prop_assert_eq!(kept.stats(), old.stats());
            }
            prop_assert_eq!(ids.next_id() - before, outcome.minted.len() as u32);
        }
    }
}
