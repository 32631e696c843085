//! Built-in outline template and title-keyed default comments

use super::item::{Level, OutlineItem, PlanItem, normalize_title};
use super::id::IdAllocator;

/// One entry of the built-in template
#[derive(Debug, Clone, Copy)]
pub struct TemplateEntry {
    pub title: &'static str,
    pub level: Level,
    pub comment: &'static str,
}

const fn section(title: &'static str, comment: &'static str) -> TemplateEntry {
    TemplateEntry {
        title,
        level: Level::Section,
        comment,
    }
}

const fn subsection(title: &'static str, comment: &'static str) -> TemplateEntry {
    TemplateEntry {
        title,
        level: Level::Subsection,
        comment,
    }
}

/// The default document structure offered by `create_template`
pub const DEFAULT_TEMPLATE: &[TemplateEntry] = &[
    section("Title Page", "Document title, author, affiliation and date"),
    section("Abstract", "Summarize purpose, method, main findings and conclusion in one paragraph"),
    section("Table of Contents", "Generated from the document headings"),
    section("Introduction", "Introduce the topic and explain why it matters"),
    subsection("Background", "Context the reader needs before the main argument"),
    subsection("Problem Statement", "State the specific problem this document addresses"),
    subsection("Objectives", "List what this document sets out to achieve"),
    subsection("Scope", "Define what is covered and what is deliberately left out"),
    section("Literature Review", "Survey the existing work relevant to the topic"),
    subsection("Prior Work", "Summarize the most important earlier contributions"),
    subsection("Research Gap", "Explain what the existing work does not yet answer"),
    section("Methodology", "Describe how the work was carried out"),
    subsection("Research Design", "Outline the overall approach and why it fits the problem"),
    subsection("Data Collection", "Explain where the data comes from and how it was gathered"),
    subsection("Data Analysis", "Describe the techniques used to analyse the data"),
    subsection("Method Limitations", "Note the constraints of the chosen method"),
    section("Results", "Present the outcomes without interpretation"),
    subsection("Key Findings", "Highlight the most important results"),
    subsection("Supporting Data", "Tables and figures that back up the findings"),
    section("Discussion", "Interpret the results and relate them to the objectives"),
    subsection("Interpretation", "Explain what the results mean"),
    subsection("Implications", "Describe the consequences for practice or further research"),
    subsection("Limitations", "Acknowledge weaknesses that affect the conclusions"),
    section("Recommendations", "Concrete actions that follow from the findings"),
    section("Conclusion", "Close the argument and restate the main contribution"),
    subsection("Summary of Findings", "Recap the key results in a few sentences"),
    subsection("Future Work", "Suggest directions for follow-up work"),
    section("Acknowledgements", "Thank the people and organisations that helped"),
    section("References", "List every source cited in the document"),
    section("Appendices", "Supplementary material too detailed for the main text"),
    section("Glossary", "Define specialist terms and abbreviations"),
];

/// Default comment for a section title, matched case-insensitively
pub fn default_comment(title: &str) -> Option<&'static str> {
    let wanted = normalize_title(title);
    DEFAULT_TEMPLATE
        .iter()
        .find(|entry| normalize_title(entry.title) == wanted)
        .map(|entry| entry.comment)
}

/// Seed both projections from the built-in template
///
/// Entries take ids 1..=N; the returned allocator continues at N + 1.
pub fn seed_template() -> (Vec<OutlineItem>, Vec<PlanItem>, IdAllocator) {
    let (toc, plan): (Vec<OutlineItem>, Vec<PlanItem>) = DEFAULT_TEMPLATE
        .iter()
        .zip(1u32..)
        .map(|(entry, id)| {
            let outline = OutlineItem::new(id, entry.title, entry.level, true);
            let plan = PlanItem::new(id, entry.title, entry.level, entry.comment).with_default(true);
            (outline, plan)
        })
        .unzip();
    let ids = IdAllocator::from_ids(toc.iter().map(|o| o.id));
    (toc, plan, ids)
}
