//! Outline and plan item types
//!
//! `OutlineItem` is the reusable template entry; `PlanItem` is the live,
//! per-document section record. Both share one id space.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Normalize a section title for comparison (trimmed, lowercase)
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Outline depth of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    /// Top-level section (Title / Heading 1)
    #[default]
    Section = 1,
    /// Subsection (Heading 2)
    Subsection = 2,
}

impl Level {
    /// Numeric level as shown to users and written to files
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Lenient conversion used for AI proposals: anything deeper than 1 is a subsection
    pub fn clamped(value: u8) -> Self {
        if value >= 2 { Self::Subsection } else { Self::Section }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Section),
            2 => Ok(Self::Subsection),
            other => Err(format!("invalid level {}: expected 1 or 2", other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.as_u8()
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Authoring status of a section, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    #[default]
    Empty,
    Created,
    Drafted,
    Checked,
    Referenced,
    Edited,
    Verified,
    Finalized,
}

impl SectionStatus {
    /// Every status in workflow order
    pub const ALL: [SectionStatus; 8] = [
        Self::Empty,
        Self::Created,
        Self::Drafted,
        Self::Checked,
        Self::Referenced,
        Self::Edited,
        Self::Verified,
        Self::Finalized,
    ];

    /// Position in the workflow (0 for `Empty`)
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Progress percentage, evenly spaced from 0 (`Empty`) to 100 (`Finalized`)
    pub fn progress(self) -> f64 {
        let last = (Self::ALL.len() - 1) as f64;
        (self.ordinal() as f64 * 100.0 / last).round()
    }
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Created => "created",
            Self::Drafted => "drafted",
            Self::Checked => "checked",
            Self::Referenced => "referenced",
            Self::Edited => "edited",
            Self::Verified => "verified",
            Self::Finalized => "finalized",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for SectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.to_string() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown status: {}. Use one of: empty, created, drafted, checked, referenced, edited, verified, finalized",
                    s
                )
            })
    }
}

/// Reusable section definition in the outline template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineItem {
    pub id: u32,
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub is_default: bool,
}

impl OutlineItem {
    pub fn new(id: u32, title: impl Into<String>, level: Level, is_default: bool) -> Self {
        Self {
            id,
            title: title.into(),
            level,
            is_default,
        }
    }

    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Content statistics measured for one section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionStats {
    pub words: u32,
    pub paragraphs: u32,
    pub tables: u32,
    pub graphics: u32,
}

/// Live record of one section of the document being planned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub id: u32,
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub status: SectionStatus,
    /// Free-text notes; doubles as the generation prompt for the section
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub words: u32,
    #[serde(default)]
    pub paragraphs: u32,
    #[serde(default)]
    pub tables: u32,
    #[serde(default)]
    pub graphics: u32,
    #[serde(default)]
    pub is_default: bool,
}

impl PlanItem {
    /// Create a fresh item: status `Empty`, all statistics zero
    pub fn new(id: u32, title: impl Into<String>, level: Level, comments: impl Into<String>) -> Self {
        let title = title.into();
        debug!(%id, %title, "PlanItem::new: called");
        Self {
            id,
            title,
            level,
            status: SectionStatus::Empty,
            comments: comments.into(),
            words: 0,
            paragraphs: 0,
            tables: 0,
            graphics: 0,
            is_default: false,
        }
    }

    pub fn with_status(mut self, status: SectionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }

    pub fn stats(&self) -> SectionStats {
        SectionStats {
            words: self.words,
            paragraphs: self.paragraphs,
            tables: self.tables,
            graphics: self.graphics,
        }
    }

    /// Overwrite the cached statistics
    pub fn set_stats(&mut self, stats: SectionStats) {
        self.words = stats.words;
        self.paragraphs = stats.paragraphs;
        self.tables = stats.tables;
        self.graphics = stats.graphics;
    }

    /// Template projection of this item
    pub fn to_outline(&self, is_default: bool) -> OutlineItem {
        OutlineItem::new(self.id, self.title.clone(), self.level, is_default)
    }

    /// Number of whitespace-separated words in the comments
    pub fn comment_word_count(&self) -> usize {
        self.comments.split_whitespace().count()
    }
}

/// A section proposed by the plan generator, before it has an id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProposedItem {
    pub title: String,
    #[serde(default, deserialize_with = "lenient_level")]
    pub level: Option<u8>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<String>,
}

/// Models send levels as `1`, `1.0` or `"2"`; anything unreadable means no level
fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().map(|v| v as f64).or_else(|| n.as_f64()),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.min(u8::MAX as f64) as u8))
}

/// Comments that are not a string are dropped rather than failing the item
fn lenient_comments<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl ProposedItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level: None,
            comments: None,
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    /// Level, defaulting to a top-level section when absent
    pub fn level(&self) -> Level {
        self.level.map(Level::clamped).unwrap_or_default()
    }

    /// Comments, trimmed; empty when absent
    pub fn comments(&self) -> &str {
        self.comments.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Introduction "), "introduction");
        assert_eq!(normalize_title("Key FINDINGS"), "key findings");
    }

    #[test]
    fn test_level_serde_as_integer() {
        let json = serde_json::to_string(&Level::Subsection).unwrap();
        assert_eq!(json, "2");
        let level: Level = serde_json::from_str("1").unwrap();
        assert_eq!(level, Level::Section);
        assert!(serde_json::from_str::<Level>("3").is_err());
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(Level::clamped(0), Level::Section);
        assert_eq!(Level::clamped(1), Level::Section);
        assert_eq!(Level::clamped(2), Level::Subsection);
        assert_eq!(Level::clamped(5), Level::Subsection);
    }

    #[test]
    fn test_status_order_and_progress() {
        assert!(SectionStatus::Empty < SectionStatus::Created);
        assert!(SectionStatus::Verified < SectionStatus::Finalized);
        assert_eq!(SectionStatus::Empty.progress(), 0.0);
        assert_eq!(SectionStatus::Finalized.progress(), 100.0);
        assert_eq!(SectionStatus::Created.progress(), 14.0);
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in SectionStatus::ALL {
            let parsed: SectionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!("Drafted".parse::<SectionStatus>().unwrap(), SectionStatus::Drafted);
        assert!("done".parse::<SectionStatus>().is_err());
    }

    #[test]
    fn test_plan_item_new_defaults() {
        let item = PlanItem::new(7, "Intro", Level::Section, "x");
        assert_eq!(item.status, SectionStatus::Empty);
        assert_eq!(item.stats(), SectionStats::default());
        assert!(!item.is_default);
    }

    #[test]
    fn test_plan_item_deserializes_with_missing_optional_fields() {
        let json = r#"{"id": 3, "title": "Methods", "level": 2}"#;
        let item: PlanItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(item.level, Level::Subsection);
        assert_eq!(item.status, SectionStatus::Empty);
        assert_eq!(item.comments, "");
    }

    #[test]
    fn test_plan_item_serializes_camel_case() {
        let item = PlanItem::new(1, "Intro", Level::Section, "").with_default(true);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["isDefault"], true);
        assert_eq!(value["status"], "empty");
        assert_eq!(value["level"], 1);
    }

    #[test]
    fn test_proposed_item_defaults() {
        let item: ProposedItem = serde_json::from_str(r#"{"title": "Scope"}"#).unwrap();
        assert_eq!(item.level(), Level::Section);
        assert_eq!(item.comments(), "");
    }

    #[test]
    fn test_proposed_item_reads_loosely_typed_fields() {
        let item: ProposedItem = serde_json::from_str(r#"{"title": "Scope", "level": "2"}"#).unwrap();
        assert_eq!(item.level(), Level::Subsection);

        let item: ProposedItem = serde_json::from_str(r#"{"title": "Scope", "level": 1.0}"#).unwrap();
        assert_eq!(item.level(), Level::Section);

        let item: ProposedItem =
            serde_json::from_str(r#"{"title": "Scope", "level": "second", "comments": ["a", "b"]}"#).unwrap();
        assert_eq!(item.level, None);
        assert_eq!(item.level(), Level::Section);
        assert_eq!(item.comments(), "");

        let item: ProposedItem = serde_json::from_str(r#"{"title": "Scope", "level": 900}"#).unwrap();
        assert_eq!(item.level(), Level::Subsection);
    }

    #[test]
    fn test_comment_word_count() {
        let item = PlanItem::new(1, "Intro", Level::Section, "  explain the  problem space ");
        assert_eq!(item.comment_word_count(), 4);
    }
}
