//! Host document interface
//!
//! The planner never touches a word processor directly. It reads a
//! [`DocumentSnapshot`] of the body, appends paragraphs through an
//! [`EditBatch`] applied inside one exclusive editing context, and keeps its
//! persisted copy in a named custom property of the document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;

pub use memory::{DocumentCall, MemoryDocument};

use crate::domain::Level;

/// Errors raised by a document host
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Document host unavailable: {0}")]
    Unavailable(String),

    #[error("Document operation failed: {0}")]
    Operation(String),
}

/// Built-in paragraph styles the planner applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinStyle {
    Title,
    Heading1,
    Heading2,
    Normal,
}

impl BuiltinStyle {
    /// Display name of the style as the host reports it on read-back
    pub fn style_name(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Heading1 => "Heading 1",
            Self::Heading2 => "Heading 2",
            Self::Normal => "Normal",
        }
    }

    /// Heading style for an outline level
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Section => Self::Heading1,
            Level::Subsection => Self::Heading2,
        }
    }
}

/// Character formatting for an inserted paragraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl FontOptions {
    pub fn italic() -> Self {
        Self {
            italic: Some(true),
            ..Default::default()
        }
    }

    pub fn bold(size: f32) -> Self {
        Self {
            bold: Some(true),
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// Where an inserted paragraph goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertLocation {
    Start,
    #[default]
    End,
}

/// One paragraph to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphInsert {
    pub text: String,
    pub location: InsertLocation,
    pub style: Option<BuiltinStyle>,
    pub font: FontOptions,
}

/// Ordered paragraph inserts applied in one exclusive editing context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditBatch {
    inserts: Vec<ParagraphInsert>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a paragraph with a built-in style
    pub fn styled(&mut self, text: impl Into<String>, style: BuiltinStyle) -> &mut Self {
        self.inserts.push(ParagraphInsert {
            text: text.into(),
            location: InsertLocation::End,
            style: Some(style),
            font: FontOptions::default(),
        });
        self
    }

    /// Append a paragraph with explicit font settings
    pub fn formatted(&mut self, text: impl Into<String>, font: FontOptions) -> &mut Self {
        self.inserts.push(ParagraphInsert {
            text: text.into(),
            location: InsertLocation::End,
            style: None,
            font,
        });
        self
    }

    /// Append plain text
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.formatted(text, FontOptions::default())
    }

    /// Append an empty paragraph
    pub fn blank(&mut self) -> &mut Self {
        self.text("")
    }

    pub fn inserts(&self) -> &[ParagraphInsert] {
        &self.inserts
    }

    pub fn len(&self) -> usize {
        self.inserts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
    }

    pub fn into_inserts(self) -> Vec<ParagraphInsert> {
        self.inserts
    }
}

/// A paragraph as read back from the document body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default, skip_serializing_if = "FontOptions::is_plain")]
    pub font: FontOptions,
}

fn default_style() -> String {
    BuiltinStyle::Normal.style_name().to_string()
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
            font: FontOptions::default(),
        }
    }

    /// Body text in the normal style
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, default_style())
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::new(text, BuiltinStyle::Title.style_name())
    }

    pub fn heading(text: impl Into<String>, level: Level) -> Self {
        Self::new(text, BuiltinStyle::for_level(level).style_name())
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Heading level implied by the style, if this paragraph is a heading
    pub fn heading_level(&self) -> Option<u8> {
        heading_level(&self.style)
    }
}

/// Classify a paragraph style: 1 for Title/Heading 1, 2 for Heading 2,
/// 3 for any other heading style, `None` for body styles
pub fn heading_level(style: &str) -> Option<u8> {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase();

    match compact.as_str() {
        "title" | "heading1" => Some(1),
        "heading2" => Some(2),
        other if other.starts_with("heading") => Some(3),
        _ => None,
    }
}

/// A table or picture in the document body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedObject {
    /// Index of the paragraph that owns the object, when the host reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
}

impl EmbeddedObject {
    pub fn anchored(paragraph_index: usize) -> Self {
        Self {
            paragraph_index: Some(paragraph_index),
        }
    }

    pub fn unanchored() -> Self {
        Self::default()
    }
}

/// A heading found in the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    /// 1 (Title / Heading 1), 2 (Heading 2) or 3 (any other heading)
    pub level: u8,
    /// Paragraph index of the heading
    pub position: usize,
}

impl Heading {
    /// Outline level for headings the plan can match (levels 1 and 2)
    pub fn outline_level(&self) -> Option<Level> {
        Level::try_from(self.level).ok()
    }
}

/// Read-only view of the document body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub tables: Vec<EmbeddedObject>,
    #[serde(default)]
    pub pictures: Vec<EmbeddedObject>,
}

impl DocumentSnapshot {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            paragraphs,
            ..Default::default()
        }
    }

    /// Every heading in document order, including unclassified level-3 headings
    pub fn headings(&self) -> Vec<Heading> {
        self.paragraphs
            .iter()
            .enumerate()
            .filter_map(|(position, paragraph)| {
                paragraph.heading_level().map(|level| Heading {
                    text: paragraph.text.trim().to_string(),
                    level,
                    position,
                })
            })
            .collect()
    }

    /// Headings the plan can be synchronized against (levels 1 and 2, non-empty)
    pub fn outline_headings(&self) -> Vec<Heading> {
        self.headings()
            .into_iter()
            .filter(|h| h.outline_level().is_some() && !h.text.is_empty())
            .collect()
    }
}

/// Access to the host document
///
/// Every call may fail with [`AdapterError`]; callers treat that as a soft
/// failure and degrade rather than crash.
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    /// Read paragraphs, tables and pictures of the document body
    async fn body(&self) -> Result<DocumentSnapshot, AdapterError>;

    /// Apply `batch` inside one exclusive editing context, flushed before returning
    async fn run_exclusive(&self, batch: EditBatch) -> Result<(), AdapterError>;

    /// Read a custom document property
    async fn custom_property(&self, key: &str) -> Result<Option<String>, AdapterError>;

    /// Add a custom document property
    async fn add_property(&self, key: &str, value: &str) -> Result<(), AdapterError>;

    /// Delete a custom document property; deleting a missing key is not an error
    async fn delete_property(&self, key: &str) -> Result<(), AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_styles() {
        assert_eq!(heading_level("Title"), Some(1));
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("Heading1"), Some(1));
        assert_eq!(heading_level("heading 2"), Some(2));
        assert_eq!(heading_level("Heading 3"), Some(3));
        assert_eq!(heading_level("Normal"), None);
        assert_eq!(heading_level("List Paragraph"), None);
    }

    #[test]
    fn test_snapshot_headings() {
        let snapshot = DocumentSnapshot::new(vec![
            Paragraph::title("Report"),
            Paragraph::text("intro text"),
            Paragraph::heading("Methods", Level::Subsection),
            Paragraph::new("Detail", "Heading 3"),
            Paragraph::heading("   ", Level::Section),
        ]);

        let headings = snapshot.headings();
        assert_eq!(headings.len(), 4);
        assert_eq!(headings[0].position, 0);
        assert_eq!(headings[1].level, 2);
        assert_eq!(headings[2].level, 3);

        let outline = snapshot.outline_headings();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[1].text, "Methods");
    }

    #[test]
    fn test_edit_batch_order() {
        let mut batch = EditBatch::new();
        batch
            .styled("Intro", BuiltinStyle::Heading1)
            .formatted("<notes>", FontOptions::italic())
            .blank();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.inserts()[0].style, Some(BuiltinStyle::Heading1));
        assert_eq!(batch.inserts()[1].font.italic, Some(true));
        assert_eq!(batch.inserts()[2].text, "");
    }

    #[test]
    fn test_paragraph_deserializes_default_style() {
        let p: Paragraph = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(p.style, "Normal");
        assert!(p.heading_level().is_none());
    }
}
