//! In-memory document host, optionally mirrored to a JSON file
//!
//! Used by the `dp` binary (file-backed) and by tests (purely in memory).
//! Every call is recorded so tests can assert exactly what the planner asked
//! the host to do.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    AdapterError, DocumentAdapter, DocumentSnapshot, EditBatch, EmbeddedObject, InsertLocation, Paragraph,
    ParagraphInsert,
};

/// A call made against the document host
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCall {
    Body,
    InsertParagraph(ParagraphInsert),
    GetProperty(String),
    AddProperty(String),
    DeleteProperty(String),
}

/// Serializable document contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DocumentState {
    #[serde(default)]
    paragraphs: Vec<Paragraph>,
    #[serde(default)]
    tables: Vec<EmbeddedObject>,
    #[serde(default)]
    pictures: Vec<EmbeddedObject>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

/// Document host kept in memory
pub struct MemoryDocument {
    state: Mutex<DocumentState>,
    calls: Mutex<Vec<DocumentCall>>,
    available: AtomicBool,
    editable: AtomicBool,
    path: Option<PathBuf>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Empty document
    pub fn new() -> Self {
        Self::from_state(DocumentState::default(), None)
    }

    /// Document with the given body paragraphs
    pub fn with_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self::from_snapshot(DocumentSnapshot::new(paragraphs))
    }

    /// Document with the given body
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        let state = DocumentState {
            paragraphs: snapshot.paragraphs,
            tables: snapshot.tables,
            pictures: snapshot.pictures,
            properties: BTreeMap::new(),
        };
        Self::from_state(state, None)
    }

    /// Open a JSON-file document, creating an empty one if the file does not exist
    ///
    /// Every mutation is written back to the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "MemoryDocument::open: called");
        let state = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| AdapterError::Unavailable(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str(&content)
                .map_err(|e| AdapterError::Unavailable(format!("{}: {}", path.display(), e)))?
        } else {
            debug!("MemoryDocument::open: file missing, starting empty");
            DocumentState::default()
        };
        Ok(Self::from_state(state, Some(path)))
    }

    fn from_state(state: DocumentState, path: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(state),
            calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            editable: AtomicBool::new(true),
            path,
        }
    }

    /// Simulate the host going away (every call fails with `Unavailable`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate the host dropping out between a read and an edit batch
    pub fn set_editable(&self, editable: bool) {
        self.editable.store(editable, Ordering::SeqCst);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<DocumentCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Paragraph inserts made so far, in order
    pub fn inserted(&self) -> Vec<ParagraphInsert> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DocumentCall::InsertParagraph(insert) => Some(insert),
                _ => None,
            })
            .collect()
    }

    /// Current body paragraphs
    pub fn paragraphs(&self) -> Vec<Paragraph> {
        self.state.lock().map(|s| s.paragraphs.clone()).unwrap_or_default()
    }

    /// Current value of a custom property, without recording a call
    pub fn property(&self, key: &str) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.properties.get(key).cloned())
    }

    fn record(&self, call: DocumentCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_available(&self) -> Result<(), AdapterError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AdapterError::Unavailable("document host is not available".to_string()))
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut DocumentState) -> T) -> Result<T, AdapterError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AdapterError::Operation("document state poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    fn flush(&self) -> Result<(), AdapterError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        debug!(?path, "MemoryDocument::flush: writing document");
        let content = self.with_state(|state| serde_json::to_string_pretty(state))?
            .map_err(|e| AdapterError::Operation(e.to_string()))?;
        fs::write(path, content).map_err(|e| AdapterError::Operation(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl DocumentAdapter for MemoryDocument {
    async fn body(&self) -> Result<DocumentSnapshot, AdapterError> {
        self.check_available()?;
        self.record(DocumentCall::Body);
        self.with_state(|state| DocumentSnapshot {
            paragraphs: state.paragraphs.clone(),
            tables: state.tables.clone(),
            pictures: state.pictures.clone(),
        })
    }

    async fn run_exclusive(&self, batch: EditBatch) -> Result<(), AdapterError> {
        self.check_available()?;
        if !self.editable.load(Ordering::SeqCst) {
            return Err(AdapterError::Unavailable("document host closed before editing".to_string()));
        }
        debug!(inserts = %batch.len(), "MemoryDocument::run_exclusive: called");
        let inserts = batch.into_inserts();
        for insert in &inserts {
            self.record(DocumentCall::InsertParagraph(insert.clone()));
        }
        self.with_state(|state| {
            for insert in inserts {
                let style = insert
                    .style
                    .map(|s| s.style_name().to_string())
                    .unwrap_or_else(|| "Normal".to_string());
                let paragraph = Paragraph {
                    text: insert.text,
                    style,
                    font: insert.font,
                };
                match insert.location {
                    InsertLocation::End => state.paragraphs.push(paragraph),
                    InsertLocation::Start => state.paragraphs.insert(0, paragraph),
                }
            }
        })?;
        self.flush()
    }

    async fn custom_property(&self, key: &str) -> Result<Option<String>, AdapterError> {
        self.check_available()?;
        self.record(DocumentCall::GetProperty(key.to_string()));
        self.with_state(|state| state.properties.get(key).cloned())
    }

    async fn add_property(&self, key: &str, value: &str) -> Result<(), AdapterError> {
        self.check_available()?;
        self.record(DocumentCall::AddProperty(key.to_string()));
        self.with_state(|state| {
            state.properties.insert(key.to_string(), value.to_string());
        })?;
        self.flush()
    }

    async fn delete_property(&self, key: &str) -> Result<(), AdapterError> {
        self.check_available()?;
        self.record(DocumentCall::DeleteProperty(key.to_string()));
        self.with_state(|state| {
            state.properties.remove(key);
        })?;
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BuiltinStyle, FontOptions};
    use crate::domain::Level;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_exclusive_appends_in_order() {
        let doc = MemoryDocument::with_paragraphs(vec![Paragraph::heading("Intro", Level::Section)]);
        let mut batch = EditBatch::new();
        batch.styled("Methods", BuiltinStyle::Heading1).formatted("<notes>", FontOptions::italic()).blank();

        doc.run_exclusive(batch).await.unwrap();

        let paragraphs = doc.paragraphs();
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[1].text, "Methods");
        assert_eq!(paragraphs[1].style, "Heading 1");
        assert_eq!(paragraphs[2].font.italic, Some(true));
        assert_eq!(doc.inserted().len(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_document_fails_without_recording() {
        let doc = MemoryDocument::new();
        doc.set_available(false);

        assert!(matches!(doc.body().await, Err(AdapterError::Unavailable(_))));
        assert!(doc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_document_refuses_edits() {
        let doc = MemoryDocument::with_paragraphs(vec![Paragraph::heading("Intro", Level::Section)]);
        doc.set_editable(false);
        let mut batch = EditBatch::new();
        batch.styled("Methods", BuiltinStyle::Heading1);

        assert!(doc.body().await.is_ok());
        assert!(matches!(doc.run_exclusive(batch).await, Err(AdapterError::Unavailable(_))));
        assert_eq!(doc.paragraphs().len(), 1);
        assert!(doc.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_properties() {
        let doc = MemoryDocument::new();
        assert_eq!(doc.custom_property("k").await.unwrap(), None);

        doc.add_property("k", "v1").await.unwrap();
        assert_eq!(doc.custom_property("k").await.unwrap(), Some("v1".to_string()));

        doc.delete_property("k").await.unwrap();
        doc.delete_property("k").await.unwrap();
        assert_eq!(doc.property("k"), None);
    }

    #[tokio::test]
    async fn test_file_backed_document_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        {
            let doc = MemoryDocument::open(&path).unwrap();
            let mut batch = EditBatch::new();
            batch.styled("Intro", BuiltinStyle::Heading1);
            doc.run_exclusive(batch).await.unwrap();
            doc.add_property("plan", "{}").await.unwrap();
        }

        let reopened = MemoryDocument::open(&path).unwrap();
        let body = reopened.body().await.unwrap();
        assert_eq!(body.paragraphs.len(), 1);
        assert_eq!(body.headings()[0].text, "Intro");
        assert_eq!(reopened.property("plan"), Some("{}".to_string()));
    }
}
