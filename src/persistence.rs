//! Saving and loading the outline and plan
//!
//! The same `{planningItems, tocItems}` envelope is used for the local cache,
//! the document property and plan files. The outline alone is exchanged as
//! a JSON array.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::DocumentAdapter;
use crate::domain::{IdAllocator, MAX_ITEM_ID, OutlineItem, PlanItem};
use crate::error::PlannerError;
use crate::store::Store;

/// Persisted form of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFile {
    pub planning_items: Vec<PlanItem>,
    pub toc_items: Vec<OutlineItem>,
}

impl PlanFile {
    pub fn new(toc: &[OutlineItem], plan: &[PlanItem]) -> Self {
        Self {
            planning_items: plan.to_vec(),
            toc_items: toc.to_vec(),
        }
    }

    /// Parse and check a plan file
    pub fn parse(json: &str) -> Result<Self, PlannerError> {
        let file: Self =
            serde_json::from_str(json).map_err(|e| PlannerError::Validation(format!("Invalid plan file: {}", e)))?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), PlannerError> {
        ensure_unique(self.planning_items.iter().map(|i| i.id), "planningItems")?;
        ensure_unique(self.toc_items.iter().map(|i| i.id), "tocItems")?;
        ensure_in_range(self.planning_items.iter().map(|i| i.id), "planningItems")?;
        ensure_in_range(self.toc_items.iter().map(|i| i.id), "tocItems")?;
        ensure_titled(self.planning_items.iter().map(|i| i.title.as_str()), "planningItems")?;
        ensure_titled(self.toc_items.iter().map(|i| i.title.as_str()), "tocItems")
    }

    pub fn to_json(&self) -> Result<String, PlannerError> {
        serde_json::to_string_pretty(self).map_err(|e| PlannerError::Validation(e.to_string()))
    }

    /// Allocator positioned after every id in the file
    pub fn allocator(&self) -> IdAllocator {
        IdAllocator::from_ids(
            self.planning_items
                .iter()
                .map(|i| i.id)
                .chain(self.toc_items.iter().map(|i| i.id)),
        )
    }
}

fn ensure_unique(ids: impl Iterator<Item = u32>, field: &str) -> Result<(), PlannerError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PlannerError::Validation(format!("Duplicate id {} in {}", id, field)));
        }
    }
    Ok(())
}

/// The largest id must leave room for the next one
fn ensure_in_range(mut ids: impl Iterator<Item = u32>, field: &str) -> Result<(), PlannerError> {
    match ids.find(|id| *id > MAX_ITEM_ID) {
        Some(id) => Err(PlannerError::Validation(format!("Id {} is too large in {}", id, field))),
        None => Ok(()),
    }
}

fn ensure_titled<'a>(titles: impl Iterator<Item = &'a str>, field: &str) -> Result<(), PlannerError> {
    for title in titles {
        if title.trim().is_empty() {
            return Err(PlannerError::Validation(format!("Untitled item in {}", field)));
        }
    }
    Ok(())
}

/// Outline as a pretty JSON array
pub fn export_toc(toc: &[OutlineItem]) -> Result<String, PlannerError> {
    serde_json::to_string_pretty(toc).map_err(|e| PlannerError::Validation(e.to_string()))
}

/// Parse and check an outline JSON array
pub fn import_toc(json: &str) -> Result<Vec<OutlineItem>, PlannerError> {
    let toc: Vec<OutlineItem> =
        serde_json::from_str(json).map_err(|e| PlannerError::Validation(format!("Invalid outline file: {}", e)))?;
    ensure_unique(toc.iter().map(|i| i.id), "outline")?;
    ensure_in_range(toc.iter().map(|i| i.id), "outline")?;
    ensure_titled(toc.iter().map(|i| i.title.as_str()), "outline")?;
    Ok(toc)
}

/// Where loaded state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Document,
    Cache,
}

/// State restored by [`PersistenceGateway::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub toc: Vec<OutlineItem>,
    pub plan: Vec<PlanItem>,
    pub ids: IdAllocator,
    pub source: LoadSource,
}

/// What a save managed to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveReport {
    pub cached: bool,
    pub embedded: bool,
}

impl SaveReport {
    /// The document copy was wanted but could not be written
    pub fn is_degraded(&self, has_document: bool) -> bool {
        has_document && !self.embedded
    }
}

/// Writes the session to the local cache and, when attached, the document
pub struct PersistenceGateway {
    store: Arc<dyn Store>,
    document: Option<Arc<dyn DocumentAdapter>>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn Store>, document: Option<Arc<dyn DocumentAdapter>>, key: impl Into<String>) -> Self {
        Self {
            store,
            document,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Save a full snapshot; fails only when no copy at all was written
    pub async fn save(&self, toc: &[OutlineItem], plan: &[PlanItem]) -> Result<SaveReport, PlannerError> {
        debug!(toc = %toc.len(), plan = %plan.len(), "PersistenceGateway::save: called");
        let json = serde_json::to_string(&PlanFile::new(toc, plan)).map_err(|e| PlannerError::Validation(e.to_string()))?;
        let mut report = SaveReport::default();

        let cache_error = match self.store.set_local(&self.key, &json) {
            Ok(()) => {
                report.cached = true;
                None
            }
            Err(e) => {
                warn!(error = %e, "PersistenceGateway::save: local cache write failed");
                Some(e)
            }
        };

        if let Some(document) = &self.document {
            // Replace the slot rather than updating in place
            let written = async {
                document.delete_property(&self.key).await?;
                document.add_property(&self.key, &json).await
            }
            .await;
            match written {
                Ok(()) => report.embedded = true,
                Err(e) => warn!(error = %e, "PersistenceGateway::save: document property write failed"),
            }
        }

        match cache_error {
            Some(e) if !report.embedded => Err(e.into()),
            _ => {
                info!(cached = %report.cached, embedded = %report.embedded, "PersistenceGateway::save: done");
                Ok(report)
            }
        }
    }

    /// Load the document copy, else the cached copy, else nothing
    pub async fn load(&self) -> Option<LoadedState> {
        debug!("PersistenceGateway::load: called");

        if let Some(document) = &self.document {
            match document.custom_property(&self.key).await {
                Ok(Some(json)) => match PlanFile::parse(&json) {
                    Ok(file) => return Some(Self::loaded(file, LoadSource::Document)),
                    Err(e) => warn!(error = %e, "PersistenceGateway::load: document copy unreadable"),
                },
                Ok(None) => debug!("PersistenceGateway::load: no document copy"),
                Err(e) => warn!(error = %e, "PersistenceGateway::load: document unavailable"),
            }
        }

        match self.store.get_local(&self.key) {
            Ok(Some(json)) => match PlanFile::parse(&json) {
                Ok(file) => return Some(Self::loaded(file, LoadSource::Cache)),
                Err(e) => warn!(error = %e, "PersistenceGateway::load: cached copy unreadable"),
            },
            Ok(None) => debug!("PersistenceGateway::load: no cached copy"),
            Err(e) => warn!(error = %e, "PersistenceGateway::load: local cache unavailable"),
        }

        info!("PersistenceGateway::load: no saved data");
        None
    }

    fn loaded(file: PlanFile, source: LoadSource) -> LoadedState {
        let ids = file.allocator();
        info!(?source, plan = %file.planning_items.len(), next_id = %ids.next_id(), "PersistenceGateway::load: loaded");
        LoadedState {
            toc: file.toc_items,
            plan: file.planning_items,
            ids,
            source,
        }
    }
}
