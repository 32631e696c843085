//! PlannerSession - the top-level controller
//!
//! Owns the outline, the plan and the id allocator for one document, and
//! exposes every user operation. Operations take a snapshot of the state,
//! compute a new value and swap it in; the lock is never held across an
//! await, so a failed operation leaves the previous state in place.
//!
//! The document host is decided once, at construction. Without one, sync and
//! section drafting are unavailable, persistence is cache-only and
//! statistics are simulated (when enabled).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::{AdapterError, DocumentAdapter, EditBatch, FontOptions};
use crate::domain::{
    IdAllocator, Level, OutlineItem, PlanItem, SectionStats, SectionStatus, default_comment, normalize_title,
    seed_template,
};
use crate::error::PlannerError;
use crate::merge::{MergeMode, merge, merged_outline};
use crate::persistence::{LoadSource, PersistenceGateway, PlanFile, export_toc, import_toc};
use crate::planning::{ExtractionSource, LlmPlanGenerator, PlanGenerator, extract_sections, update_prompt};
use crate::stats;
use crate::store::Store;
use crate::sync::synchronize;

/// Store key holding a locally saved API key
pub const API_KEY_STORE_KEY: &str = "openRouterApiKey";

const SECTION_TITLE_SIZE: f32 = 14.0;

/// Outline, plan and id counter, replaced as one value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanState {
    pub toc: Vec<OutlineItem>,
    pub plan: Vec<PlanItem>,
    pub ids: IdAllocator,
}

impl PlanState {
    fn plan_index(&self, id: u32) -> Option<usize> {
        self.plan.iter().position(|item| item.id == id)
    }

    fn toc_index(&self, id: u32) -> Option<usize> {
        self.toc.iter().position(|item| item.id == id)
    }

    fn reseed(&mut self) {
        let ids = self
            .toc
            .iter()
            .map(|o| o.id)
            .chain(self.plan.iter().map(|p| p.id))
            .collect::<Vec<_>>();
        self.ids.reseed(ids);
    }
}

/// How far a save got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// Written to the cache and to the document
    Saved,
    /// Written to the cache only; the document is missing or refused the write
    LocalOnly,
    /// Nothing could be written (logged)
    NotSaved,
}

impl Persisted {
    pub fn is_degraded(self) -> bool {
        self != Persisted::Saved
    }
}

/// Result of plan generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub sections: usize,
    pub added: usize,
    pub matched: usize,
    pub source: ExtractionSource,
    pub persisted: Persisted,
}

/// Where refreshed statistics came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    Document,
    Simulated,
    /// No usable document and simulation disabled; statistics untouched
    Unavailable,
}

/// Result of a statistics refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsReport {
    pub source: StatsSource,
    pub matched: usize,
    pub promoted: usize,
    pub persisted: Persisted,
}

/// Result of a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// The document has no level 1/2 headings; nothing changed
    NothingToSync,
    Synced {
        additions_to_plan: usize,
        additions_to_document: usize,
        persisted: Persisted,
        stats: StatsReport,
    },
}

/// Result of drafting one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftReport {
    pub id: u32,
    pub status: SectionStatus,
    pub words: usize,
    pub persisted: Persisted,
}

/// Progress overview
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSummary {
    pub sections: usize,
    /// Mean per-section progress, 0 to 100
    pub completion: f64,
    pub totals: SectionStats,
    /// Section count per status, in workflow order
    pub by_status: Vec<(SectionStatus, usize)>,
}

impl PlanSummary {
    pub fn of(plan: &[PlanItem]) -> Self {
        let completion = if plan.is_empty() {
            0.0
        } else {
            plan.iter().map(|item| item.status.progress()).sum::<f64>() / plan.len() as f64
        };
        let totals = plan.iter().fold(SectionStats::default(), |acc, item| SectionStats {
            words: acc.words + item.words,
            paragraphs: acc.paragraphs + item.paragraphs,
            tables: acc.tables + item.tables,
            graphics: acc.graphics + item.graphics,
        });
        let by_status = SectionStatus::ALL
            .iter()
            .map(|status| (*status, plan.iter().filter(|item| item.status == *status).count()))
            .collect();
        Self {
            sections: plan.len(),
            completion,
            totals,
            by_status,
        }
    }
}

/// Guard clearing a busy flag on drop
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One flag per long-running operation
#[derive(Debug, Default)]
struct BusyFlags {
    generate: AtomicBool,
    sync: AtomicBool,
    stats: AtomicBool,
    draft: AtomicBool,
}

fn acquire<'a>(flag: &'a AtomicBool, what: &'static str) -> Result<BusyGuard<'a>, PlannerError> {
    flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .map(|_| BusyGuard(flag))
        .map_err(|_| {
            debug!(%what, "acquire: already running");
            PlannerError::Busy(what)
        })
}

/// A host that went away mid-session counts as a missing feature
fn unavailable_as_feature(error: AdapterError, what: &str) -> PlannerError {
    match error {
        AdapterError::Unavailable(reason) => {
            warn!(%reason, %what, "document host unavailable");
            PlannerError::FeatureUnavailable(what.to_string())
        }
        other => other.into(),
    }
}

/// The planner for one open document
pub struct PlannerSession {
    config: Config,
    store: Arc<dyn Store>,
    document: Option<Arc<dyn DocumentAdapter>>,
    generator: Option<Arc<dyn PlanGenerator>>,
    persistence: PersistenceGateway,
    state: RwLock<PlanState>,
    busy: BusyFlags,
}

impl PlannerSession {
    /// Create a session; `document` is `None` when no host document is available
    pub fn new(config: Config, store: Arc<dyn Store>, document: Option<Arc<dyn DocumentAdapter>>) -> Self {
        debug!(has_document = %document.is_some(), "PlannerSession::new: called");
        let persistence = PersistenceGateway::new(store.clone(), document.clone(), config.storage.property_key.clone());
        Self {
            config,
            store,
            document,
            generator: None,
            persistence,
            state: RwLock::new(PlanState::default()),
            busy: BusyFlags::default(),
        }
    }

    /// Use `generator` instead of building an LLM client from configuration
    pub fn with_generator(mut self, generator: Arc<dyn PlanGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Current state
    pub fn snapshot(&self) -> PlanState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn plan(&self) -> Vec<PlanItem> {
        self.snapshot().plan
    }

    pub fn toc(&self) -> Vec<OutlineItem> {
        self.snapshot().toc
    }

    pub fn next_id(&self) -> u32 {
        self.snapshot().ids.next_id()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary::of(&self.plan())
    }

    fn commit(&self, state: PlanState) {
        debug!(plan = %state.plan.len(), toc = %state.toc.len(), next_id = %state.ids.next_id(), "commit: called");
        match self.state.write() {
            Ok(mut current) => *current = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }

    /// Save the current state; failures are logged, never raised
    pub async fn save(&self) -> Persisted {
        let state = self.snapshot();
        match self.persistence.save(&state.toc, &state.plan).await {
            Ok(report) if report.embedded && self.document.is_some() => Persisted::Saved,
            Ok(_) => Persisted::LocalOnly,
            Err(e) => {
                warn!(error = %e, "save: nothing persisted");
                Persisted::NotSaved
            }
        }
    }

    async fn commit_and_save(&self, state: PlanState) -> Persisted {
        self.commit(state);
        self.save().await
    }

    /// Restore saved state (document copy first, then the local cache)
    pub async fn load(&self) -> Option<LoadSource> {
        debug!("load: called");
        let loaded = self.persistence.load().await?;
        self.commit(PlanState {
            toc: loaded.toc,
            plan: loaded.plan,
            ids: loaded.ids,
        });
        Some(loaded.source)
    }

    // === API key ===

    /// Key from the configured environment variable, else the locally stored one
    pub fn api_key(&self) -> Option<String> {
        let env_key = std::env::var(&self.config.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if env_key.is_some() {
            return env_key;
        }
        match self.store.get_local(API_KEY_STORE_KEY) {
            Ok(key) => key.filter(|k| !k.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "api_key: local store unreadable");
                None
            }
        }
    }

    /// Store an API key locally
    pub fn set_api_key(&self, key: &str) -> Result<(), PlannerError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(PlannerError::Validation("API key must not be empty.".to_string()));
        }
        self.store.set_local(API_KEY_STORE_KEY, key)?;
        info!("set_api_key: stored");
        Ok(())
    }

    fn generator(&self) -> Result<Arc<dyn PlanGenerator>, PlannerError> {
        let key = self.api_key().ok_or_else(|| {
            PlannerError::Configuration("API key not set. Please configure your OpenRouter API key.".to_string())
        })?;
        match &self.generator {
            Some(generator) => Ok(generator.clone()),
            None => Ok(Arc::new(LlmPlanGenerator::from_config(&self.config.llm, &key)?)),
        }
    }

    // === Outline and plan editing ===

    /// Seed the outline and plan from the built-in template, replacing both
    pub async fn create_template(&self) -> Persisted {
        debug!("create_template: called");
        let (toc, plan, ids) = seed_template();
        info!(sections = %plan.len(), "create_template: seeded");
        self.commit_and_save(PlanState { toc, plan, ids }).await
    }

    /// Add a custom section to both the outline and the plan
    pub async fn add_item(&self, title: Option<&str>, level: Level) -> Result<(u32, Persisted), PlannerError> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(match level {
                Level::Section => "New Section",
                Level::Subsection => "New Subsection",
            });
        let mut state = self.snapshot();
        let id = state.ids.mint()?;
        let item = PlanItem::new(id, title, level, default_comment(title).unwrap_or(""));
        state.toc.push(item.to_outline(false));
        state.plan.push(item);
        info!(%id, %title, "add_item: added");
        Ok((id, self.commit_and_save(state).await))
    }

    /// Remove a section from both the outline and the plan
    pub async fn delete_item(&self, id: u32) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let before = state.toc.len() + state.plan.len();
        state.toc.retain(|o| o.id != id);
        state.plan.retain(|p| p.id != id);
        if state.toc.len() + state.plan.len() == before {
            return Err(PlannerError::ItemNotFound(id));
        }
        info!(%id, "delete_item: deleted");
        Ok(self.commit_and_save(state).await)
    }

    /// Delete from the outline; a default item still in the plan is refused
    pub async fn delete_outline_item(&self, id: u32) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let index = state.toc_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        let in_plan = state.plan_index(id).is_some();
        if state.toc[index].is_default && in_plan {
            return Err(PlannerError::DeleteGuarded(id));
        }
        state.toc.remove(index);
        state.plan.retain(|p| p.id != id);
        info!(%id, %in_plan, "delete_outline_item: deleted");
        Ok(self.commit_and_save(state).await)
    }

    /// Put an outline-only item into the plan, in outline order
    pub async fn include_item(&self, id: u32) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let toc_index = state.toc_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        if state.plan_index(id).is_some() {
            return Err(PlannerError::Validation(format!("Section {} is already in the plan.", id)));
        }
        let outline = &state.toc[toc_index];
        let item = PlanItem::new(id, outline.title.clone(), outline.level, default_comment(&outline.title).unwrap_or(""))
            .with_default(outline.is_default);

        // After the last plan item that comes earlier in the outline
        let at = state
            .plan
            .iter()
            .rposition(|p| state.toc_index(p.id).is_some_and(|i| i < toc_index))
            .map(|i| i + 1)
            .unwrap_or(0);
        state.plan.insert(at, item);
        info!(%id, %at, "include_item: included");
        Ok(self.commit_and_save(state).await)
    }

    /// Take a section out of the plan, keeping it in the outline
    pub async fn exclude_item(&self, id: u32) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let index = state.plan_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        state.plan.remove(index);
        if state.toc_index(id).is_none() {
            debug!(%id, "exclude_item: item had no outline entry");
        }
        info!(%id, "exclude_item: excluded");
        Ok(self.commit_and_save(state).await)
    }

    pub async fn update_status(&self, id: u32, status: SectionStatus) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let index = state.plan_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        state.plan[index].status = status;
        info!(%id, %status, "update_status: updated");
        Ok(self.commit_and_save(state).await)
    }

    pub async fn update_comments(&self, id: u32, comments: &str) -> Result<Persisted, PlannerError> {
        let mut state = self.snapshot();
        let index = state.plan_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        state.plan[index].comments = comments.to_string();
        debug!(%id, "update_comments: updated");
        Ok(self.commit_and_save(state).await)
    }

    /// Rename a section in both projections
    pub async fn update_title(&self, id: u32, title: &str) -> Result<Persisted, PlannerError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PlannerError::Validation("Section title must not be empty.".to_string()));
        }
        let mut state = self.snapshot();
        let plan_index = state.plan_index(id);
        let toc_index = state.toc_index(id);
        if plan_index.is_none() && toc_index.is_none() {
            return Err(PlannerError::ItemNotFound(id));
        }
        if let Some(i) = plan_index {
            state.plan[i].title = title.to_string();
        }
        if let Some(i) = toc_index {
            state.toc[i].title = title.to_string();
        }
        info!(%id, %title, "update_title: renamed");
        Ok(self.commit_and_save(state).await)
    }

    /// Clear everything and start ids from 1 again
    pub async fn reset(&self) -> Persisted {
        info!("reset: clearing outline and plan");
        self.commit_and_save(PlanState::default()).await
    }

    // === Files ===

    pub fn export_toc(&self) -> Result<String, PlannerError> {
        export_toc(&self.toc())
    }

    /// Replace the outline; the id counter moves past every known id
    pub async fn import_toc(&self, json: &str) -> Result<Persisted, PlannerError> {
        let toc = import_toc(json)?;
        let mut state = self.snapshot();
        for item in &state.plan {
            if let Some(outline) = toc.iter().find(|o| o.id == item.id)
                && normalize_title(&outline.title) != item.normalized_title()
            {
                warn!(id = %item.id, plan = %item.title, outline = %outline.title, "import_toc: id reused with another title");
            }
        }
        state.toc = toc;
        state.reseed();
        info!(toc = %state.toc.len(), next_id = %state.ids.next_id(), "import_toc: imported");
        Ok(self.commit_and_save(state).await)
    }

    pub fn save_plan_to_file(&self) -> Result<String, PlannerError> {
        let state = self.snapshot();
        PlanFile::new(&state.toc, &state.plan).to_json()
    }

    /// Replace outline and plan from a plan file
    pub async fn load_plan_from_file(&self, json: &str) -> Result<Persisted, PlannerError> {
        let file = PlanFile::parse(json)?;
        let ids = file.allocator();
        let state = PlanState {
            toc: file.toc_items,
            plan: file.planning_items,
            ids,
        };
        info!(plan = %state.plan.len(), next_id = %state.ids.next_id(), "load_plan_from_file: loaded");
        Ok(self.commit_and_save(state).await)
    }

    // === Generation ===

    /// Ask the generator for a plan and merge it under `mode`
    pub async fn generate_plan(&self, prompt: &str, mode: MergeMode) -> Result<GenerateReport, PlannerError> {
        debug!(%mode, "generate_plan: called");
        let _guard = acquire(&self.busy.generate, "Plan generation")?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(PlannerError::Validation("Describe the document you want to plan.".to_string()));
        }
        let generator = self.generator()?;
        let state = self.snapshot();

        let (system_prompt, user_prompt) = match mode {
            MergeMode::Replace => (self.config.prompts.planner_system.as_str(), prompt.to_string()),
            MergeMode::Update => (self.config.prompts.update_system.as_str(), update_prompt(&state.plan, prompt)),
        };

        let raw = generator
            .generate(system_prompt, &user_prompt, &self.config.llm.model)
            .await
            .inspect_err(|e| warn!(error = %e, "generate_plan: generator failed"))?;

        let extraction = extract_sections(&raw).ok_or_else(|| {
            let preview: String = raw.chars().take(200).collect();
            PlannerError::Parse(preview)
        })?;

        let mut ids = state.ids.clone();
        let outcome = merge(&state.plan, &extraction.items, mode, &mut ids)?;
        let toc = merged_outline(&state.toc, &outcome.plan, mode);

        let report = GenerateReport {
            sections: outcome.plan.len(),
            added: outcome.minted.len(),
            matched: outcome.matched,
            source: extraction.source,
            persisted: Persisted::NotSaved,
        };
        let persisted = self
            .commit_and_save(PlanState {
                toc,
                plan: outcome.plan,
                ids,
            })
            .await;
        info!(sections = %report.sections, added = %report.added, "generate_plan: done");
        Ok(GenerateReport { persisted, ..report })
    }

    /// Draft a section's content from its comments and append it to the document
    pub async fn generate_section_content(&self, id: u32) -> Result<DraftReport, PlannerError> {
        debug!(%id, "generate_section_content: called");
        let _guard = acquire(&self.busy.draft, "Section drafting")?;
        let state = self.snapshot();
        let index = state.plan_index(id).ok_or(PlannerError::ItemNotFound(id))?;
        let section = &state.plan[index];

        let min_words = self.config.session.min_section_prompt_words;
        if section.comment_word_count() < min_words {
            return Err(PlannerError::Validation(format!(
                "Add at least {} words of notes to this section before generating content.",
                min_words
            )));
        }
        let document = self
            .document
            .clone()
            .ok_or_else(|| PlannerError::FeatureUnavailable("Section drafting".to_string()))?;
        let generator = self.generator()?;

        let content = generator
            .generate(
                &self.config.prompts.section_prompt(&section.title),
                &section.comments,
                &self.config.llm.model,
            )
            .await?;
        let content = content.trim().to_string();

        let mut batch = EditBatch::new();
        batch
            .formatted(section.title.clone(), FontOptions::bold(SECTION_TITLE_SIZE))
            .text(content.clone())
            .blank();
        document
            .run_exclusive(batch)
            .await
            .map_err(|e| unavailable_as_feature(e, "Section drafting"))?;

        // The document changed; start from whatever the state is now
        let mut state = self.snapshot();
        let status = match state.plan_index(id) {
            Some(i) => {
                let item = &mut state.plan[i];
                item.status = item.status.max(SectionStatus::Drafted);
                item.status
            }
            None => SectionStatus::Drafted,
        };
        let persisted = self.commit_and_save(state).await;
        info!(%id, %status, "generate_section_content: drafted");
        Ok(DraftReport {
            id,
            status,
            words: content.split_whitespace().count(),
            persisted,
        })
    }

    // === Document ===

    /// Reconcile the plan with the document's headings in both directions
    pub async fn sync(&self) -> Result<SyncReport, PlannerError> {
        debug!("sync: called");
        let _guard = acquire(&self.busy.sync, "Sync")?;
        let document = self
            .document
            .clone()
            .ok_or_else(|| PlannerError::FeatureUnavailable("Sync".to_string()))?;

        let body = document.body().await.map_err(|e| unavailable_as_feature(e, "Sync"))?;
        let state = self.snapshot();
        let mut ids = state.ids.clone();
        let Some(outcome) = synchronize(&state.plan, &state.toc, &body.outline_headings(), &mut ids)? else {
            return Ok(SyncReport::NothingToSync);
        };

        let additions_to_plan = outcome.additions_to_plan();
        let additions_to_document = outcome.additions_to_document();
        if !outcome.batch.is_empty() {
            document
                .run_exclusive(outcome.batch)
                .await
                .map_err(|e| unavailable_as_feature(e, "Sync"))?;
        }

        let persisted = self
            .commit_and_save(PlanState {
                toc: outcome.toc,
                plan: outcome.plan,
                ids,
            })
            .await;
        let stats = self.refresh_inner().await;
        info!(%additions_to_plan, %additions_to_document, "sync: done");
        Ok(SyncReport::Synced {
            additions_to_plan,
            additions_to_document,
            persisted,
            stats,
        })
    }

    /// Recompute per-section statistics
    pub async fn refresh_statistics(&self) -> Result<StatsReport, PlannerError> {
        let _guard = acquire(&self.busy.stats, "Statistics refresh")?;
        Ok(self.refresh_inner().await)
    }

    async fn refresh_inner(&self) -> StatsReport {
        debug!("refresh_inner: called");
        let unavailable = StatsReport {
            source: StatsSource::Unavailable,
            matched: 0,
            promoted: 0,
            persisted: Persisted::NotSaved,
        };

        let (plan, source, matched, promoted) = match &self.document {
            Some(document) => match document.body().await {
                Ok(body) => {
                    let outcome = stats::refresh(&self.plan(), &body);
                    (outcome.plan, StatsSource::Document, outcome.matched, outcome.promoted)
                }
                Err(e) => {
                    warn!(error = %e, "refresh_inner: document unavailable, statistics unchanged");
                    return unavailable;
                }
            },
            None if self.config.session.simulate_statistics => {
                let plan = self.plan();
                let simulated = {
                    let mut rng = rand::rng();
                    stats::simulate(&plan, &mut rng)
                };
                let count = simulated.len();
                (simulated, StatsSource::Simulated, count, 0)
            }
            None => {
                debug!("refresh_inner: no document and simulation disabled");
                return unavailable;
            }
        };

        let mut state = self.snapshot();
        state.plan = plan;
        let persisted = self.commit_and_save(state).await;
        StatsReport {
            source,
            matched,
            promoted,
            persisted,
        }
    }
}
