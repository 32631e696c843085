//! docplan - Document Planning Assistant
//!
//! docplan keeps a structured writing plan for one document: an outline of
//! available sections, the plan of sections actually being written, and
//! per-section progress and statistics. Plans are generated by an LLM from a
//! description, reconciled in both directions with the document's headings,
//! and persisted both inside the document and in a local cache.
//!
//! # Core Concepts
//!
//! - **Two projections, one id space**: outline (`OutlineItem`) and plan (`PlanItem`)
//! - **Merge, don't clobber**: regenerated plans keep ids, status and statistics of matched sections
//! - **Degrade, don't fail**: without a document host the plan lives in the local cache
//!
//! # Modules
//!
//! - [`session`] - `PlannerSession`, the controller exposing every operation
//! - [`merge`] - Merging generated sections into the plan
//! - [`sync`] - Two-way reconciliation with document headings
//! - [`stats`] - Per-section statistics
//! - [`persistence`] - Document property + local cache persistence, file formats
//! - [`planning`] - Plan generation and response extraction
//! - [`llm`] - LLM client trait and OpenAI-compatible implementation
//! - [`document`] - Document host trait and in-memory host
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod llm;
pub mod merge;
pub mod persistence;
pub mod planning;
pub mod session;
pub mod stats;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use document::{AdapterError, DocumentAdapter, DocumentSnapshot, MemoryDocument};
pub use domain::{IdAllocator, Level, OutlineItem, PlanItem, ProposedItem, SectionStats, SectionStatus};
pub use error::PlannerError;
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient};
pub use merge::{MergeMode, MergeOutcome, merge};
pub use persistence::{LoadSource, PersistenceGateway, PlanFile};
pub use planning::{LlmPlanGenerator, PlanGenerator};
pub use session::{PlanSummary, PlannerSession, Persisted, StatsSource, SyncReport};
pub use store::{DirectoryStore, MemoryStore, Store, StoreError};
pub use sync::{SyncOutcome, synchronize};
