//! Domain types for docplan
//!
//! Two projections share one id space: the outline template (`OutlineItem`)
//! and the live plan (`PlanItem`). An outline id without a plan counterpart
//! is a section that is available but not yet in the plan.

mod id;
mod item;
mod template;

pub use id::{IdAllocator, IdsExhausted, MAX_ITEM_ID};
pub use item::{Level, OutlineItem, PlanItem, ProposedItem, SectionStats, SectionStatus, normalize_title};
pub use template::{DEFAULT_TEMPLATE, TemplateEntry, default_comment, seed_template};
