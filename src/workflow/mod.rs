//! Book project workflow engine.
//!
//! A project moves through four phases: research, writing, editing and
//! marketing. Each phase has a pipeline that reads and writes the part of
//! the [`ProjectRecord`](crate::model::ProjectRecord) it owns.
//!
//! ## Operations
//!
//! Every mutating operation follows the same order:
//!
//! 1. validate input locally
//! 2. call the external service (search or generation), if any
//! 3. persist a narrow patch to the store
//! 4. merge the result into the caller's record
//!
//! A failure at any step leaves both the store and the record unchanged.
//!
//! ## Sessions
//!
//! Pipelines receive a [`SessionContext`] carrying the owner id, the store
//! and the external services. There is no global state.

mod catalog;
mod editing;
mod error;
mod marketing;
mod phase;
mod progress;
mod research;
mod session;
mod writing;

pub use catalog::{CatalogStats, ProjectCatalog, ProjectFilter};
pub use editing::{EditingPipeline, GenerativeAnalyzer, RuleBasedAnalyzer, SuggestionAnalyzer};
pub use error::{ErrorKind, WorkflowError};
pub use marketing::{template_copy, MarketingPipeline};
pub use phase::PhaseController;
pub use progress::{ProgressCalculator, ProgressRule, RESEARCH_CHECKPOINT};
pub use research::{market_prompt, parse_suggestion, ResearchPipeline};
pub use session::SessionContext;
pub use writing::WritingPipeline;
