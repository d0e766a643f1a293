//! # Authorflow
//!
//! Book project workflow engine: drive a book from research to marketing.
//!
//! A project moves through four phases. Each phase has a pipeline that
//! merges artifacts from external services into one project record.
//!
//! ## Features
//!
//! - **Research**: competitor search and AI market analysis with an approvable suggestion
//! - **Writing**: chapters with AI-generated drafts and word counts
//! - **Editing**: per-chapter suggestions, progress from resolution ratio
//! - **Marketing**: promotional copy and a publishing schedule
//! - **Realtime store**: JSON tree with push subscriptions, in memory or on disk
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a project
//! authorflow new "Ember" --description "A dragon rider's tale" --genre fantasy --audience "young adult"
//!
//! # List projects
//! authorflow list
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::future_not_send)]

pub mod ai;
pub mod core;
pub mod model;
pub mod search;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use core::Config;
pub use model::{Phase, ProjectRecord};
pub use store::{FileStore, MemoryStore, ProjectStore};
pub use workflow::{SessionContext, WorkflowError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "authorflow";
