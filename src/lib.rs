//! # refile-core
//!
//! Reference-consistent reorganization for markdown knowledge corpora.
//!
//! A personal knowledge base accumulates loose drafts, cryptically named
//! attachments, and cross-document links that break the moment anything is
//! renamed. refile-core renames and relocates files while keeping every
//! cross-document reference valid, resolving naming collisions
//! deterministically and surviving partial failures across a batch.
//!
//! ## Architecture
//!
//! - **[`scanner`]**: extracts embed (`![[name]]`) and inline
//!   (`[label](path)`) references with byte-accurate target spans
//! - **[`index`]**: the [`index::CorpusIndex`] aggregate view of documents,
//!   attachments and reference edges, built once per run from disk
//! - **[`naming`]**: sanitized, deterministic, collision-free names
//! - **[`planner`]**: turns intents into an ordered, side-effect-free
//!   [`planner::Plan`]
//! - **[`executor`]**: applies a plan with per-step atomicity, span-minimal
//!   document rewrites and batch-level partial-failure tolerance
//! - **[`orphans`]**: derives attachments with zero incoming references
//!
//! All components take the index as an explicit value; there is no hidden
//! process-wide state. The planner and orphan detector never touch disk, so
//! an in-memory index can stand in for a corpus in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refile_core::{
//!     config::CorpusLayout, executor, index::CorpusIndex, orphans, planner,
//!     planner::Intent,
//! };
//!
//! fn main() -> Result<(), refile_core::RefileError> {
//!     let layout = CorpusLayout::new("./corpus");
//!     let mut index = CorpusIndex::build(layout)?;
//!
//!     let intents = vec![Intent::RenameAttachment {
//!         path: "attachments/IMG_4123.png".to_string(),
//!         suggested_name: "kanban board sketch.png".to_string(),
//!     }];
//!     let plan = planner::plan(&intents, &index);
//!     let report = executor::execute(&plan, &mut index);
//!     println!("{report}");
//!
//!     for orphan in orphans::find_orphans(&index) {
//!         println!("unreferenced attachment: {orphan}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Collaborator seams
//!
//! Content heuristics (suggesting titles, topics and aliases) live behind
//! the [`analyzer::ContentAnalyzer`] trait; the interactive layer consumes
//! the [`executor::ExecutionReport`]. Neither is implemented here.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod executor;
pub mod frontmatter;
pub mod index;
pub mod naming;
pub mod orphans;
pub mod paths;
pub mod planner;
pub mod scanner;

pub use error::*;
