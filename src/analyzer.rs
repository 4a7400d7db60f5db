//! Collaborator seam for content analysis.
//!
//! Topic, title and alias extraction is heuristic work that lives outside
//! this crate's correctness guarantees. The core only consumes the results
//! through [`Suggestions`]; a failing analyzer degrades to empty suggestions
//! and never blocks the pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub title: Option<String>,
    pub topics: Vec<String>,
    pub aliases: Vec<String>,
}

pub trait ContentAnalyzer {
    /// Called once per document before planning. Implementations must map
    /// their own failures to empty suggestions.
    fn analyze(&self, document_text: &str) -> Suggestions;
}

/// Analyzer that suggests nothing. Useful as the default collaborator and in
/// tests that exercise planning without content heuristics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnalyzer;

impl ContentAnalyzer for NullAnalyzer {
    fn analyze(&self, _document_text: &str) -> Suggestions {
        Suggestions::default()
    }
}
