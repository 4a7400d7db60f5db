//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use refile_core::{config::CorpusLayout, index::CorpusIndex};
use std::path::Path;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create an empty corpus with the three standard roots and return its layout.
#[allow(dead_code)]
pub fn create_corpus(temp_dir: &TempDir) -> CorpusLayout {
    let layout = CorpusLayout::new(temp_dir.path());
    for root in [
        layout.drafts_root(),
        layout.references_root(),
        layout.attachments_root(),
    ] {
        std::fs::create_dir_all(root).unwrap();
    }
    layout
}

#[allow(dead_code)]
pub fn write_file(layout: &CorpusLayout, rel: &str, content: &str) {
    let path = layout.root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[allow(dead_code)]
pub fn read_file(layout: &CorpusLayout, rel: &str) -> String {
    std::fs::read_to_string(layout.root.join(rel)).unwrap()
}

#[allow(dead_code)]
pub fn exists(layout: &CorpusLayout, rel: &str) -> bool {
    layout.root.join(rel).exists()
}

/// Referential integrity check: every reference in every indexed document
/// must resolve to a file that exists on disk.
#[allow(dead_code)]
pub fn verify_references(index: &CorpusIndex) {
    for doc in index.documents() {
        for reference in &doc.references {
            let target: &Path = &index.abs_path(&reference.target);
            assert!(
                target.exists(),
                "dangling reference in {}: {} -> {}",
                doc.path,
                reference.raw,
                reference.target
            );
        }
    }
}
