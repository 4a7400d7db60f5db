//! Corpus Index: the aggregate view of documents, attachments and the
//! reference edges between them.
//!
//! The index is the only corpus state the planner and orphan detector ever
//! see; neither touches disk. It is consistent with disk at the moment of
//! [`CorpusIndex::build`], and the executor keeps it consistent during a
//! batch by applying every disk mutation to the index synchronously.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::read_to_string,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

use crate::{
    analyzer::Suggestions,
    config::CorpusLayout,
    error::RefileError,
    frontmatter::{self, Frontmatter},
    paths::{os_path_to_string, string_to_os_path},
    scanner::{self, Reference},
};

/// A text file under management. Content and frontmatter are rewritten in
/// place by the executor when references it holds change target; the core
/// never deletes documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Corpus-root-relative path, the document's identity.
    pub path: String,
    pub raw_content: String,
    pub frontmatter: Option<Frontmatter>,
    /// References extracted from `raw_content`, ordered by span start.
    pub references: Vec<Reference>,
}

impl Document {
    pub fn new(path: String, raw_content: String, attachments_prefix: &str) -> Self {
        let (frontmatter, _) = frontmatter::parse(&raw_content);
        let references = scanner::scan(&path, attachments_prefix, &raw_content);
        Document {
            path,
            raw_content,
            frontmatter,
            references,
        }
    }

    /// Fold analyzer suggestions into this document's frontmatter, creating
    /// an empty frontmatter when the document declared none.
    pub fn merge_suggestions(&mut self, suggestions: &Suggestions) {
        self.frontmatter
            .get_or_insert_with(Frontmatter::default)
            .merge_suggestions(suggestions);
    }
}

#[derive(Debug, Clone)]
pub struct CorpusIndex {
    layout: CorpusLayout,
    documents: BTreeMap<String, Document>,
    attachments: BTreeSet<String>,
    /// target path -> ordered referencing document paths.
    incoming: BTreeMap<String, Vec<String>>,
}

impl CorpusIndex {
    /// Walk the drafts, references and attachment roots and index everything
    /// found there. An inaccessible root fails the whole run before any
    /// mutation occurs; a document that fails frontmatter parsing does not.
    pub fn build(layout: CorpusLayout) -> Result<CorpusIndex, RefileError> {
        for root in [
            layout.drafts_root(),
            layout.references_root(),
            layout.attachments_root(),
        ] {
            if !root.is_dir() {
                return Err(RefileError::NotFound(format!(
                    "Corpus root is not an accessible directory: {root:?}"
                )));
            }
        }

        let mut index = CorpusIndex {
            layout,
            documents: BTreeMap::new(),
            attachments: BTreeSet::new(),
            incoming: BTreeMap::new(),
        };
        for doc_root in [index.layout.drafts_root(), index.layout.references_root()] {
            for path in walk_files(&doc_root) {
                let rel = rel_to_root(&index.layout.root, &path)?;
                if !rel.ends_with(".md") {
                    tracing::debug!("Skipping non-markdown file in document root: {rel}");
                    continue;
                }
                let content = read_to_string(&path)?;
                let doc = Document::new(rel.clone(), content, index.layout.attachments_prefix());
                index.documents.insert(rel, doc);
            }
        }
        for path in walk_files(&index.layout.attachments_root()) {
            index.attachments.insert(rel_to_root(&index.layout.root, &path)?);
        }
        index.rebuild_adjacency();
        tracing::info!(
            "Indexed {} documents, {} attachments, {} referenced targets",
            index.documents.len(),
            index.attachments.len(),
            index.incoming.len()
        );
        Ok(index)
    }

    /// Test-double constructor: an index over in-memory content, no disk.
    pub fn in_memory(
        layout: CorpusLayout,
        documents: Vec<Document>,
        attachments: Vec<String>,
    ) -> CorpusIndex {
        let mut index = CorpusIndex {
            layout,
            documents: documents.into_iter().map(|d| (d.path.clone(), d)).collect(),
            attachments: attachments.into_iter().collect(),
            incoming: BTreeMap::new(),
        };
        index.rebuild_adjacency();
        index
    }

    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    /// Absolute on-disk path for a corpus-relative path.
    pub fn abs_path(&self, rel: &str) -> PathBuf {
        self.layout.root.join(string_to_os_path(rel))
    }

    /// Existence check against the in-memory set, not disk.
    pub fn exists(&self, path: &str) -> bool {
        self.documents.contains_key(path) || self.attachments.contains(path)
    }

    pub fn document(&self, path: &str) -> Option<&Document> {
        self.documents.get(path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn attachments(&self) -> &BTreeSet<String> {
        &self.attachments
    }

    /// Ordered document paths referencing `target`. Empty signals an orphan
    /// candidate.
    pub fn references_to(&self, target: &str) -> &[String] {
        self.incoming
            .get(target)
            .map(|docs| docs.as_slice())
            .unwrap_or(&[])
    }

    /// Record an attachment rename. Called by the executor synchronously with
    /// the disk move so planning state never drifts within a batch.
    pub fn record_rename(&mut self, old_path: &str, new_path: &str) {
        if self.attachments.remove(old_path) {
            self.attachments.insert(new_path.to_string());
        }
        self.rebuild_adjacency();
    }

    /// Record a document move, rekeying the document under its new path.
    pub fn record_document_move(&mut self, old_path: &str, new_path: &str) {
        if let Some(mut doc) = self.documents.remove(old_path) {
            doc.path = new_path.to_string();
            // Spans are unchanged by a move; re-resolve targets from the new
            // location so document-relative references stay correct.
            doc.references = scanner::scan(
                &doc.path,
                self.layout.attachments_prefix(),
                &doc.raw_content,
            );
            self.documents.insert(new_path.to_string(), doc);
        }
        self.rebuild_adjacency();
    }

    /// Replace a document's content after a rewrite and rescan its
    /// references, keeping adjacency and spans current.
    pub fn refresh_document(&mut self, path: &str, new_content: String) {
        if let Some(doc) = self.documents.get_mut(path) {
            let (fm, _) = frontmatter::parse(&new_content);
            doc.frontmatter = fm;
            doc.references =
                scanner::scan(path, self.layout.attachments_prefix(), &new_content);
            doc.raw_content = new_content;
        } else {
            tracing::warn!("refresh_document called for unindexed path {path}");
        }
        self.rebuild_adjacency();
    }

    fn rebuild_adjacency(&mut self) {
        self.incoming.clear();
        for doc in self.documents.values() {
            for reference in &doc.references {
                let entry = self.incoming.entry(reference.target.clone()).or_default();
                if !entry.contains(&doc.path) {
                    entry.push(doc.path.clone());
                }
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || e.path() == root)
        .filter_map(|e| e.ok().map(|e| e.into_path()))
        .filter(|p| p.is_file())
        .collect::<Vec<PathBuf>>();
    files.sort_by(|a, b| a.components().cmp(b.components()));
    files
}

fn rel_to_root(root: &Path, path: &Path) -> Result<String, RefileError> {
    Ok(os_path_to_string(path.strip_prefix(root)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_index(docs: Vec<(&str, &str)>, attachments: Vec<&str>) -> CorpusIndex {
        let layout = CorpusLayout::new("/nonexistent");
        let documents = docs
            .into_iter()
            .map(|(path, content)| {
                Document::new(path.to_string(), content.to_string(), "attachments")
            })
            .collect();
        CorpusIndex::in_memory(
            layout,
            documents,
            attachments.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_adjacency_and_exists() {
        let index = memory_index(
            vec![
                ("references/a.md", "![[one.png]] and [x](../attachments/two.png)"),
                ("references/b.md", "![[one.png]]"),
            ],
            vec!["attachments/one.png", "attachments/two.png"],
        );
        assert_eq!(
            index.references_to("attachments/one.png"),
            ["references/a.md", "references/b.md"]
        );
        assert_eq!(index.references_to("attachments/two.png"), ["references/a.md"]);
        assert!(index.exists("references/a.md"));
        assert!(index.exists("attachments/one.png"));
        assert!(!index.exists("attachments/missing.png"));
    }

    #[test]
    fn test_duplicate_references_listed_once() {
        let index = memory_index(
            vec![("references/a.md", "![[one.png]] again ![[one.png]]")],
            vec!["attachments/one.png"],
        );
        assert_eq!(index.references_to("attachments/one.png"), ["references/a.md"]);
        assert_eq!(
            index.document("references/a.md").unwrap().references.len(),
            2
        );
    }

    #[test]
    fn test_build_fails_fast_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CorpusLayout::new(dir.path());
        // No drafts/references/attachments directories created.
        assert!(matches!(
            CorpusIndex::build(layout),
            Err(RefileError::NotFound(_))
        ));
    }

    #[test]
    fn test_build_walks_roots() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["drafts", "references", "attachments"] {
            std::fs::create_dir(dir.path().join(sub)).unwrap();
        }
        std::fs::write(
            dir.path().join("references/a.md"),
            "---\ntopics: [unclosed\n---\n![[pic.png]]",
        )
        .unwrap();
        std::fs::write(dir.path().join("drafts/d.md"), "draft body").unwrap();
        std::fs::write(dir.path().join("attachments/pic.png"), b"png").unwrap();
        std::fs::write(dir.path().join("attachments/.hidden"), b"x").unwrap();

        let index = CorpusIndex::build(CorpusLayout::new(dir.path())).unwrap();
        // Malformed frontmatter indexes as empty, never blocks.
        let doc = index.document("references/a.md").unwrap();
        assert!(doc.frontmatter.is_none());
        assert_eq!(index.references_to("attachments/pic.png"), ["references/a.md"]);
        assert!(index.exists("drafts/d.md"));
        assert!(!index.exists("attachments/.hidden"));
    }

    #[test]
    fn test_record_document_move_rescans_targets() {
        let mut index = memory_index(
            vec![("references/deep/a.md", "[x](../../attachments/two.png)")],
            vec!["attachments/two.png"],
        );
        assert_eq!(index.references_to("attachments/two.png"), ["references/deep/a.md"]);
        index.record_document_move("references/deep/a.md", "references/a.md");
        // Raw text still climbs two levels, so from the new location the
        // resolved target changes until the executor rewrites the span.
        assert_eq!(index.references_to("attachments/two.png"), [] as [&str; 0]);
        assert!(index.document("references/a.md").is_some());
    }
}
