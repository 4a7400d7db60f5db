//! Orphan Detector: attachments with zero incoming references.

use std::collections::BTreeSet;

use crate::index::CorpusIndex;

/// Attachments with no incoming references at call time. A pure read over
/// the index, recomputed fresh on every call and never cached; the caller
/// decides what, if anything, to delete.
pub fn find_orphans(index: &CorpusIndex) -> BTreeSet<String> {
    index
        .attachments()
        .iter()
        .filter(|path| index.references_to(path).is_empty())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CorpusLayout, index::Document};

    #[test]
    fn test_find_orphans() {
        let docs = vec![Document::new(
            "references/a.md".to_string(),
            "![[used.png]]".to_string(),
            "attachments",
        )];
        let index = CorpusIndex::in_memory(
            CorpusLayout::new("/nonexistent"),
            docs,
            vec![
                "attachments/used.png".to_string(),
                "attachments/未使用的图片.png".to_string(),
            ],
        );
        let orphans = find_orphans(&index);
        assert_eq!(orphans.len(), 1);
        assert!(orphans.contains("attachments/未使用的图片.png"));
    }
}
