//! Naming Resolver: sanitized, collision-free canonical names.
//!
//! Resolution is deterministic for a given index state so planning can be
//! re-run idempotently: same input, same output.

use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

use crate::{
    index::CorpusIndex,
    paths::{join_rel, split_name},
};

/// Stem used when sanitization strips a candidate down to nothing.
pub const FALLBACK_STEM: &str = "untitled";

/// Sanitize a candidate filename: NFC-normalize, collapse whitespace runs to
/// single hyphens, keep letters of any script, digits, hyphens and the final
/// extension separator, drop everything else.
pub fn sanitize(candidate: &str) -> String {
    let (stem, ext) = sanitized_parts(candidate);
    let stem = if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    };
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Sanitized (stem, extension) of a candidate. An empty stem means the
/// candidate carried no usable characters.
fn sanitized_parts(candidate: &str) -> (String, Option<String>) {
    let normalized: String = candidate.nfc().collect();
    let trimmed = normalized.trim();
    let (stem, ext) = split_name(trimmed);
    (
        sanitize_segment(stem),
        ext.map(sanitize_segment).filter(|e| !e.is_empty()),
    )
}

fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut prev_hyphen = false;
    for c in segment.chars() {
        let mapped = if c.is_whitespace() {
            Some('-')
        } else if c.is_alphanumeric() || c == '-' {
            Some(c)
        } else {
            None
        };
        if let Some(m) = mapped {
            if m == '-' {
                if prev_hyphen {
                    continue;
                }
                prev_hyphen = true;
            } else {
                prev_hyphen = false;
            }
            out.push(m);
        }
    }
    out.trim_matches('-').to_string()
}

/// Resolve `candidate` to a collision-free filename within `dir`.
///
/// A name collides when it denotes an existing *different* file in the index
/// (`current_path` exempts the file being renamed) or a path already reserved
/// by an earlier step of the same plan. Collisions append `-1`, `-2`, ...
/// (lowest unused) before the extension. Placeholder names always carry a
/// numeric suffix, starting at `-1`.
pub fn resolve_in(
    dir: &str,
    candidate: &str,
    current_path: Option<&str>,
    index: &CorpusIndex,
    reserved: &BTreeSet<String>,
) -> String {
    let (raw_stem, ext) = sanitized_parts(candidate);
    let placeholder = raw_stem.is_empty();
    let stem = if placeholder {
        FALLBACK_STEM.to_string()
    } else {
        raw_stem
    };
    let mut suffix = usize::from(placeholder);
    loop {
        let name = match (suffix, ext.as_deref()) {
            (0, Some(ext)) => format!("{stem}.{ext}"),
            (0, None) => stem.clone(),
            (n, Some(ext)) => format!("{stem}-{n}.{ext}"),
            (n, None) => format!("{stem}-{n}"),
        };
        let full = join_rel(dir, &name);
        let occupied = reserved.contains(&full)
            || (index.exists(&full) && current_path != Some(full.as_str()));
        if !occupied {
            tracing::debug!("Resolved candidate {candidate:?} to {full:?}");
            return name;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusLayout;

    fn index_with_attachments(attachments: Vec<&str>) -> CorpusIndex {
        CorpusIndex::in_memory(
            CorpusLayout::new("/nonexistent"),
            vec![],
            attachments.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_sanitize_keeps_non_latin_scripts() {
        assert_eq!(sanitize("8020-销售法则.png"), "8020-销售法则.png");
        assert_eq!(sanitize("图片.png"), "图片.png");
    }

    #[test]
    fn test_sanitize_collapses_whitespace_and_strips_symbols() {
        assert_eq!(sanitize("My  Cool   File!?.png"), "My-Cool-File.png");
        assert_eq!(sanitize("  spaced name .md"), "spaced-name.md");
        assert_eq!(sanitize("a/b\\c.png"), "abc.png");
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize("!!!.png"), "untitled.png");
        assert_eq!(sanitize("???"), "untitled");
    }

    #[test]
    fn test_resolve_collision_appends_lowest_unused() {
        let index = index_with_attachments(vec![
            "attachments/图片.png",
            "attachments/图片-1.png",
        ]);
        let reserved = BTreeSet::new();
        assert_eq!(
            resolve_in("attachments", "图片.png", None, &index, &reserved),
            "图片-2.png"
        );
    }

    #[test]
    fn test_resolve_same_file_is_not_a_collision() {
        let index = index_with_attachments(vec!["attachments/图片.png"]);
        let reserved = BTreeSet::new();
        assert_eq!(
            resolve_in(
                "attachments",
                "图片.png",
                Some("attachments/图片.png"),
                &index,
                &reserved
            ),
            "图片.png"
        );
    }

    #[test]
    fn test_resolve_respects_reserved_names() {
        let index = index_with_attachments(vec![]);
        let mut reserved = BTreeSet::new();
        reserved.insert("attachments/图片.png".to_string());
        assert_eq!(
            resolve_in("attachments", "图片.png", None, &index, &reserved),
            "图片-1.png"
        );
    }

    #[test]
    fn test_resolve_placeholder_always_numbered() {
        let index = index_with_attachments(vec![]);
        let reserved = BTreeSet::new();
        assert_eq!(
            resolve_in("attachments", "???.png", None, &index, &reserved),
            "untitled-1.png"
        );
        let index = index_with_attachments(vec!["attachments/untitled-1.png"]);
        assert_eq!(
            resolve_in("attachments", "!!!.png", None, &index, &reserved),
            "untitled-2.png"
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let index = index_with_attachments(vec!["attachments/a.png"]);
        let reserved = BTreeSet::new();
        let first = resolve_in("attachments", "a.png", None, &index, &reserved);
        let second = resolve_in("attachments", "a.png", None, &index, &reserved);
        assert_eq!(first, second);
        assert_eq!(first, "a-1.png");
    }
}
