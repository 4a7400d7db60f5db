//! Best-effort YAML frontmatter handling.
//!
//! Frontmatter is opaque pass-through metadata: unknown fields survive a
//! parse/render round trip, and a malformed block never blocks indexing.

use crate::{analyzer::Suggestions, error::RefileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FRONTMATTER_FENCE: &str = "---";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Wiki-style topic link strings, order-preserving.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Fields this crate does not interpret but must not lose.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Frontmatter {
    /// Union-merge analyzer suggestions into topics and aliases, preserving
    /// first-seen order with case-sensitive exact-match deduplication.
    pub fn merge_suggestions(&mut self, suggestions: &Suggestions) {
        merge_unique(&mut self.topics, &suggestions.topics);
        merge_unique(&mut self.aliases, &suggestions.aliases);
    }

    pub fn render(&self) -> Result<String, RefileError> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("{FRONTMATTER_FENCE}\n{yaml}{FRONTMATTER_FENCE}\n"))
    }
}

fn merge_unique(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !into.iter().any(|existing| existing == item) {
            into.push(item.clone());
        }
    }
}

/// Parse a leading frontmatter block. Returns the parsed frontmatter (or
/// `None` when absent or malformed) and the byte offset where the body
/// starts. Malformed YAML is logged and recovered as empty frontmatter.
pub fn parse(text: &str) -> (Option<Frontmatter>, usize) {
    let mut offset = 0usize;
    let mut yaml_start = None;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        match yaml_start {
            None => {
                if trimmed != FRONTMATTER_FENCE {
                    return (None, 0);
                }
                yaml_start = Some(offset + line.len());
            }
            Some(start) if trimmed == FRONTMATTER_FENCE => {
                let yaml = &text[start..offset];
                let body_offset = offset + line.len();
                if yaml.trim().is_empty() {
                    return (Some(Frontmatter::default()), body_offset);
                }
                return match serde_yaml::from_str::<Frontmatter>(yaml) {
                    Ok(frontmatter) => (Some(frontmatter), body_offset),
                    Err(e) => {
                        tracing::warn!(
                            "Frontmatter parse failed, indexing with empty metadata: {e}"
                        );
                        (None, body_offset)
                    }
                };
            }
            Some(_) => {}
        }
        offset += line.len();
    }
    // Unterminated fence: treat the whole file as body.
    (None, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_frontmatter() {
        let text = "---\ncreated: 2024-05-01\ntopics:\n  - \"[[productivity]]\"\naliases:\n  - 80/20 rule\n---\n# Body\n";
        let (frontmatter, offset) = parse(text);
        let frontmatter = frontmatter.unwrap();
        assert_eq!(frontmatter.created.as_deref(), Some("2024-05-01"));
        assert_eq!(frontmatter.topics, vec!["[[productivity]]"]);
        assert_eq!(frontmatter.aliases, vec!["80/20 rule"]);
        assert!(text[offset..].starts_with("# Body"));
    }

    #[test]
    fn test_parse_preserves_unknown_fields() {
        let text = "---\ncreated: 2024-05-01\nrating: 5\n---\nbody";
        let (frontmatter, _) = parse(text);
        let frontmatter = frontmatter.unwrap();
        assert!(frontmatter.extra.contains_key("rating"));
        let rendered = frontmatter.render().unwrap();
        assert!(rendered.contains("rating: 5"));
    }

    #[test]
    fn test_parse_malformed_yaml_recovers_empty() {
        let text = "---\ntopics: [unclosed\n---\nbody";
        let (frontmatter, offset) = parse(text);
        assert!(frontmatter.is_none());
        assert_eq!(&text[offset..], "body");
    }

    #[test]
    fn test_parse_absent_frontmatter() {
        assert_eq!(parse("# Just a body\n"), (None, 0));
    }

    #[test]
    fn test_parse_unterminated_fence() {
        let text = "---\ncreated: 2024-05-01\nno closing fence";
        assert_eq!(parse(text), (None, 0));
    }

    #[test]
    fn test_merge_suggestions_union_first_seen() {
        let mut frontmatter = Frontmatter {
            topics: vec!["[[a]]".to_string(), "[[b]]".to_string()],
            aliases: vec!["one".to_string()],
            ..Default::default()
        };
        let suggestions = Suggestions {
            title: None,
            topics: vec!["[[b]]".to_string(), "[[c]]".to_string()],
            aliases: vec!["one".to_string(), "One".to_string()],
        };
        frontmatter.merge_suggestions(&suggestions);
        assert_eq!(frontmatter.topics, vec!["[[a]]", "[[b]]", "[[c]]"]);
        // Dedup is case-sensitive exact match.
        assert_eq!(frontmatter.aliases, vec!["one", "One"]);
    }
}
