//! Link Scanner: extracts embed and inline references from document text.
//!
//! Three syntaxes are recognized:
//!
//! - Embed form `![[name]]` or `![[name|alias]]`, resolved against the
//!   attachment root. The name carries no sub-path; an alias after `|` is
//!   display text, never part of the target.
//! - Bare wikilink `[[name.ext]]`. Only wikilinks naming a file (with an
//!   extension) are attachment references; extensionless wikilinks are
//!   topic links and carry no reference edge.
//! - Inline form `[label](path)`, resolved relative to the document's own
//!   directory unless the path is already rooted at the attachment prefix.
//!
//! Malformed forms are omitted, never fatal. Every reference records the
//! exact byte span of its target text so the executor can rewrite links with
//! minimal, order-preserving substitutions.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event as MdEvent, LinkType, Options, Parser as MdParser, Tag as MdTag};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::paths::{join_rel, normalize, parent_dir, split_name};

static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(!?)\[\[([^\[\]\r\n]+)\]\]").expect("wikilink pattern is valid"));

pub fn scanner_md_options() -> Options {
    let mut md_options = Options::empty();
    // Explicit set rather than Options::all() for reproducibility. The
    // parser's wikilink option stays disabled: both bracket forms are
    // scanned separately so aliases and spans stay under our control.
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    md_options
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefForm {
    /// `![[name]]`, `![[name|alias]]` or bare `[[name.ext]]`,
    /// attachment-root-relative.
    Embed,
    /// `[label](path)`, document-relative unless rooted at the attachment prefix.
    Inline,
}

/// One reference edge extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Corpus-relative path of the document the reference was found in.
    pub source: String,
    /// Corpus-relative resolved target path.
    pub target: String,
    /// The target text exactly as written in the source.
    pub raw: String,
    /// Byte span of `raw` within the document text.
    pub span: Range<usize>,
    pub form: RefForm,
}

/// Scan `text` for references. Pure function of its inputs: rescanning the
/// same text yields the same sequence, ordered by span start.
pub fn scan(doc_path: &str, attachments_prefix: &str, text: &str) -> Vec<Reference> {
    let doc_dir = parent_dir(doc_path);
    let mut refs: Vec<Reference> = Vec::new();

    for caps in WIKILINK_RE.captures_iter(text) {
        let embed = !caps
            .get(1)
            .expect("wikilink pattern has a marker group")
            .as_str()
            .is_empty();
        let inner = caps.get(2).expect("wikilink pattern has a target group");
        // Anything after `|` is display text; the target stops before it.
        let target_text = match inner.as_str().find('|') {
            Some(idx) => &inner.as_str()[..idx],
            None => inner.as_str(),
        };
        let name = target_text.trim();
        if name.is_empty() || name.contains('/') {
            tracing::debug!(
                "Skipping malformed embed target {:?} in {}",
                inner.as_str(),
                doc_path
            );
            continue;
        }
        // A bare wikilink references an attachment only when it names a
        // file; extensionless wikilinks are topic links.
        if !embed && split_name(name).1.is_none() {
            continue;
        }
        let span = inner.start()..inner.start() + target_text.len();
        refs.push(Reference {
            source: doc_path.to_string(),
            target: join_rel(attachments_prefix, name),
            raw: target_text.to_string(),
            span,
            form: RefForm::Embed,
        });
    }

    for (event, range) in MdParser::new_ext(text, scanner_md_options()).into_offset_iter() {
        let dest_url = match event {
            MdEvent::Start(MdTag::Link {
                link_type: LinkType::Inline,
                dest_url,
                ..
            })
            | MdEvent::Start(MdTag::Image {
                link_type: LinkType::Inline,
                dest_url,
                ..
            }) => dest_url,
            _ => continue,
        };
        if dest_url.is_empty()
            || dest_url.contains("://")
            || dest_url.starts_with('#')
            || dest_url.starts_with("mailto:")
        {
            continue;
        }
        let Some(span) = locate_target(text, &range, dest_url.as_ref()) else {
            // Escaped or rewritten destinations cannot be mapped back to a
            // source span, so they are omitted rather than guessed at.
            tracing::debug!("Could not locate span for link target {dest_url:?} in {doc_path}");
            continue;
        };
        let raw = text[span.clone()].to_string();
        let target = if raw.starts_with(&format!("{attachments_prefix}/")) {
            normalize(&raw)
        } else {
            normalize(&join_rel(doc_dir, &raw))
        };
        refs.push(Reference {
            source: doc_path.to_string(),
            target,
            raw,
            span,
            form: RefForm::Inline,
        });
    }

    refs.sort_by_key(|r| r.span.start);
    refs
}

/// Map a parsed destination back to its byte span inside `[label](path)`.
fn locate_target(text: &str, link_range: &Range<usize>, dest: &str) -> Option<Range<usize>> {
    let raw = &text[link_range.clone()];
    let open = raw.rfind("](")?;
    let rel = raw[open + 2..].find(dest)?;
    let start = link_range.start + open + 2 + rel;
    Some(start..start + dest.len())
}
