//! Reorganization Planner: turns intents into an ordered, side-effect-free
//! plan.
//!
//! Planning is a pure function of the intents and the index. Conflicting
//! intents for the same source path are resolved latest-wins, with superseded
//! intents carried through as skip steps so nothing is silently dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::RefileError,
    index::CorpusIndex,
    naming,
    paths::{file_name, join_rel, parent_dir, split_name},
    scanner::RefForm,
};

pub const RATIONALE_SOURCE_MISSING: &str = "source-missing";
pub const RATIONALE_SUPERSEDED: &str = "superseded";
pub const RATIONALE_ALREADY_NAMED: &str = "already-named";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    RenameAttachment {
        path: String,
        suggested_name: String,
    },
    MoveDocument {
        path: String,
        target_dir: String,
        suggested_title: String,
    },
}

impl Intent {
    pub fn old_path(&self) -> &str {
        match self {
            Intent::RenameAttachment { path, .. } => path,
            Intent::MoveDocument { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    RenameAttachment,
    MoveDocument,
    Skip,
}

/// One atomic rename/move plus its obligated downstream document rewrites.
/// Immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub kind: StepKind,
    pub old_path: String,
    pub new_path: String,
    pub rationale: String,
    /// Documents that must be text-rewritten when this step is applied. For
    /// a document move this includes the moved document itself when its
    /// relative position to the attachment root changes.
    pub rewrites: Vec<String>,
}

impl PlanStep {
    fn skip(old_path: &str, rationale: &str) -> PlanStep {
        PlanStep {
            kind: StepKind::Skip,
            old_path: old_path.to_string(),
            new_path: old_path.to_string(),
            rationale: rationale.to_string(),
            rewrites: vec![],
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// True when every step is a skip, the planner's idempotent fixpoint.
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|s| s.kind == StepKind::Skip)
    }

    /// No two non-skip steps may write the same `old_path` or `new_path`.
    /// A violation is a planning bug, not a runtime race.
    pub fn validate(&self) -> Result<(), RefileError> {
        let mut old_paths = BTreeSet::new();
        let mut new_paths = BTreeSet::new();
        for step in self.steps.iter().filter(|s| s.kind != StepKind::Skip) {
            if !old_paths.insert(&step.old_path) {
                return Err(RefileError::Plan(format!(
                    "Duplicate old_path in plan: {}",
                    step.old_path
                )));
            }
            if !new_paths.insert(&step.new_path) {
                return Err(RefileError::Plan(format!(
                    "Duplicate new_path in plan: {}",
                    step.new_path
                )));
            }
        }
        Ok(())
    }
}

/// Produce an ordered plan for `intents` against `index`. Pure: the index is
/// never mutated and no disk is touched, so the same inputs always yield the
/// same plan.
pub fn plan(intents: &[Intent], index: &CorpusIndex) -> Plan {
    // Latest intent for an old_path wins; earlier ones become skips.
    let latest: BTreeMap<&str, usize> = intents
        .iter()
        .enumerate()
        .map(|(idx, intent)| (intent.old_path(), idx))
        .collect();

    let mut reserved: BTreeSet<String> = BTreeSet::new();
    let mut steps = Vec::with_capacity(intents.len());
    for (idx, intent) in intents.iter().enumerate() {
        let old_path = intent.old_path();
        if latest[old_path] != idx {
            tracing::debug!("Intent for {old_path} superseded by a later intent");
            steps.push(PlanStep::skip(old_path, RATIONALE_SUPERSEDED));
            continue;
        }
        if !index.exists(old_path) {
            steps.push(PlanStep::skip(old_path, RATIONALE_SOURCE_MISSING));
            continue;
        }
        let step = match intent {
            Intent::RenameAttachment {
                path,
                suggested_name,
            } => plan_rename(path, suggested_name, index, &reserved),
            Intent::MoveDocument {
                path,
                target_dir,
                suggested_title,
            } => plan_move(path, target_dir, suggested_title, index, &reserved),
        };
        if step.kind != StepKind::Skip {
            reserved.insert(step.new_path.clone());
        }
        steps.push(step);
    }

    let plan = Plan { steps };
    debug_assert!(plan.validate().is_ok());
    plan
}

fn plan_rename(
    path: &str,
    suggested_name: &str,
    index: &CorpusIndex,
    reserved: &BTreeSet<String>,
) -> PlanStep {
    let dir = parent_dir(path);
    // Preserve the current extension when the suggestion lacks one.
    let mut candidate = suggested_name.to_string();
    if split_name(file_name(&candidate)).1.is_none() {
        if let (_, Some(ext)) = split_name(file_name(path)) {
            candidate = format!("{candidate}.{ext}");
        }
    }
    let final_name = naming::resolve_in(dir, &candidate, Some(path), index, reserved);
    let new_path = join_rel(dir, &final_name);
    if new_path == path {
        return PlanStep::skip(path, RATIONALE_ALREADY_NAMED);
    }
    PlanStep {
        kind: StepKind::RenameAttachment,
        old_path: path.to_string(),
        new_path,
        rationale: format!("canonical name for suggestion {suggested_name:?}"),
        rewrites: index.references_to(path).to_vec(),
    }
}

fn plan_move(
    path: &str,
    target_dir: &str,
    suggested_title: &str,
    index: &CorpusIndex,
    reserved: &BTreeSet<String>,
) -> PlanStep {
    let candidate = if suggested_title.ends_with(".md") {
        suggested_title.to_string()
    } else {
        format!("{suggested_title}.md")
    };
    let final_name = naming::resolve_in(target_dir, &candidate, Some(path), index, reserved);
    let new_path = join_rel(target_dir, &final_name);
    if new_path == path {
        return PlanStep::skip(path, RATIONALE_ALREADY_NAMED);
    }

    let mut rewrites = index.references_to(path).to_vec();
    // Document-relative links break when the document's position relative to
    // the corpus root changes; embed and attachment-rooted links do not.
    let position_changes = parent_dir(path) != target_dir;
    let has_relative_refs = index
        .document(path)
        .map(|doc| {
            let prefix = format!("{}/", index.layout().attachments_prefix());
            doc.references
                .iter()
                .any(|r| r.form == RefForm::Inline && !r.raw.starts_with(&prefix))
        })
        .unwrap_or(false);
    if position_changes && has_relative_refs {
        rewrites.push(path.to_string());
    }

    PlanStep {
        kind: StepKind::MoveDocument,
        old_path: path.to_string(),
        new_path,
        rationale: format!("move to {target_dir} as {suggested_title:?}"),
        rewrites,
    }
}
