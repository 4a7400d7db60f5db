//! Transactional Executor: applies a plan step by step.
//!
//! Steps run strictly in plan order. Each step moves one file, rewrites the
//! obligated referencing documents span-by-span, and updates the in-memory
//! index synchronously with every disk mutation. Failures are recovered
//! per step and aggregated into the [`ExecutionReport`]; a batch is never
//! aborted by a single step, and an already-moved file is recognized as an
//! applied step on rerun. Recovery is forward-only: a moved file is never
//! rolled back, because the rollback itself could collide with an
//! intervening external change.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    fs,
    io::Write as IoWrite,
    ops::Range,
    path::Path,
};
use tempfile::NamedTempFile;

use crate::{
    error::RefileError,
    index::CorpusIndex,
    paths::{file_name, parent_dir, relative_from, replace_file_name},
    planner::{Plan, PlanStep, StepKind},
    scanner::RefForm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Succeeded,
    /// The source was already at its destination; a rerun after a prior
    /// (possibly partial) execution, not an error.
    AlreadyApplied,
    Skipped,
    Failed,
    /// The file move succeeded but one or more document rewrites did not.
    PartiallyFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: PlanStep,
    pub status: StepStatus,
    pub reason: Option<String>,
    /// Documents still pointing at the old path, flagged for follow-up.
    pub dangling: Vec<String>,
}

/// The sole externally consumed result of a batch. A CLI or agent layer
/// renders it; the core only aggregates.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub steps: Vec<StepReport>,
    pub documents_touched: BTreeSet<String>,
}

impl ExecutionReport {
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// True when no step failed outright or partially.
    pub fn is_clean(&self) -> bool {
        self.count(StepStatus::Failed) == 0 && self.count(StepStatus::PartiallyFailed) == 0
    }

    /// All documents flagged as still pointing at an old path.
    pub fn dangling(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|s| s.dangling.iter().map(String::as_str))
            .collect()
    }
}

impl Display for ExecutionReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} already applied, {} skipped, {} failed, {} partially failed; {} documents touched",
            self.count(StepStatus::Succeeded),
            self.count(StepStatus::AlreadyApplied),
            self.count(StepStatus::Skipped),
            self.count(StepStatus::Failed),
            self.count(StepStatus::PartiallyFailed),
            self.documents_touched.len()
        )
    }
}

/// Apply `plan` to disk and to `index`. Never returns early: every step is
/// attempted and reported.
pub fn execute(plan: &Plan, index: &mut CorpusIndex) -> ExecutionReport {
    execute_with_cancel(plan, index, || false)
}

/// [`execute`] with a cooperative cancellation hook, polled between steps
/// (never mid-step). On cancellation every completed step stays applied and
/// the remaining steps are reported as skipped, so partial progress is
/// always consistent.
pub fn execute_with_cancel(
    plan: &Plan,
    index: &mut CorpusIndex,
    should_cancel: impl Fn() -> bool,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    let mut cancelled = false;
    for step in &plan.steps {
        if !cancelled && should_cancel() {
            tracing::info!("Batch cancelled; leaving completed steps applied");
            cancelled = true;
        }
        let step_report = if cancelled {
            StepReport {
                step: step.clone(),
                status: StepStatus::Skipped,
                reason: Some("cancelled".to_string()),
                dangling: vec![],
            }
        } else if step.kind == StepKind::Skip {
            tracing::debug!("Skipping {}: {}", step.old_path, step.rationale);
            StepReport {
                step: step.clone(),
                status: StepStatus::Skipped,
                reason: Some(step.rationale.clone()),
                dangling: vec![],
            }
        } else {
            apply_step(step, index, &mut report.documents_touched)
        };
        report.steps.push(step_report);
    }
    if !cancelled {
        tracing::info!("Batch complete: {report}");
    }
    report
}

fn apply_step(
    step: &PlanStep,
    index: &mut CorpusIndex,
    touched: &mut BTreeSet<String>,
) -> StepReport {
    let abs_old = index.abs_path(&step.old_path);
    let abs_new = index.abs_path(&step.new_path);

    if !abs_old.exists() {
        return if index.exists(&step.new_path) || abs_new.exists() {
            StepReport {
                step: step.clone(),
                status: StepStatus::AlreadyApplied,
                reason: Some("source already at destination".to_string()),
                dangling: vec![],
            }
        } else {
            failed(step, format!("source missing at execution time: {}", step.old_path))
        };
    }
    // The plan was collision-free at planning time; an occupied destination
    // here is a race against external mutation.
    if abs_new.exists() {
        return failed(
            step,
            format!("destination occupied at execution time: {}", step.new_path),
        );
    }
    if let Err(e) = abs_new
        .parent()
        .map(fs::create_dir_all)
        .transpose()
        .map_err(RefileError::from)
        .and_then(|_| fs::rename(&abs_old, &abs_new).map_err(RefileError::from))
    {
        return failed(step, format!("move failed: {e}"));
    }
    tracing::debug!("Moved {} -> {}", step.old_path, step.new_path);

    let mut dangling = Vec::new();
    let mut reasons = Vec::new();

    // For a document move, rewrite the moved document's own relative links
    // from its prior state before rekeying it in the index.
    if step.kind == StepKind::MoveDocument {
        if step.rewrites.contains(&step.old_path) {
            match rewrite_moved_document(step, index) {
                Ok(Some(content)) => {
                    index.record_document_move(&step.old_path, &step.new_path);
                    index.refresh_document(&step.new_path, content);
                    touched.insert(step.new_path.clone());
                }
                Ok(None) => index.record_document_move(&step.old_path, &step.new_path),
                Err(e) => {
                    index.record_document_move(&step.old_path, &step.new_path);
                    dangling.push(step.new_path.clone());
                    reasons.push(format!("{}: {e}", step.new_path));
                }
            }
        } else {
            index.record_document_move(&step.old_path, &step.new_path);
        }
    } else {
        index.record_rename(&step.old_path, &step.new_path);
    }

    for doc_path in step.rewrites.iter().filter(|p| **p != step.old_path) {
        match rewrite_targets(doc_path, &step.old_path, &step.new_path, index) {
            Ok(Some(written)) => {
                touched.insert(written);
            }
            Ok(None) => {
                tracing::debug!("No spans targeting {} left in {doc_path}", step.old_path);
            }
            Err(e) => {
                dangling.push(doc_path.clone());
                reasons.push(format!("{doc_path}: {e}"));
            }
        }
    }

    if dangling.is_empty() {
        StepReport {
            step: step.clone(),
            status: StepStatus::Succeeded,
            reason: None,
            dangling,
        }
    } else {
        tracing::warn!(
            "Step {} -> {} partially failed; documents still pointing at old path: {:?}",
            step.old_path,
            step.new_path,
            dangling
        );
        StepReport {
            step: step.clone(),
            status: StepStatus::PartiallyFailed,
            reason: Some(reasons.join("; ")),
            dangling,
        }
    }
}

fn failed(step: &PlanStep, reason: String) -> StepReport {
    tracing::warn!("Step {} -> {} failed: {reason}", step.old_path, step.new_path);
    StepReport {
        step: step.clone(),
        status: StepStatus::Failed,
        reason: Some(reason),
        dangling: vec![],
    }
}

/// Rewrite the recorded spans in `doc_path` that target `old_target` so they
/// point at `new_target`, preserving every other byte.
fn rewrite_targets(
    doc_path: &str,
    old_target: &str,
    new_target: &str,
    index: &mut CorpusIndex,
) -> Result<Option<String>, RefileError> {
    let new_content = {
        let doc = index.document(doc_path).ok_or_else(|| {
            RefileError::NotFound(format!("referencing document not in index: {doc_path}"))
        })?;
        let edits: Vec<(Range<usize>, String)> = doc
            .references
            .iter()
            .filter(|r| r.target == old_target)
            .map(|r| {
                let replacement = match r.form {
                    RefForm::Embed => file_name(new_target).to_string(),
                    // A plain rename swaps the final segment in place, so the
                    // author's original path style survives.
                    RefForm::Inline if parent_dir(old_target) == parent_dir(new_target) => {
                        replace_file_name(&r.raw, file_name(new_target))
                    }
                    RefForm::Inline => relative_from(parent_dir(doc_path), new_target),
                };
                (r.span.clone(), replacement)
            })
            .collect();
        if edits.is_empty() {
            return Ok(None);
        }
        splice(&doc.raw_content, edits)
    };
    write_atomic(&index.abs_path(doc_path), &new_content)?;
    index.refresh_document(doc_path, new_content);
    Ok(Some(doc_path.to_string()))
}

/// Recompute the moved document's own relative link text for its new
/// location. Targets were resolved from the old location, which is exactly
/// what the new relative text must keep pointing at. Returns the rewritten
/// content without touching the index; the caller rekeys and refreshes.
fn rewrite_moved_document(
    step: &PlanStep,
    index: &CorpusIndex,
) -> Result<Option<String>, RefileError> {
    let attachment_prefix = format!("{}/", index.layout().attachments_prefix());
    let new_dir = parent_dir(&step.new_path);
    let new_content = {
        let doc = index.document(&step.old_path).ok_or_else(|| {
            RefileError::NotFound(format!("moved document not in index: {}", step.old_path))
        })?;
        let edits: Vec<(Range<usize>, String)> = doc
            .references
            .iter()
            .filter(|r| r.form == RefForm::Inline && !r.raw.starts_with(&attachment_prefix))
            .map(|r| (r.span.clone(), relative_from(new_dir, &r.target)))
            .collect();
        if edits.is_empty() {
            return Ok(None);
        }
        splice(&doc.raw_content, edits)
    };
    write_atomic(&index.abs_path(&step.new_path), &new_content)?;
    Ok(Some(new_content))
}

/// Replace the given spans, keeping all other bytes. Spans are applied in
/// ascending order; an edit overlapping an earlier one is dropped rather
/// than corrupting the output.
fn splice(content: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0usize;
    for (range, replacement) in edits {
        if range.start < cursor {
            tracing::warn!("Dropping overlapping rewrite span {range:?}");
            continue;
        }
        out.push_str(&content[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);
    out
}

/// Write through a scoped temporary file in the destination directory with
/// atomic replace on success. The temporary is cleaned up on every exit
/// path, so a crash mid-write never leaves a truncated document.
fn write_atomic(path: &Path, content: &str) -> Result<(), RefileError> {
    let dir = path
        .parent()
        .ok_or_else(|| RefileError::Write(format!("No parent directory for {path:?}")))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_preserves_other_bytes() {
        let content = "a ![[old.png]] b ![[old.png]] c";
        let edits = vec![
            (5..12, "new.png".to_string()),
            (20..27, "new.png".to_string()),
        ];
        assert_eq!(splice(content, edits), "a ![[new.png]] b ![[new.png]] c");
    }

    #[test]
    fn test_splice_drops_overlap() {
        let content = "0123456789";
        let edits = vec![(2..5, "X".to_string()), (4..6, "Y".to_string())];
        assert_eq!(splice(content, edits), "01X56789");
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.md");
        std::fs::write(&target, "old").unwrap();
        write_atomic(&target, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        // No stray temporary artifacts.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
