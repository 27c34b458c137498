use super::*;

/// Permanent deletion of a single entry. The filesystem implementation is
/// the only one used outside tests.
pub trait EntryRemover: Send + Sync {
    fn remove(&self, path: &Path, entry_kind: EntryKind) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsEntryRemover;

impl EntryRemover for FsEntryRemover {
    fn remove(&self, path: &Path, entry_kind: EntryKind) -> io::Result<()> {
        match entry_kind {
            EntryKind::Directory => fs::remove_dir_all(path),
            EntryKind::File | EntryKind::Symlink => fs::remove_file(path),
        }
    }
}

pub fn execute_plan(
    plan: &RemovalPlan,
    mode: RemovalMode,
    staging: &StagingArea,
    app_name: &str,
    cancel: &CancelFlag,
) -> AppResult<RemovalResult> {
    execute_plan_with(plan, mode, staging, app_name, cancel, &FsEntryRemover)
}

/// Carries out a plan item by item. One failing item never stops the rest;
/// every item ends up with exactly one outcome. Cancellation is honoured
/// between items and marks the remainder as skipped.
///
/// Staged mode checks that the staging area can take the batch before the
/// first item is touched and fails as a whole if it cannot.
pub fn execute_plan_with(
    plan: &RemovalPlan,
    mode: RemovalMode,
    staging: &StagingArea,
    app_name: &str,
    cancel: &CancelFlag,
    remover: &dyn EntryRemover,
) -> AppResult<RemovalResult> {
    let mut batch = match mode {
        RemovalMode::Staged if !plan.is_empty() => {
            let sizes = plan
                .items()
                .iter()
                .map(|item| (item.candidate.path.clone(), item.candidate.size_bytes))
                .collect::<Vec<_>>();
            staging.ensure_capacity(&sizes)?;
            Some(staging.open_batch(app_name, now_unix_millis())?)
        }
        _ => None,
    };

    let mut result = RemovalResult {
        mode,
        batch_id: None,
        items: Vec::with_capacity(plan.len()),
        reclaimed_bytes: 0,
        cancelled: false,
    };

    for item in plan.items() {
        let candidate = &item.candidate;
        let mut staged_path = None;
        let outcome = if cancel.is_cancelled() {
            result.cancelled = true;
            RemovalOutcome::Skipped {
                reason: SkipReason::Cancelled,
            }
        } else if let Err(outcome) = verify_unchanged(candidate) {
            outcome
        } else {
            let removed = match batch.as_mut() {
                Some(batch) => match batch.stage(
                    &candidate.path,
                    candidate.entry_kind,
                    candidate.size_bytes,
                    now_unix_millis(),
                ) {
                    Ok(path) => {
                        staged_path = Some(path);
                        Ok(())
                    }
                    Err(failure) => {
                        staged_path = failure.staged_path;
                        Err(failure.error)
                    }
                },
                None => remover.remove(&candidate.path, candidate.entry_kind),
            };
            match removed {
                Ok(()) => RemovalOutcome::Removed,
                Err(error) => failure_outcome(&error),
            }
        };

        match &outcome {
            RemovalOutcome::Removed => {
                result.reclaimed_bytes = result.reclaimed_bytes.saturating_add(candidate.size_bytes);
            }
            RemovalOutcome::Failed { reason, detail } => {
                tracing::warn!(
                    event = "removal_item_failed",
                    path = %sanitize_path(&candidate.path),
                    reason = ?reason,
                    detail = %detail
                );
            }
            RemovalOutcome::Skipped { reason } => {
                tracing::info!(
                    event = "removal_item_skipped",
                    path = %sanitize_path(&candidate.path),
                    reason = ?reason
                );
            }
        }
        result.items.push(RemovalItemResult {
            path: candidate.path.clone(),
            entry_kind: candidate.entry_kind,
            size_bytes: candidate.size_bytes,
            outcome,
            staged_path,
        });
    }

    if let Some(batch) = batch {
        if batch.discard_if_empty() {
            tracing::debug!(event = "staging_batch_discarded", batch_id = batch.batch_id());
        } else {
            result.batch_id = Some(batch.batch_id().to_string());
        }
    }

    tracing::info!(
        event = "removal_completed",
        mode = mode.as_str(),
        batch_id = result.batch_id.as_deref().unwrap_or_default(),
        removed = result.removed_count(),
        skipped = result.skipped_count(),
        failed = result.failed_count(),
        reclaimed_bytes = result.reclaimed_bytes,
        cancelled = result.cancelled
    );
    Ok(result)
}

/// The entry must still exist with the kind it had at scan time.
fn verify_unchanged(candidate: &Candidate) -> Result<(), RemovalOutcome> {
    let meta = match fs::symlink_metadata(&candidate.path) {
        Ok(meta) => meta,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(RemovalOutcome::Skipped {
                reason: SkipReason::NotFound,
            });
        }
        Err(error) => return Err(failure_outcome(&error)),
    };
    if EntryKind::from_file_type(meta.file_type()) != Some(candidate.entry_kind) {
        tracing::warn!(
            event = "removal_candidate_stale",
            path = %sanitize_path(&candidate.path),
            expected = candidate.entry_kind.as_str()
        );
        return Err(RemovalOutcome::Skipped {
            reason: SkipReason::StaleCandidate,
        });
    }
    Ok(())
}

fn failure_outcome(error: &io::Error) -> RemovalOutcome {
    let reason = if error.kind() == io::ErrorKind::PermissionDenied {
        FailureReason::PermissionDenied
    } else {
        FailureReason::Io
    };
    RemovalOutcome::Failed {
        reason,
        detail: error.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/removal/executor_tests.rs"]
mod executor_tests;
