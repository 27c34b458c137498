use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sysinfo::{Disk, Disks};
use uuid::Uuid;
use walkdir::WalkDir;

const MANIFEST_FILE_NAME: &str = "manifest.json";
const ITEMS_DIR_NAME: &str = "items";
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedEntry {
    pub original_path: PathBuf,
    pub staged_path: PathBuf,
    pub entry_kind: EntryKind,
    pub size_bytes: u64,
    pub staged_at_ms: i64,
    #[serde(default)]
    pub restored: bool,
    /// The source could not be fully deleted after it was copied in; what
    /// is left at `original_path` is a subset of the staged copy.
    #[serde(default)]
    pub partial_source: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagingManifest {
    version: u32,
    batch_id: String,
    app_name: String,
    created_at_ms: i64,
    expires_at_ms: i64,
    #[serde(default)]
    entries: Vec<StagedEntry>,
}

impl StagingManifest {
    fn summary(&self) -> StagedBatchSummary {
        let pending = self.entries.iter().filter(|entry| !entry.restored);
        StagedBatchSummary {
            batch_id: self.batch_id.clone(),
            app_name: self.app_name.clone(),
            created_at_ms: self.created_at_ms,
            expires_at_ms: self.expires_at_ms,
            item_count: pending.clone().count(),
            total_bytes: pending
                .map(|entry| entry.size_bytes)
                .fold(0u64, u64::saturating_add),
        }
    }
}

/// Holding area for staged removals. Each batch lives in
/// `<root>/<batch-id>/` with a `manifest.json` and the moved entries under
/// `items/<n>/`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    retention: Duration,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            root: root.into(),
            retention,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Creates the batch directory and writes an empty manifest, so a
    /// staging area that cannot take the batch fails before anything moves.
    pub(crate) fn open_batch(&self, app_name: &str, now_ms: i64) -> AppResult<StagingBatch> {
        let batch_id = Uuid::new_v4().to_string();
        let dir = self.root.join(batch_id.as_str());
        fs::create_dir_all(dir.join(ITEMS_DIR_NAME))
            .with_code(
                EngineErrorCode::StagingFailure.as_str(),
                "cannot create staging batch directory",
            )
            .with_ctx("path", dir.display().to_string())?;
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let batch = StagingBatch {
            dir,
            manifest: StagingManifest {
                version: MANIFEST_VERSION,
                batch_id,
                app_name: app_name.to_string(),
                created_at_ms: now_ms,
                expires_at_ms: now_ms.saturating_add(retention_ms),
                entries: Vec::new(),
            },
        };
        batch.persist().map_err(|error| {
            let _ = fs::remove_dir_all(&batch.dir);
            error.with_code(
                EngineErrorCode::StagingFailure.as_str(),
                "staging manifest is not writable",
            )
        })?;
        Ok(batch)
    }

    /// Fails when entries living on other volumes would not fit into the
    /// free space of the staging volume. Same-volume entries are renamed and
    /// need no space.
    pub fn ensure_capacity(&self, items: &[(PathBuf, u64)]) -> AppResult<()> {
        let disks = Disks::new_with_refreshed_list();
        let Some(staging_disk) = disk_for(&disks, &self.root) else {
            tracing::debug!(event = "staging_disk_unknown", root = %sanitize_path(&self.root));
            return Ok(());
        };
        let needed = items
            .iter()
            .filter(|(path, _)| {
                disk_for(&disks, path).map(Disk::mount_point) != Some(staging_disk.mount_point())
            })
            .map(|(_, size)| *size)
            .fold(0u64, u64::saturating_add);
        let available = staging_disk.available_space();
        if needed > available {
            return Err(engine_error(
                EngineErrorCode::StagingFailure,
                "not enough free space in the staging area",
            )
            .with_context("neededBytes", needed.to_string())
            .with_context("availableBytes", available.to_string()));
        }
        Ok(())
    }

    pub fn list_batches(&self) -> AppResult<Vec<StagedBatchSummary>> {
        let mut batches = self
            .batch_dirs()?
            .into_iter()
            .filter_map(|dir| match read_manifest(&dir) {
                Ok(manifest) => Some(manifest.summary()),
                Err(error) => {
                    tracing::warn!(
                        event = "staging_manifest_skipped",
                        dir = %sanitize_path(&dir),
                        error = %error
                    );
                    None
                }
            })
            .collect::<Vec<_>>();
        batches.sort_by(|left, right| {
            right
                .created_at_ms
                .cmp(&left.created_at_ms)
                .then(left.batch_id.cmp(&right.batch_id))
        });
        Ok(batches)
    }

    /// Moves every staged entry of a batch back to its original location.
    /// Entries are restored in reverse staging order so that directories
    /// reappear before their former children. The batch directory is removed
    /// once nothing is left in it.
    pub fn restore(&self, batch_id: &str, now_ms: i64) -> AppResult<RestoreResult> {
        let dir = self.batch_dir(batch_id)?;
        let mut manifest = read_manifest(&dir)?;
        let expired = now_ms >= manifest.expires_at_ms;
        let mut items = Vec::with_capacity(manifest.entries.len());

        for index in (0..manifest.entries.len()).rev() {
            let outcome = restore_entry(&mut manifest.entries[index], expired);
            let entry = &manifest.entries[index];
            if let RestoreOutcome::Failed { reason, detail } = &outcome {
                tracing::warn!(
                    event = "staging_restore_item_failed",
                    batch_id = %manifest.batch_id,
                    path = %sanitize_path(&entry.original_path),
                    reason = ?reason,
                    detail = %detail
                );
            }
            items.push(RestoreItemResult {
                original_path: entry.original_path.clone(),
                outcome,
            });
            if let Err(error) = write_manifest(&dir, &manifest) {
                tracing::warn!(
                    event = "staging_manifest_update_failed",
                    batch_id = %manifest.batch_id,
                    error = %error
                );
            }
        }

        let result = RestoreResult {
            batch_id: manifest.batch_id.clone(),
            items,
        };
        if manifest.entries.iter().all(|entry| entry.restored) {
            if let Err(error) = fs::remove_dir_all(&dir) {
                tracing::warn!(
                    event = "staging_batch_cleanup_failed",
                    dir = %sanitize_path(&dir),
                    error = %error
                );
            }
        }
        tracing::info!(
            event = "staging_restore_completed",
            batch_id = %result.batch_id,
            restored = result.restored_count(),
            complete = result.is_complete()
        );
        Ok(result)
    }

    /// Deletes every batch whose retention window has passed.
    pub fn purge_expired(&self, now_ms: i64) -> AppResult<PurgeReport> {
        let mut report = PurgeReport::default();
        for dir in self.batch_dirs()? {
            let manifest = match read_manifest(&dir) {
                Ok(manifest) => manifest,
                Err(error) => {
                    tracing::warn!(
                        event = "staging_manifest_skipped",
                        dir = %sanitize_path(&dir),
                        error = %error
                    );
                    continue;
                }
            };
            if now_ms < manifest.expires_at_ms {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    report.reclaimed_bytes = report
                        .reclaimed_bytes
                        .saturating_add(manifest.summary().total_bytes);
                    report.purged_batches.push(manifest.batch_id);
                }
                Err(error) => {
                    tracing::warn!(
                        event = "staging_purge_failed",
                        dir = %sanitize_path(&dir),
                        error = %error
                    );
                }
            }
        }
        report.purged_batches.sort();
        if !report.purged_batches.is_empty() {
            tracing::info!(
                event = "staging_purged",
                batches = report.purged_batches.len(),
                reclaimed_bytes = report.reclaimed_bytes
            );
        }
        Ok(report)
    }

    fn batch_dir(&self, batch_id: &str) -> AppResult<PathBuf> {
        let not_found = || {
            engine_error(
                EngineErrorCode::RestoreBatchNotFound,
                "no staged batch with this id",
            )
            .with_context("batchId", batch_id.to_string())
        };
        let parsed = Uuid::parse_str(batch_id.trim()).map_err(|_| not_found())?;
        let dir = self.root.join(parsed.to_string());
        if !dir.join(MANIFEST_FILE_NAME).is_file() {
            return Err(not_found());
        }
        Ok(dir)
    }

    fn batch_dirs(&self) -> AppResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => {
                return Err(AppError::new(
                    EngineErrorCode::ManifestReadFailed.as_str(),
                    "cannot list the staging area",
                )
                .with_source(error)
                .with_context("path", self.root.display().to_string()));
            }
        };
        let mut dirs = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .and_then(|value| value.to_str())
                        .is_some_and(|value| Uuid::parse_str(value).is_ok())
            })
            .collect::<Vec<_>>();
        dirs.sort();
        Ok(dirs)
    }
}

/// Why staging an entry failed. `staged_path` is set when a complete copy
/// was recorded in the batch before the failure.
#[derive(Debug)]
pub(crate) struct StageFailure {
    pub(crate) error: io::Error,
    pub(crate) staged_path: Option<PathBuf>,
}

impl StageFailure {
    fn untouched(error: io::Error) -> Self {
        Self {
            error,
            staged_path: None,
        }
    }
}

/// Filesystem steps of a staging move.
pub(crate) trait MoveOps {
    fn rename(&self, source: &Path, destination: &Path) -> io::Result<()>;
    fn remove_source(&self, source: &Path) -> io::Result<()>;
}

pub(crate) struct FsMoveOps;

impl MoveOps for FsMoveOps {
    fn rename(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::rename(source, destination)
    }

    fn remove_source(&self, source: &Path) -> io::Result<()> {
        remove_existing(source)
    }
}

/// A batch being filled by the executor.
#[derive(Debug)]
pub(crate) struct StagingBatch {
    dir: PathBuf,
    manifest: StagingManifest,
}

impl StagingBatch {
    pub(crate) fn batch_id(&self) -> &str {
        self.manifest.batch_id.as_str()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.manifest.entries.is_empty()
    }

    /// Moves `path` into the batch and records it.
    pub(crate) fn stage(
        &mut self,
        path: &Path,
        entry_kind: EntryKind,
        size_bytes: u64,
        now_ms: i64,
    ) -> Result<PathBuf, StageFailure> {
        self.stage_with(path, entry_kind, size_bytes, now_ms, &FsMoveOps)
    }

    /// A same-volume rename is recorded after it happened and undone when
    /// the manifest cannot be written. Across volumes the copy is recorded
    /// before the source is deleted, so a source that only partly goes away
    /// still has a restorable copy in the batch.
    pub(crate) fn stage_with(
        &mut self,
        path: &Path,
        entry_kind: EntryKind,
        size_bytes: u64,
        now_ms: i64,
        ops: &dyn MoveOps,
    ) -> Result<PathBuf, StageFailure> {
        let file_name = path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_else(|| "entry".into());
        let slot_dir = self
            .dir
            .join(ITEMS_DIR_NAME)
            .join(self.manifest.entries.len().to_string());
        fs::create_dir_all(&slot_dir).map_err(StageFailure::untouched)?;
        let staged_path = slot_dir.join(file_name);
        let entry = StagedEntry {
            original_path: path.to_path_buf(),
            staged_path: staged_path.clone(),
            entry_kind,
            size_bytes,
            staged_at_ms: now_ms,
            restored: false,
            partial_source: false,
        };

        match ops.rename(path, &staged_path) {
            Ok(()) => {
                if let Err(error) = self.record(entry) {
                    if let Err(rollback) = ops.rename(&staged_path, path) {
                        tracing::error!(
                            event = "staging_rollback_failed",
                            path = %sanitize_path(path),
                            error = %rollback
                        );
                    }
                    return Err(StageFailure::untouched(error));
                }
                Ok(staged_path)
            }
            Err(error) if is_cross_device_rename(&error) => self.stage_by_copy(entry, ops),
            Err(error) => Err(StageFailure::untouched(error)),
        }
    }

    fn stage_by_copy(
        &mut self,
        entry: StagedEntry,
        ops: &dyn MoveOps,
    ) -> Result<PathBuf, StageFailure> {
        let source = entry.original_path.clone();
        let staged_path = entry.staged_path.clone();
        tracing::debug!(
            event = "staging_cross_device_move",
            path = %sanitize_path(&source)
        );
        let copied = copy_tree(&source, &staged_path).and_then(|()| self.record(entry));
        if let Err(error) = copied {
            discard_copy(&staged_path);
            return Err(StageFailure::untouched(error));
        }

        if let Err(error) = ops.remove_source(&source) {
            if let Some(recorded) = self.manifest.entries.last_mut() {
                recorded.partial_source = true;
            }
            if let Err(persist) = self.persist() {
                tracing::warn!(
                    event = "staging_manifest_update_failed",
                    batch_id = %self.manifest.batch_id,
                    error = %persist
                );
            }
            tracing::warn!(
                event = "staging_source_remnant",
                batch_id = %self.manifest.batch_id,
                path = %sanitize_path(&source),
                error = %error
            );
            return Err(StageFailure {
                error,
                staged_path: Some(staged_path),
            });
        }
        Ok(staged_path)
    }

    /// Appends `entry` and persists; the manifest never lags behind what
    /// was staged.
    fn record(&mut self, entry: StagedEntry) -> io::Result<()> {
        self.manifest.entries.push(entry);
        if let Err(error) = self.persist() {
            self.manifest.entries.pop();
            return Err(io::Error::other(error.to_string()));
        }
        Ok(())
    }

    /// Drops the batch directory when nothing was staged into it.
    pub(crate) fn discard_if_empty(&self) -> bool {
        if !self.is_empty() {
            return false;
        }
        fs::remove_dir_all(&self.dir).is_ok()
    }

    fn persist(&self) -> AppResult<()> {
        write_manifest(&self.dir, &self.manifest)
    }
}

fn restore_entry(entry: &mut StagedEntry, expired: bool) -> RestoreOutcome {
    if entry.restored {
        return RestoreOutcome::AlreadyRestored;
    }
    let staged_present = fs::symlink_metadata(&entry.staged_path).is_ok();
    let original_present = fs::symlink_metadata(&entry.original_path).is_ok();
    if !staged_present && original_present {
        entry.restored = true;
        return RestoreOutcome::AlreadyRestored;
    }
    if expired {
        return RestoreOutcome::Failed {
            reason: RestoreFailureReason::Expired,
            detail: "retention window has passed".to_string(),
        };
    }
    if original_present && !entry.partial_source {
        return RestoreOutcome::Failed {
            reason: RestoreFailureReason::TargetOccupied,
            detail: "original location is occupied".to_string(),
        };
    }
    if !staged_present {
        return RestoreOutcome::Failed {
            reason: RestoreFailureReason::StagedMissing,
            detail: "staged copy is missing".to_string(),
        };
    }
    // The remnant is a subset of the staged copy.
    if original_present
        && let Err(error) = remove_existing(&entry.original_path)
    {
        return RestoreOutcome::Failed {
            reason: RestoreFailureReason::Io,
            detail: error.to_string(),
        };
    }
    match move_path(&entry.staged_path, &entry.original_path) {
        Ok(()) => {
            entry.restored = true;
            RestoreOutcome::Restored
        }
        Err(error) => RestoreOutcome::Failed {
            reason: RestoreFailureReason::Io,
            detail: error.to_string(),
        },
    }
}

fn read_manifest(dir: &Path) -> AppResult<StagingManifest> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let content = fs::read_to_string(&path)
        .with_code(
            EngineErrorCode::ManifestReadFailed.as_str(),
            "cannot read staging manifest",
        )
        .with_ctx("path", path.display().to_string())?;
    serde_json::from_str::<StagingManifest>(content.as_str())
        .with_code(
            EngineErrorCode::ManifestReadFailed.as_str(),
            "staging manifest is malformed",
        )
        .with_ctx("path", path.display().to_string())
}

fn write_manifest(dir: &Path, manifest: &StagingManifest) -> AppResult<()> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let tmp_path = dir.join(format!("{MANIFEST_FILE_NAME}.tmp"));
    let content = serde_json::to_string_pretty(manifest).with_code(
        EngineErrorCode::ManifestWriteFailed.as_str(),
        "cannot encode staging manifest",
    )?;
    fs::write(&tmp_path, content)
        .with_code(
            EngineErrorCode::ManifestWriteFailed.as_str(),
            "cannot write staging manifest",
        )
        .with_ctx("path", tmp_path.display().to_string())?;
    fs::rename(&tmp_path, &path)
        .with_code(
            EngineErrorCode::ManifestWriteFailed.as_str(),
            "cannot replace staging manifest",
        )
        .with_ctx("path", path.display().to_string())
}

fn disk_for<'a>(disks: &'a Disks, path: &Path) -> Option<&'a Disk> {
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
}

/// Renames `source` to `destination`, falling back to copy and delete when
/// the two live on different devices.
pub(crate) fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(error) if is_cross_device_rename(&error) => {
            copy_tree(source, destination)?;
            remove_existing(source)
        }
        Err(error) => Err(error),
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn discard_copy(staged_path: &Path) {
    if fs::symlink_metadata(staged_path).is_ok()
        && let Err(error) = remove_existing(staged_path)
    {
        tracing::warn!(
            event = "staging_copy_cleanup_failed",
            path = %sanitize_path(staged_path),
            error = %error
        );
    }
}

fn is_cross_device_rename(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::CrossesDevices || error.raw_os_error() == Some(18)
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

#[cfg(test)]
#[path = "../tests/removal/staging_tests.rs"]
mod staging_tests;
