//! Residual-file discovery and safe removal for installed applications.
//!
//! Flow: [`resolve_identity`] -> [`scan`] (over a [`PathCatalog`]) ->
//! [`classify`] -> user confirmation -> [`RemovalPlan`] -> [`execute_plan`],
//! with staged removals reversible through [`StagingArea::restore`].

use remover_contracts::models::{
    ApplicationReference, Candidate, ClassifiedCandidate, EntryKind, FailureReason, Identity,
    InstalledApp, MatchMethod, OrphanEntry, PathRootKind, PurgeReport, RemovalItemResult,
    RemovalMode, RemovalOutcome, RemovalResult, RestoreFailureReason, RestoreItemResult,
    RestoreOutcome, RestoreResult, RiskReason, RiskTier, RootScope, ScanReport, ScanWarning,
    ScanWarningCode, SkipReason, StagedBatchSummary, StartupItem, StartupKind,
};
use remover_contracts::{AppError, AppResult, ResultExt};
use remover_kernel::CancelFlag;
use remover_logging::sanitize_path;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

mod catalog;
mod classifier;
mod engine;
mod error;
mod executor;
mod identity;
mod inventory;
mod manifest;
mod matcher;
mod naming;
mod plan;
mod scanner;
mod size;
mod staging;
mod startup;

#[cfg(test)]
mod test_support;

pub use catalog::{CatalogEntry, PathCatalog, ResolvedRoot};
pub use classifier::{RiskPolicy, classify, classify_candidate};
pub use engine::RemoverEngine;
pub use error::EngineErrorCode;
pub use executor::{EntryRemover, FsEntryRemover, execute_plan, execute_plan_with};
pub use identity::resolve_identity;
pub use inventory::{
    installed_bundle_roots, list_installed_apps, looks_like_bundle_id, orphan_candidate, scan_orphans,
};
pub use manifest::{BundleManifest, is_app_bundle, read_bundle_manifest};
pub use matcher::{
    EXACT_ID_CONFIDENCE, EXACT_NAME_CONFIDENCE, EntryMatch, fragment_confidence, match_entry_name,
};
pub use naming::normalize_display_name;
pub use plan::{PlannedRemoval, RemovalPlan};
pub use scanner::{DEFAULT_MAX_SCAN_DEPTH, ScanOptions, scan};
pub use size::{PathSizeComputation, format_size, path_size_bytes};
pub use staging::{StagedEntry, StagingArea};
pub use startup::{
    LaunchctlControl, ServiceControl, StartupLocation, default_startup_locations,
    disable_startup_item, find_startup_item, list_startup_items, location_of, startup_candidate,
};

use error::engine_error;
use manifest::plist_string_value;
use scanner::direct_candidate;

pub(crate) fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|duration| i64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

/// Folds `.` and `..` without touching the filesystem.
pub(crate) fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

pub(crate) fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count()
}
