use super::*;
use remover_kernel::runtime::blocking::join_error_to_app_error;
use std::sync::Arc;
use tokio::task::JoinSet;
use walkdir::WalkDir;

pub const DEFAULT_MAX_SCAN_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_depth: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_SCAN_DEPTH,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RootScan {
    pub(crate) candidates: Vec<Candidate>,
    pub(crate) warnings: Vec<ScanWarning>,
}

/// Scans every existing catalog root for entries belonging to `identity`.
///
/// Each root is an independent blocking unit. Cancellation is observed
/// before a unit starts; a cancelled scan reports `cancelled` and no
/// candidates, since a partial set is never classified.
pub async fn scan(
    identity: Arc<Identity>,
    catalog: Arc<PathCatalog>,
    options: ScanOptions,
    cancel: CancelFlag,
) -> AppResult<ScanReport> {
    let roots = catalog.resolve_roots();
    let boundaries = Arc::new(roots.iter().map(|root| root.dir.clone()).collect::<Vec<_>>());
    let known_paths = identity
        .bundle_id
        .as_deref()
        .map(|bundle_id| catalog.known_paths_for(bundle_id))
        .unwrap_or_default();
    let home = catalog.home().to_path_buf();

    let mut tasks = JoinSet::new();
    for root in roots {
        let identity = Arc::clone(&identity);
        let boundaries = Arc::clone(&boundaries);
        let cancel = cancel.clone();
        let home = home.clone();
        let known = known_paths
            .iter()
            .filter(|path| owning_root(&boundaries, path) == Some(root.dir.as_path()))
            .cloned()
            .collect::<Vec<_>>();
        tasks.spawn_blocking(move || {
            if cancel.is_cancelled() {
                return None;
            }
            let context = RootScanContext {
                boundaries: boundaries.as_slice(),
                home: home.as_path(),
                known_paths: known.as_slice(),
            };
            Some(scan_root(&identity, &root, options, &context))
        });
    }

    let mut report = ScanReport::default();
    let mut merged: HashMap<PathBuf, Candidate> = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(root_scan)) => {
                report.roots_scanned += 1;
                report.warnings.extend(root_scan.warnings);
                for candidate in root_scan.candidates {
                    merge_candidate(&mut merged, candidate);
                }
            }
            Ok(None) => report.cancelled = true,
            Err(error) => {
                let error = join_error_to_app_error("scan_root", &error);
                tracing::warn!(event = "scan_root_task_failed", error = %error);
            }
        }
    }

    if report.cancelled || cancel.is_cancelled() {
        report.cancelled = true;
        tracing::info!(
            event = "scan_cancelled",
            name = %identity.normalized_name,
            roots_scanned = report.roots_scanned
        );
        return Ok(report);
    }

    let mut candidates = merged.into_values().collect::<Vec<_>>();
    candidates.sort_by(|left, right| left.path.cmp(&right.path));
    report.candidates = candidates;
    report
        .warnings
        .sort_by(|left, right| left.path.cmp(&right.path));
    tracing::info!(
        event = "scan_completed",
        name = %identity.normalized_name,
        roots_scanned = report.roots_scanned,
        candidates = report.candidates.len(),
        warnings = report.warnings.len()
    );
    Ok(report)
}

pub(crate) struct RootScanContext<'a> {
    pub(crate) boundaries: &'a [PathBuf],
    pub(crate) home: &'a Path,
    pub(crate) known_paths: &'a [PathBuf],
}

/// Walks one root up to `options.max_depth` levels without following links.
/// A matched directory is reported as a whole and not descended into.
/// Directories named after the identity's vendor extend the bound by one
/// level below them (`Application Support/Acme/Suite/Foo`).
pub(crate) fn scan_root(
    identity: &Identity,
    root: &ResolvedRoot,
    options: ScanOptions,
    context: &RootScanContext<'_>,
) -> RootScan {
    let mut out = RootScan::default();
    let depth_bound = options.max_depth.max(1);
    let vendor = identity.vendor.as_deref();
    let mut walker = WalkDir::new(&root.dir)
        .min_depth(1)
        .max_depth(depth_bound + usize::from(vendor.is_some()))
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = walker.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(error) => {
                let path = error
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.dir.clone());
                let code = if path == root.dir {
                    ScanWarningCode::RootUnreadable
                } else {
                    ScanWarningCode::EntryUnreadable
                };
                tracing::warn!(
                    event = "scan_entry_unreadable",
                    kind = root.kind.as_str(),
                    path = %sanitize_path(&path),
                    error = %error
                );
                out.warnings.push(ScanWarning {
                    code,
                    root_kind: root.kind,
                    path,
                    detail: error.to_string(),
                });
                continue;
            }
        };
        let Some(entry_kind) = EntryKind::from_file_type(entry.file_type()) else {
            continue;
        };
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let vendor_dir = vendor.filter(|vendor| under_vendor_dir(&root.dir, entry.path(), vendor));
        if entry.depth() > depth_bound && vendor_dir.is_none() {
            if entry_kind == EntryKind::Directory {
                walker.skip_current_dir();
            }
            continue;
        }

        let is_bundle_dir = entry_kind == EntryKind::Directory && is_app_bundle(entry.path());
        let manifest_id = if is_bundle_dir {
            read_bundle_manifest(entry.path()).and_then(|manifest| manifest.bundle_id)
        } else {
            None
        };

        let Some(found) = match_entry_name(identity, name, manifest_id.as_deref()) else {
            if is_bundle_dir {
                walker.skip_current_dir();
            }
            continue;
        };
        if entry_kind == EntryKind::Directory {
            walker.skip_current_dir();
        }

        let mut evidence = vec![format!("{}:{}", found.method.as_str(), name)];
        if manifest_id.is_some() && found.method == MatchMethod::ExactId {
            evidence.push("bundle_manifest".to_string());
        }
        if let Some(vendor) = vendor_dir {
            evidence.push(format!("vendor_dir:{vendor}"));
        }
        evidence.push(format!("depth:{}", entry.depth()));
        let candidate = build_candidate(
            root,
            entry.path(),
            entry_kind,
            found,
            evidence,
            context,
            &mut out.warnings,
        );
        out.candidates.push(candidate);
    }

    for known in context.known_paths {
        if out.candidates.iter().any(|candidate| &candidate.path == known) {
            continue;
        }
        let Some(entry_kind) = EntryKind::of_path(known) else {
            continue;
        };
        let found = EntryMatch {
            method: MatchMethod::ExactId,
            confidence: EXACT_ID_CONFIDENCE,
        };
        let candidate = build_candidate(
            root,
            known,
            entry_kind,
            found,
            vec!["known_path".to_string()],
            context,
            &mut out.warnings,
        );
        out.candidates.push(candidate);
    }

    out
}

fn build_candidate(
    root: &ResolvedRoot,
    path: &Path,
    entry_kind: EntryKind,
    found: EntryMatch,
    evidence: Vec<String>,
    context: &RootScanContext<'_>,
    warnings: &mut Vec<ScanWarning>,
) -> Candidate {
    let size = path_size_bytes(path);
    if let Some((at, detail)) = size.incomplete_at {
        warnings.push(ScanWarning {
            code: ScanWarningCode::SizeIncomplete,
            root_kind: root.kind,
            path: at,
            detail,
        });
    }

    let link_target = if entry_kind == EntryKind::Symlink {
        fs::read_link(path).ok().map(|target| {
            let absolute = if target.is_absolute() {
                target
            } else {
                path.parent().unwrap_or(root.dir.as_path()).join(target)
            };
            lexical_normalize(&absolute)
        })
    } else {
        None
    };
    let link_escapes_boundary = entry_kind == EntryKind::Symlink
        && link_target
            .as_deref()
            .is_none_or(|target| owning_root(context.boundaries, target).is_none());

    Candidate {
        path: path.to_path_buf(),
        root_kind: root.kind,
        root_dir: root.dir.clone(),
        match_method: found.method,
        confidence: found.confidence,
        size_bytes: size.size_bytes,
        entry_kind,
        link_target,
        link_escapes_boundary,
        requires_elevation: requires_elevation(root, path, context.home),
        evidence,
    }
}

/// Candidate for an entry the user picked directly out of a listing (an
/// orphan, a startup item). Identified by exact id; a link counts as
/// escaping when it leaves `root`. `None` when the entry is gone.
pub(crate) fn direct_candidate(
    root: &ResolvedRoot,
    path: &Path,
    home: &Path,
    evidence: Vec<String>,
) -> Option<Candidate> {
    let entry_kind = EntryKind::of_path(path)?;
    let link_target = if entry_kind == EntryKind::Symlink {
        fs::read_link(path).ok().map(|target| {
            lexical_normalize(&path.parent().unwrap_or(root.dir.as_path()).join(target))
        })
    } else {
        None
    };
    let link_escapes_boundary = entry_kind == EntryKind::Symlink
        && link_target
            .as_deref()
            .is_none_or(|target| !target.starts_with(&root.dir) || target == root.dir);
    Some(Candidate {
        path: path.to_path_buf(),
        root_kind: root.kind,
        root_dir: root.dir.clone(),
        match_method: MatchMethod::ExactId,
        confidence: EXACT_ID_CONFIDENCE,
        size_bytes: path_size_bytes(path).size_bytes,
        entry_kind,
        link_target,
        link_escapes_boundary,
        requires_elevation: requires_elevation(root, path, home),
        evidence,
    })
}

/// True when a directory between `root` and `path` carries the vendor name.
fn under_vendor_dir(root: &Path, path: &Path, vendor: &str) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    parent.strip_prefix(root).is_ok_and(|relative| {
        relative.components().any(|component| {
            matches!(component, Component::Normal(name)
                if name.to_str().is_some_and(|name| name.eq_ignore_ascii_case(vendor)))
        })
    })
}

/// Deepest root containing `path`.
fn owning_root<'a>(boundaries: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    boundaries
        .iter()
        .filter(|dir| path.starts_with(dir) && path != dir.as_path())
        .max_by_key(|dir| path_depth(dir))
        .map(PathBuf::as_path)
}

fn requires_elevation(root: &ResolvedRoot, path: &Path, home: &Path) -> bool {
    let parent_readonly = path
        .parent()
        .and_then(|parent| fs::metadata(parent).ok())
        .is_some_and(|meta| meta.permissions().readonly());
    parent_readonly || (root.kind.scope() == RootScope::System && !path.starts_with(home))
}

/// Keeps one candidate per path; the stronger match wins.
fn merge_candidate(merged: &mut HashMap<PathBuf, Candidate>, candidate: Candidate) {
    match merged.get(&candidate.path) {
        Some(existing) if !should_replace_candidate(existing, &candidate) => {}
        _ => {
            merged.insert(candidate.path.clone(), candidate);
        }
    }
}

fn should_replace_candidate(existing: &Candidate, next: &Candidate) -> bool {
    if next.confidence != existing.confidence {
        return next.confidence > existing.confidence;
    }
    if path_depth(&next.root_dir) != path_depth(&existing.root_dir) {
        return path_depth(&next.root_dir) > path_depth(&existing.root_dir);
    }
    next.root_dir < existing.root_dir
}

#[cfg(test)]
#[path = "../tests/scanning/scanner_tests.rs"]
mod scanner_tests;
