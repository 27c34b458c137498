use super::*;

/// Bundle locations under `/System` belong to the OS and are never listed.
const SYSTEM_BUNDLE_PREFIX: &str = "/System/Applications";

const ORPHAN_ROOT_KINDS: [PathRootKind; 4] = [
    PathRootKind::UserContainers,
    PathRootKind::UserSupport,
    PathRootKind::UserCache,
    PathRootKind::UserPreferences,
];

const MIN_BUNDLE_ID_PARTS: usize = 3;

/// Application bundles directly inside the catalog's bundle roots.
pub fn installed_bundle_roots(catalog: &PathCatalog) -> Vec<PathBuf> {
    let mut bundles = Vec::new();
    for root in catalog.resolve_roots() {
        if root.kind != PathRootKind::Bundle || root.dir.starts_with(SYSTEM_BUNDLE_PREFIX) {
            continue;
        }
        let entries = match fs::read_dir(&root.dir) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    event = "inventory_root_unreadable",
                    dir = %sanitize_path(&root.dir),
                    error = %error
                );
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_app_bundle(&path) && entry.file_type().is_ok_and(|kind| kind.is_dir()) {
                bundles.push(path);
            }
        }
    }
    bundles.sort();
    bundles.dedup();
    bundles
}

/// Installed applications with their manifest identity and bundle size,
/// sorted by name.
pub fn list_installed_apps(catalog: &PathCatalog) -> Vec<InstalledApp> {
    let mut apps = installed_bundle_roots(catalog)
        .into_iter()
        .map(|path| {
            let manifest = read_bundle_manifest(&path).unwrap_or_default();
            let name = path
                .file_stem()
                .map(|value| value.to_string_lossy().to_string())
                .unwrap_or_default();
            InstalledApp {
                name,
                size_bytes: path_size_bytes(&path).size_bytes,
                bundle_id: manifest.bundle_id,
                bundle_name: manifest.bundle_name,
                path,
            }
        })
        .collect::<Vec<_>>();
    apps.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then(left.path.cmp(&right.path))
    });
    apps
}

/// `com.vendor.product` style names (at least three non-empty dot parts),
/// with a trailing `.plist` removed.
pub fn looks_like_bundle_id(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".plist").unwrap_or(name).trim();
    let parts = stem.split('.').collect::<Vec<_>>();
    let valid = parts.len() >= MIN_BUNDLE_ID_PARTS
        && parts.iter().all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_'))
        });
    valid.then(|| stem.to_string())
}

/// Top-level data entries named like a bundle id whose application is no
/// longer installed. Helper ids (`com.acme.foo.helper`) count as installed
/// when their parent id is.
pub fn scan_orphans(
    catalog: &PathCatalog,
    installed_ids: &HashSet<String>,
    protected_name_prefixes: &[String],
) -> Vec<OrphanEntry> {
    let installed = installed_ids
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .collect::<Vec<_>>();
    let prefixes = protected_name_prefixes
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .collect::<Vec<_>>();

    let mut orphans = Vec::new();
    let mut seen = HashSet::new();
    for root in catalog.resolve_roots() {
        if !ORPHAN_ROOT_KINDS.contains(&root.kind) {
            continue;
        }
        let Ok(entries) = fs::read_dir(&root.dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(probable_id) = looks_like_bundle_id(name.as_str()) else {
                continue;
            };
            let key = probable_id.to_ascii_lowercase();
            if prefixes.iter().any(|prefix| key.starts_with(prefix.as_str())) {
                continue;
            }
            let owned = installed
                .iter()
                .any(|id| key == *id || key.starts_with(format!("{id}.").as_str()));
            if owned {
                continue;
            }
            let path = entry.path();
            if !seen.insert(path.clone()) {
                continue;
            }
            orphans.push(OrphanEntry {
                name,
                size_bytes: path_size_bytes(&path).size_bytes,
                path,
                root_kind: root.kind,
                probable_id,
            });
        }
    }
    orphans.sort_by(|left, right| {
        right
            .size_bytes
            .cmp(&left.size_bytes)
            .then(left.path.cmp(&right.path))
    });
    tracing::debug!(event = "orphans_scanned", count = orphans.len());
    orphans
}

/// Removal candidate for an entry [`scan_orphans`] reported. The bundle id
/// it is named after counts as an exact match.
pub fn orphan_candidate(orphan: &OrphanEntry, home: &Path) -> Option<Candidate> {
    let root = ResolvedRoot {
        kind: orphan.root_kind,
        dir: orphan.path.parent()?.to_path_buf(),
    };
    direct_candidate(
        &root,
        &orphan.path,
        home,
        vec![format!("orphan:{}", orphan.probable_id)],
    )
}

#[cfg(test)]
#[path = "../tests/inventory/inventory_tests.rs"]
mod inventory_tests;
