use super::*;
use remover_settings::EngineSettings;

/// One root template. `~` and `{home}` expand to the user's home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub kind: PathRootKind,
    pub template: String,
}

impl CatalogEntry {
    pub fn new(kind: PathRootKind, template: impl Into<String>) -> Self {
        Self {
            kind,
            template: template.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoot {
    pub kind: PathRootKind,
    pub dir: PathBuf,
}

/// Immutable list of well-known locations where applications keep data.
/// Built once at startup and shared read-only by every scan.
#[derive(Debug, Clone)]
pub struct PathCatalog {
    home: PathBuf,
    entries: Vec<CatalogEntry>,
    known_paths: BTreeMap<String, Vec<String>>,
}

impl PathCatalog {
    pub fn new(home: impl Into<PathBuf>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            home: home.into(),
            entries,
            known_paths: BTreeMap::new(),
        }
    }

    /// Paths known to belong to a bundle id even though they carry no
    /// matching name (e.g. `~/Library/Application Support/Google/Chrome`).
    pub fn with_known_paths(mut self, known_paths: BTreeMap<String, Vec<String>>) -> Self {
        self.known_paths = known_paths
            .into_iter()
            .map(|(bundle_id, paths)| (bundle_id.trim().to_ascii_lowercase(), paths))
            .filter(|(bundle_id, _)| !bundle_id.is_empty())
            .collect();
        self
    }

    pub fn platform_default(home: impl Into<PathBuf>) -> Self {
        Self::new(home, default_entries())
    }

    pub fn from_settings(settings: &EngineSettings) -> AppResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            engine_error(
                EngineErrorCode::CatalogHomeUnavailable,
                "cannot determine the user's home directory",
            )
        })?;
        let mut entries = default_entries();
        for extra in &settings.extra_roots {
            entries.push(CatalogEntry::new(extra.kind, extra.template.clone()));
        }
        Ok(Self::new(home, entries).with_known_paths(settings.known_paths.clone()))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn expand_template(&self, template: &str) -> Option<PathBuf> {
        let template = template.trim();
        let expanded = if template == "~" || template == "{home}" {
            self.home.clone()
        } else if let Some(rest) = template
            .strip_prefix("~/")
            .or_else(|| template.strip_prefix("{home}/"))
        {
            self.home.join(rest)
        } else {
            PathBuf::from(template)
        };
        if expanded.as_os_str().is_empty() || !expanded.is_absolute() {
            tracing::warn!(event = "catalog_template_rejected", template = %template);
            return None;
        }
        Some(lexical_normalize(&expanded))
    }

    /// Every configured root, whether or not it exists.
    pub fn root_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for entry in &self.entries {
            if let Some(dir) = self.expand_template(entry.template.as_str())
                && !dirs.contains(&dir)
            {
                dirs.push(dir);
            }
        }
        dirs
    }

    /// Roots that exist on this machine, in catalog order. A path listed
    /// twice keeps its first kind.
    pub fn resolve_roots(&self) -> Vec<ResolvedRoot> {
        let mut roots: Vec<ResolvedRoot> = Vec::new();
        for entry in &self.entries {
            let Some(dir) = self.expand_template(entry.template.as_str()) else {
                continue;
            };
            if roots.iter().any(|root| root.dir == dir) {
                continue;
            }
            let is_dir = fs::metadata(&dir).is_ok_and(|meta| meta.is_dir());
            if !is_dir {
                tracing::debug!(
                    event = "catalog_root_missing",
                    kind = entry.kind.as_str(),
                    dir = %sanitize_path(&dir)
                );
                continue;
            }
            roots.push(ResolvedRoot {
                kind: entry.kind,
                dir,
            });
        }
        roots
    }

    pub fn known_paths_for(&self, bundle_id: &str) -> Vec<PathBuf> {
        self.known_paths
            .get(bundle_id.trim().to_ascii_lowercase().as_str())
            .map(|templates| {
                templates
                    .iter()
                    .filter_map(|template| self.expand_template(template.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(target_os = "macos")]
fn default_entries() -> Vec<CatalogEntry> {
    use PathRootKind::*;
    [
        (Bundle, "/Applications"),
        (Bundle, "~/Applications"),
        (UserSupport, "~/Library/Application Support"),
        (UserCache, "~/Library/Caches"),
        (UserPreferences, "~/Library/Preferences"),
        (UserPreferences, "~/Library/Preferences/ByHost"),
        (UserLogs, "~/Library/Logs"),
        (UserContainers, "~/Library/Containers"),
        (UserContainers, "~/Library/Group Containers"),
        (UserSavedState, "~/Library/Saved Application State"),
        (UserWebData, "~/Library/WebKit"),
        (UserWebData, "~/Library/HTTPStorages"),
        (UserWebData, "~/Library/Cookies"),
        (UserLaunchAgents, "~/Library/LaunchAgents"),
        (SharedSupport, "/Library/Application Support"),
        (SharedSupport, "/Library/Caches"),
        (SharedSupport, "/Library/Preferences"),
        (SharedSupport, "/Library/Logs"),
        (SharedSupport, "/Library/LaunchAgents"),
        (SharedSupport, "/Library/LaunchDaemons"),
        (SharedSupport, "/Library/PrivilegedHelperTools"),
        (SystemReceipts, "/private/var/db/receipts"),
        (SystemReceipts, "/Library/Receipts"),
    ]
    .into_iter()
    .map(|(kind, template)| CatalogEntry::new(kind, template))
    .collect()
}

#[cfg(target_os = "windows")]
fn default_entries() -> Vec<CatalogEntry> {
    use PathRootKind::*;
    let env_dir = |key: &str, suffix: &str| {
        std::env::var_os(key).map(|value| {
            let base = PathBuf::from(value);
            let dir = if suffix.is_empty() {
                base
            } else {
                base.join(suffix)
            };
            dir.to_string_lossy().to_string()
        })
    };
    [
        (Bundle, env_dir("ProgramFiles", "")),
        (Bundle, env_dir("ProgramFiles(x86)", "")),
        (Bundle, env_dir("LOCALAPPDATA", "Programs")),
        (UserSupport, env_dir("APPDATA", "")),
        (UserCache, env_dir("LOCALAPPDATA", "")),
        (UserLogs, env_dir("LOCALAPPDATA", "CrashDumps")),
        (
            UserLaunchAgents,
            env_dir("APPDATA", r"Microsoft\Windows\Start Menu\Programs\Startup"),
        ),
        (SharedSupport, env_dir("ProgramData", "")),
    ]
    .into_iter()
    .filter_map(|(kind, template)| template.map(|value| CatalogEntry::new(kind, value)))
    .collect()
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_entries() -> Vec<CatalogEntry> {
    use PathRootKind::*;
    [
        (Bundle, "/opt"),
        (Bundle, "~/Applications"),
        (Bundle, "~/.local/opt"),
        (UserSupport, "~/.config"),
        (UserSupport, "~/.local/share"),
        (UserCache, "~/.cache"),
        (UserLogs, "~/.local/state"),
        (UserContainers, "~/.var/app"),
        (UserLaunchAgents, "~/.config/autostart"),
        (SharedSupport, "/etc/opt"),
        (SharedSupport, "/var/opt"),
    ]
    .into_iter()
    .map(|(kind, template)| CatalogEntry::new(kind, template))
    .collect()
}

#[cfg(test)]
#[path = "../tests/catalog/catalog_tests.rs"]
mod catalog_tests;
