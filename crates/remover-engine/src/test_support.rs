use super::*;
use remover_settings::EngineSettings;
use tempfile::TempDir;

/// A fake home directory with a catalog rooted inside it.
pub(crate) struct Sandbox {
    _temp: TempDir,
    pub(crate) home: PathBuf,
}

impl Sandbox {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let home = temp
            .path()
            .canonicalize()
            .expect("canonicalize temp dir")
            .join("home");
        fs::create_dir_all(&home).expect("create home");
        Self { _temp: temp, home }
    }

    pub(crate) fn path(&self, relative: &str) -> PathBuf {
        self.home.join(relative)
    }

    pub(crate) fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).expect("create dir");
        path
    }

    pub(crate) fn write(&self, relative: &str, bytes: usize) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, vec![b'x'; bytes]).expect("write file");
        path
    }

    pub(crate) fn app_bundle(&self, relative: &str, bundle_id: &str, bundle_name: &str) -> PathBuf {
        let bundle = self.mkdir(relative);
        let contents = bundle.join("Contents");
        fs::create_dir_all(&contents).expect("create Contents");
        let plist = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n\t<key>CFBundleIdentifier</key>\n\t<string>{bundle_id}</string>\n\t<key>CFBundleName</key>\n\t<string>{bundle_name}</string>\n</dict>\n</plist>\n"
        );
        fs::write(contents.join("Info.plist"), plist).expect("write Info.plist");
        bundle
    }

    /// Catalog with one root per kind that tests exercise, all under home.
    pub(crate) fn catalog(&self) -> PathCatalog {
        let entries = vec![
            CatalogEntry::new(PathRootKind::Bundle, "~/Applications"),
            CatalogEntry::new(PathRootKind::UserSupport, "~/Library/Application Support"),
            CatalogEntry::new(PathRootKind::UserCache, "~/Library/Caches"),
            CatalogEntry::new(PathRootKind::UserPreferences, "~/Library/Preferences"),
            CatalogEntry::new(PathRootKind::UserLogs, "~/Library/Logs"),
            CatalogEntry::new(PathRootKind::UserContainers, "~/Library/Containers"),
            CatalogEntry::new(PathRootKind::SharedSupport, "~/shared/Application Support"),
        ];
        for entry in &entries {
            fs::create_dir_all(self.home.join(entry.template.trim_start_matches("~/")))
                .expect("create root");
        }
        PathCatalog::new(self.home.clone(), entries)
    }

    pub(crate) fn staging(&self) -> StagingArea {
        StagingArea::new(
            self.home.join(".app-remover/staging"),
            std::time::Duration::from_secs(30 * 24 * 60 * 60),
        )
    }
}

pub(crate) fn identity(name: &str, bundle_id: Option<&str>) -> Identity {
    let mut reference = ApplicationReference::named(name);
    if let Some(bundle_id) = bundle_id {
        reference = reference.with_bundle_id(bundle_id);
    }
    resolve_identity(&reference).expect("resolve identity")
}

pub(crate) fn candidate(path: &Path, root_kind: PathRootKind, method: MatchMethod) -> Candidate {
    let confidence = match method {
        MatchMethod::ExactId => EXACT_ID_CONFIDENCE,
        MatchMethod::ExactName => EXACT_NAME_CONFIDENCE,
        MatchMethod::Fragment => fragment_confidence(0),
    };
    Candidate {
        path: path.to_path_buf(),
        root_kind,
        root_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        match_method: method,
        confidence,
        size_bytes: 0,
        entry_kind: EntryKind::of_path(path).unwrap_or(EntryKind::File),
        link_target: None,
        link_escapes_boundary: false,
        requires_elevation: false,
        evidence: Vec::new(),
    }
}

pub(crate) fn test_policy() -> RiskPolicy {
    let settings = EngineSettings::default();
    RiskPolicy {
        size_threshold_bytes: settings.size_threshold_bytes,
        protected_fragments: settings.protected_fragments,
        protected_name_prefixes: settings.protected_name_prefixes,
        protected_paths: Vec::new(),
        other_bundle_roots: Vec::new(),
    }
}
