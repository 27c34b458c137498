use super::*;
use remover_settings::EngineSettings;

const SAFE_CONFIDENCE: f64 = 0.9;
const MIN_CONFIDENCE: f64 = 0.5;

/// Denylist and thresholds used to tier candidates. Built once per scan;
/// classification is a pure function of the candidate and this policy.
#[derive(Debug, Clone, Default)]
pub struct RiskPolicy {
    pub size_threshold_bytes: u64,
    /// Path fragments. Absolute ones anchor at the filesystem root; relative
    /// ones match any contiguous run of components. A trailing `.` on the
    /// last component matches as a name prefix.
    pub protected_fragments: Vec<String>,
    pub protected_name_prefixes: Vec<String>,
    /// Directories that must never be removed themselves.
    pub protected_paths: Vec<PathBuf>,
    /// Bundles of other installed applications.
    pub other_bundle_roots: Vec<PathBuf>,
}

impl RiskPolicy {
    pub fn from_settings(settings: &EngineSettings, catalog: &PathCatalog) -> Self {
        let home = catalog.home();
        let mut protected_paths = vec![
            PathBuf::from("/"),
            home.to_path_buf(),
            home.join("Desktop"),
            home.join("Documents"),
            home.join("Downloads"),
            home.join("Library"),
            PathBuf::from("/Applications"),
            PathBuf::from("/Library"),
        ];
        for dir in catalog.root_dirs() {
            if !protected_paths.contains(&dir) {
                protected_paths.push(dir);
            }
        }
        Self {
            size_threshold_bytes: settings.size_threshold_bytes,
            protected_fragments: settings.protected_fragments.clone(),
            protected_name_prefixes: settings.protected_name_prefixes.clone(),
            protected_paths,
            other_bundle_roots: Vec::new(),
        }
    }

    pub fn with_other_bundle_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.other_bundle_roots = roots;
        self
    }
}

pub fn classify(candidates: Vec<Candidate>, policy: &RiskPolicy) -> Vec<ClassifiedCandidate> {
    let classified = candidates
        .into_iter()
        .map(|candidate| classify_candidate(candidate, policy))
        .collect::<Vec<_>>();
    let excluded = classified
        .iter()
        .filter(|item| item.tier == RiskTier::Excluded)
        .count();
    tracing::debug!(
        event = "candidates_classified",
        total = classified.len(),
        excluded
    );
    classified
}

pub fn classify_candidate(candidate: Candidate, policy: &RiskPolicy) -> ClassifiedCandidate {
    let mut excluded = Vec::new();
    let mut caution = Vec::new();

    for fragment in &policy.protected_fragments {
        if fragment_overlaps(&candidate.path, fragment) {
            excluded.push(RiskReason::DenylistOverlap {
                fragment: fragment.clone(),
            });
        }
    }
    for protected in &policy.protected_paths {
        if protected.starts_with(&candidate.path) {
            excluded.push(RiskReason::ProtectedPath {
                path: protected.clone(),
            });
        }
    }
    if let Some(name) = candidate.path.file_name().and_then(|value| value.to_str()) {
        let name = name.to_ascii_lowercase();
        for prefix in &policy.protected_name_prefixes {
            if name.starts_with(prefix.to_ascii_lowercase().as_str()) {
                excluded.push(RiskReason::ProtectedNamePrefix {
                    prefix: prefix.clone(),
                });
            }
        }
    }
    for bundle_root in &policy.other_bundle_roots {
        if candidate.path.starts_with(bundle_root) || bundle_root.starts_with(&candidate.path) {
            excluded.push(RiskReason::OtherApplicationBundle {
                bundle_root: bundle_root.clone(),
            });
        }
    }
    if candidate.link_escapes_boundary {
        excluded.push(RiskReason::LinkEscapesBoundary);
    }

    match (candidate.root_kind, candidate.match_method) {
        (_, MatchMethod::ExactId) => {}
        (PathRootKind::Bundle, MatchMethod::Fragment) => {
            excluded.push(RiskReason::BundleFragmentMatch);
        }
        (PathRootKind::Bundle, MatchMethod::ExactName) => {}
        (kind, _) if kind.scope() == RootScope::System => {
            excluded.push(RiskReason::SystemScopeRequiresExactId);
        }
        _ => {}
    }

    if candidate.confidence < MIN_CONFIDENCE {
        excluded.push(RiskReason::LowConfidence);
    } else if candidate.confidence < SAFE_CONFIDENCE {
        caution.push(RiskReason::ModerateConfidence);
    }
    if candidate.match_method != MatchMethod::ExactId
        && candidate.size_bytes > policy.size_threshold_bytes
    {
        caution.push(RiskReason::OversizedMatch {
            size_bytes: candidate.size_bytes,
            threshold_bytes: policy.size_threshold_bytes,
        });
    }

    let tier = if !excluded.is_empty() {
        RiskTier::Excluded
    } else if !caution.is_empty() {
        RiskTier::Caution
    } else {
        RiskTier::Safe
    };
    excluded.extend(caution);
    ClassifiedCandidate {
        candidate,
        tier,
        reasons: excluded,
    }
}

fn lower_components(path: &Path) -> Vec<String> {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_lowercase())
        .collect()
}

/// True when `path` lies inside (or is an ancestor of) the area the
/// fragment names.
fn fragment_overlaps(path: &Path, fragment: &str) -> bool {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return false;
    }
    let fragment_path = Path::new(fragment);
    let wanted = lower_components(fragment_path);
    let have = lower_components(path);
    if wanted.is_empty() {
        return false;
    }

    if fragment_path.is_absolute() {
        if have.len() < wanted.len() {
            return wanted.starts_with(&have);
        }
        return components_match(&have[..wanted.len()], &wanted);
    }

    have.windows(wanted.len())
        .any(|window| components_match(window, &wanted))
}

fn components_match(have: &[String], wanted: &[String]) -> bool {
    let last = wanted.len() - 1;
    have.iter().zip(wanted).enumerate().all(|(index, (have, wanted))| {
        if index == last && wanted.ends_with('.') {
            have.starts_with(wanted.as_str())
        } else {
            have == wanted
        }
    })
}

#[cfg(test)]
#[path = "../tests/classification/classifier_tests.rs"]
mod classifier_tests;
