use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRootKind {
    Bundle,
    UserSupport,
    UserCache,
    UserPreferences,
    UserLogs,
    UserContainers,
    UserSavedState,
    UserWebData,
    UserLaunchAgents,
    SharedSupport,
    SystemReceipts,
}

impl PathRootKind {
    pub const ALL: [PathRootKind; 11] = [
        Self::Bundle,
        Self::UserSupport,
        Self::UserCache,
        Self::UserPreferences,
        Self::UserLogs,
        Self::UserContainers,
        Self::UserSavedState,
        Self::UserWebData,
        Self::UserLaunchAgents,
        Self::SharedSupport,
        Self::SystemReceipts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::UserSupport => "user_support",
            Self::UserCache => "user_cache",
            Self::UserPreferences => "user_preferences",
            Self::UserLogs => "user_logs",
            Self::UserContainers => "user_containers",
            Self::UserSavedState => "user_saved_state",
            Self::UserWebData => "user_web_data",
            Self::UserLaunchAgents => "user_launch_agents",
            Self::SharedSupport => "shared_support",
            Self::SystemReceipts => "system_receipts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }

    pub fn scope(self) -> RootScope {
        match self {
            Self::Bundle | Self::SharedSupport | Self::SystemReceipts => RootScope::System,
            _ => RootScope::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootScope {
    User,
    System,
}

/// What the GUI hands over when an application is dropped or selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReference {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

impl ApplicationReference {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn from_install_path(path: impl Into<PathBuf>) -> Self {
        Self {
            install_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = Some(bundle_id.into());
        self
    }

    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub display_name: String,
    pub normalized_name: String,
    pub bundle_id: Option<String>,
    pub vendor: Option<String>,
    pub fragments: Vec<String>,
    pub install_path: Option<PathBuf>,
    pub name_matchable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactId,
    ExactName,
    Fragment,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactId => "exact_id",
            Self::ExactName => "exact_name",
            Self::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
        }
    }

    pub fn from_file_type(file_type: std::fs::FileType) -> Option<Self> {
        if file_type.is_symlink() {
            return Some(Self::Symlink);
        }
        if file_type.is_dir() {
            return Some(Self::Directory);
        }
        if file_type.is_file() {
            return Some(Self::File);
        }
        None
    }

    /// Reads the kind without following a final symlink.
    pub fn of_path(path: &Path) -> Option<Self> {
        std::fs::symlink_metadata(path)
            .ok()
            .and_then(|meta| Self::from_file_type(meta.file_type()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub path: PathBuf,
    pub root_kind: PathRootKind,
    pub root_dir: PathBuf,
    pub match_method: MatchMethod,
    pub confidence: f64,
    pub size_bytes: u64,
    pub entry_kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<PathBuf>,
    #[serde(default)]
    pub link_escapes_boundary: bool,
    #[serde(default)]
    pub requires_elevation: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Caution,
    Excluded,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Excluded => "excluded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RiskReason {
    DenylistOverlap { fragment: String },
    ProtectedPath { path: PathBuf },
    ProtectedNamePrefix { prefix: String },
    OtherApplicationBundle { bundle_root: PathBuf },
    LinkEscapesBoundary,
    SystemScopeRequiresExactId,
    BundleFragmentMatch,
    LowConfidence,
    ModerateConfidence,
    OversizedMatch { size_bytes: u64, threshold_bytes: u64 },
}

/// A candidate together with the tier the classifier assigned. The only way
/// to obtain one is to run classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCandidate {
    pub candidate: Candidate,
    pub tier: RiskTier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<RiskReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanWarningCode {
    RootUnreadable,
    EntryUnreadable,
    SizeIncomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanWarning {
    pub code: ScanWarningCode,
    pub root_kind: PathRootKind,
    pub path: PathBuf,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub candidates: Vec<Candidate>,
    pub warnings: Vec<ScanWarning>,
    pub roots_scanned: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    Staged,
    Permanent,
}

impl RemovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    StaleCandidate,
    NotFound,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    PermissionDenied,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    Skipped { reason: SkipReason },
    Failed { reason: FailureReason, detail: String },
}

impl RemovalOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalItemResult {
    pub path: PathBuf,
    pub entry_kind: EntryKind,
    pub size_bytes: u64,
    pub outcome: RemovalOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResult {
    pub mode: RemovalMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    pub items: Vec<RemovalItemResult>,
    pub reclaimed_bytes: u64,
    pub cancelled: bool,
}

impl RemovalResult {
    pub fn removed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.is_removed())
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, RemovalOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, RemovalOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreFailureReason {
    Expired,
    TargetOccupied,
    StagedMissing,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored,
    AlreadyRestored,
    Failed {
        reason: RestoreFailureReason,
        detail: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreItemResult {
    pub original_path: PathBuf,
    pub outcome: RestoreOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResult {
    pub batch_id: String,
    pub items: Vec<RestoreItemResult>,
}

impl RestoreResult {
    pub fn restored_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, RestoreOutcome::Restored))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.items
            .iter()
            .all(|item| !matches!(item.outcome, RestoreOutcome::Failed { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedBatchSummary {
    pub batch_id: String,
    pub app_name: String,
    pub created_at_ms: i64,
    pub expires_at_ms: i64,
    pub item_count: usize,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub purged_batches: Vec<String>,
    pub reclaimed_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub bundle_id: Option<String>,
    pub bundle_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanEntry {
    pub name: String,
    pub path: PathBuf,
    pub root_kind: PathRootKind,
    pub size_bytes: u64,
    pub probable_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupKind {
    LaunchAgent,
    LaunchDaemon,
    Autostart,
}

impl StartupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LaunchAgent => "launch_agent",
            Self::LaunchDaemon => "launch_daemon",
            Self::Autostart => "autostart",
        }
    }

    /// File extension of the job definitions this kind reads.
    pub fn extension(self) -> &'static str {
        match self {
            Self::LaunchAgent | Self::LaunchDaemon => "plist",
            Self::Autostart => "desktop",
        }
    }
}

/// A job definition that starts a program at login or boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupItem {
    pub name: String,
    pub path: PathBuf,
    pub kind: StartupKind,
    pub scope: RootScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    pub disabled: bool,
    pub size_bytes: u64,
    pub requires_elevation: bool,
}
