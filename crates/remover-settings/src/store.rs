use remover_contracts::models::PathRootKind;
use remover_contracts::{AppError, AppResult};
use remover_logging::sanitize_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const HOME_ENV: &str = "APP_REMOVER_HOME";
const SETTINGS_DIR_NAME: &str = ".app-remover";
const SETTINGS_FILE_NAME: &str = "settings.json";
const STAGING_DIR_NAME: &str = "staging";

const DEFAULT_RETENTION_DAYS: u32 = 30;
const RETENTION_DAYS_MIN: u32 = 1;
const RETENTION_DAYS_MAX: u32 = 365;
const DEFAULT_SIZE_THRESHOLD_BYTES: u64 = 1024 * 1024 * 1024;
const SIZE_THRESHOLD_MIN_BYTES: u64 = 1024 * 1024;
const DEFAULT_MAX_SCAN_DEPTH: usize = 2;
const MAX_SCAN_DEPTH_MIN: usize = 1;
const MAX_SCAN_DEPTH_MAX: usize = 4;
const DEFAULT_LOG_KEEP_DAYS: u32 = 7;
const LOG_KEEP_DAYS_MAX: u32 = 90;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

const DEFAULT_PROTECTED_FRAGMENTS: [&str; 17] = [
    "/System",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/usr/libexec",
    "/Library/Frameworks",
    "/Library/Apple",
    "/Library/Extensions",
    "/Library/Keychains",
    "/Library/Application Support/Apple",
    "/private/var/db/receipts/com.apple.",
    "Frameworks",
    "Keychains",
    "MobileSync",
    "CloudStorage",
];

const DEFAULT_PROTECTED_NAME_PREFIXES: [&str; 1] = ["com.apple."];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraRootSetting {
    pub kind: PathRootKind,
    pub template: String,
}

/// Policy knobs for one engine instance. Loaded once, then handed to the
/// engine by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub retention_days: u32,
    pub size_threshold_bytes: u64,
    pub max_scan_depth: usize,
    pub log_keep_days: u32,
    pub protected_fragments: Vec<String>,
    pub protected_name_prefixes: Vec<String>,
    pub extra_roots: Vec<ExtraRootSetting>,
    pub known_paths: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            size_threshold_bytes: DEFAULT_SIZE_THRESHOLD_BYTES,
            max_scan_depth: DEFAULT_MAX_SCAN_DEPTH,
            log_keep_days: DEFAULT_LOG_KEEP_DAYS,
            protected_fragments: DEFAULT_PROTECTED_FRAGMENTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            protected_name_prefixes: DEFAULT_PROTECTED_NAME_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            extra_roots: Vec::new(),
            known_paths: default_known_paths(),
            staging_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days).saturating_mul(SECONDS_PER_DAY))
    }

    /// Staging area: explicit `stagingDir`, else `<settings dir>/staging`.
    pub fn staging_root(&self, settings_dir: &Path) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| settings_dir.join(STAGING_DIR_NAME))
    }
}

fn default_known_paths() -> BTreeMap<String, Vec<String>> {
    let mut known = BTreeMap::new();
    known.insert(
        "com.google.Chrome".to_string(),
        vec![
            "~/Library/Application Support/Google/Chrome".to_string(),
            "~/Library/Caches/Google/Chrome".to_string(),
        ],
    );
    known.insert(
        "com.discord".to_string(),
        vec![
            "~/Library/Application Support/discord".to_string(),
            "~/Library/Caches/com.discord".to_string(),
        ],
    );
    known
}

fn normalize_string_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

pub fn normalize_settings(mut settings: EngineSettings) -> EngineSettings {
    settings.retention_days = settings
        .retention_days
        .clamp(RETENTION_DAYS_MIN, RETENTION_DAYS_MAX);
    settings.size_threshold_bytes = settings.size_threshold_bytes.max(SIZE_THRESHOLD_MIN_BYTES);
    settings.max_scan_depth = settings
        .max_scan_depth
        .clamp(MAX_SCAN_DEPTH_MIN, MAX_SCAN_DEPTH_MAX);
    settings.log_keep_days = settings.log_keep_days.clamp(1, LOG_KEEP_DAYS_MAX);
    settings.protected_fragments = normalize_string_list(settings.protected_fragments);
    settings.protected_name_prefixes = normalize_string_list(settings.protected_name_prefixes);
    settings
        .extra_roots
        .retain(|root| !root.template.trim().is_empty());
    settings.known_paths = settings
        .known_paths
        .into_iter()
        .filter(|(bundle_id, _)| !bundle_id.trim().is_empty())
        .map(|(bundle_id, templates)| (bundle_id.trim().to_string(), normalize_string_list(templates)))
        .filter(|(_, templates)| !templates.is_empty())
        .collect();
    if let Some(staging_dir) = settings.staging_dir.as_ref()
        && !staging_dir.is_absolute()
    {
        tracing::warn!(
            event = "settings_staging_dir_ignored",
            staging_dir = %sanitize_path(staging_dir)
        );
        settings.staging_dir = None;
    }
    settings
}

/// `$APP_REMOVER_HOME`, else `~/.app-remover`.
pub fn settings_dir() -> AppResult<PathBuf> {
    if let Some(value) = std::env::var_os(HOME_ENV)
        && !value.is_empty()
    {
        return Ok(PathBuf::from(value));
    }
    let home = dirs::home_dir().ok_or_else(|| {
        AppError::new(
            "settings_home_dir_unavailable",
            "Cannot locate the user home directory",
        )
    })?;
    Ok(home.join(SETTINGS_DIR_NAME))
}

pub fn settings_file_path(settings_dir: &Path) -> PathBuf {
    settings_dir.join(SETTINGS_FILE_NAME)
}

pub fn write_settings_file(path: &Path, settings: &EngineSettings) -> AppResult<()> {
    let parent = path.parent().ok_or_else(|| {
        AppError::new("settings_path_invalid", "Settings path has no parent directory")
            .with_context("path", path.to_string_lossy().to_string())
    })?;
    fs::create_dir_all(parent).map_err(|error| {
        AppError::new("settings_dir_create_failed", "Failed to create settings directory")
            .with_source(error)
            .with_context("path", parent.to_string_lossy().to_string())
    })?;

    let serialized = serde_json::to_string_pretty(settings).map_err(|error| {
        AppError::new("settings_serialize_failed", "Failed to serialise settings").with_source(error)
    })?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, serialized).map_err(|error| {
        AppError::new("settings_temp_write_failed", "Failed to write temporary settings file")
            .with_source(error)
            .with_context("path", temp_path.to_string_lossy().to_string())
    })?;

    fs::rename(&temp_path, path).map_err(|error| {
        let _ = fs::remove_file(&temp_path);
        AppError::new("settings_write_failed", "Failed to replace settings file")
            .with_source(error)
            .with_context("path", path.to_string_lossy().to_string())
    })
}

fn backup_corrupted_settings_file(path: &Path, content: &str) -> Option<PathBuf> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
    let backup_path = path.with_file_name(format!("{SETTINGS_FILE_NAME}.bak.{suffix}"));

    match fs::write(&backup_path, content) {
        Ok(_) => Some(backup_path),
        Err(error) => {
            tracing::warn!(
                event = "settings_backup_failed",
                detail = %error,
                backup_path = %sanitize_path(&backup_path)
            );
            None
        }
    }
}

/// Reads the settings file, creating it with defaults when absent. A file
/// that does not parse is backed up and replaced by defaults.
pub fn load_or_init(path: &Path) -> AppResult<EngineSettings> {
    let content = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let settings = normalize_settings(EngineSettings::default());
            write_settings_file(path, &settings)?;
            return Ok(settings);
        }
        Err(error) => {
            return Err(
                AppError::new("settings_read_failed", "Failed to read settings file")
                    .with_source(error)
                    .with_context("path", path.to_string_lossy().to_string()),
            );
        }
    };

    match serde_json::from_str::<EngineSettings>(content.as_str()) {
        Ok(settings) => Ok(normalize_settings(settings)),
        Err(error) => {
            let backup_path = backup_corrupted_settings_file(path, content.as_str());
            tracing::warn!(
                event = "settings_parse_failed",
                detail = %error,
                backup_path = backup_path.as_ref().map(|value| sanitize_path(value)).unwrap_or_default()
            );
            let settings = normalize_settings(EngineSettings::default());
            write_settings_file(path, &settings)?;
            Ok(settings)
        }
    }
}

#[cfg(test)]
#[path = "../tests/settings/store_tests.rs"]
mod store_tests;
