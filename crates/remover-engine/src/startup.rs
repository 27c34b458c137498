use super::*;
use regex::Regex;
use std::fmt;

const DESKTOP_ENTRY_HEADER: &str = "[Desktop Entry]";

/// A directory holding job definitions of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupLocation {
    pub dir: PathBuf,
    pub kind: StartupKind,
    pub scope: RootScope,
}

impl StartupLocation {
    pub fn new(dir: impl Into<PathBuf>, kind: StartupKind, scope: RootScope) -> Self {
        Self {
            dir: dir.into(),
            kind,
            scope,
        }
    }

    fn root_kind(&self) -> PathRootKind {
        match self.scope {
            RootScope::User => PathRootKind::UserLaunchAgents,
            RootScope::System => PathRootKind::SharedSupport,
        }
    }
}

#[cfg(target_os = "macos")]
pub fn default_startup_locations(home: &Path) -> Vec<StartupLocation> {
    vec![
        StartupLocation::new(
            home.join("Library/LaunchAgents"),
            StartupKind::LaunchAgent,
            RootScope::User,
        ),
        StartupLocation::new("/Library/LaunchAgents", StartupKind::LaunchAgent, RootScope::System),
        StartupLocation::new(
            "/Library/LaunchDaemons",
            StartupKind::LaunchDaemon,
            RootScope::System,
        ),
    ]
}

/// Startup-folder shortcuts are binary `.lnk` files; nothing is listed.
#[cfg(target_os = "windows")]
pub fn default_startup_locations(_home: &Path) -> Vec<StartupLocation> {
    Vec::new()
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn default_startup_locations(home: &Path) -> Vec<StartupLocation> {
    vec![
        StartupLocation::new(
            home.join(".config/autostart"),
            StartupKind::Autostart,
            RootScope::User,
        ),
        StartupLocation::new("/etc/xdg/autostart", StartupKind::Autostart, RootScope::System),
    ]
}

/// Stops a running job. Only the launchd implementation talks to the OS.
pub trait ServiceControl: Send + Sync + fmt::Debug {
    /// `persist` also keeps the job from loading at the next login.
    fn unload(&self, item: &StartupItem, persist: bool) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchctlControl;

impl ServiceControl for LaunchctlControl {
    fn unload(&self, item: &StartupItem, persist: bool) -> io::Result<()> {
        if item.kind == StartupKind::Autostart {
            return Ok(());
        }
        launchctl_unload(&item.path, persist)
    }
}

#[cfg(target_os = "macos")]
fn launchctl_unload(path: &Path, persist: bool) -> io::Result<()> {
    let mut command = std::process::Command::new("launchctl");
    command.arg("unload");
    if persist {
        command.arg("-w");
    }
    let output = command.arg(path).output()?;
    if output.status.success() {
        return Ok(());
    }
    Err(io::Error::other(
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    ))
}

#[cfg(not(target_os = "macos"))]
fn launchctl_unload(_path: &Path, _persist: bool) -> io::Result<()> {
    Ok(())
}

/// Job definitions in every location, sorted by name. Names starting with a
/// protected prefix (`com.apple.`) are left out.
pub fn list_startup_items(
    locations: &[StartupLocation],
    protected_name_prefixes: &[String],
) -> Vec<StartupItem> {
    let prefixes = protected_name_prefixes
        .iter()
        .map(|value| value.to_ascii_lowercase())
        .collect::<Vec<_>>();
    let mut items = Vec::new();
    for location in locations {
        let entries = match fs::read_dir(&location.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
            Err(error) => {
                tracing::warn!(
                    event = "startup_dir_unreadable",
                    dir = %sanitize_path(&location.dir),
                    error = %error
                );
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let wanted_extension = path
                .extension()
                .and_then(|value| value.to_str())
                .is_some_and(|value| value.eq_ignore_ascii_case(location.kind.extension()));
            if !wanted_extension || !entry.file_type().is_ok_and(|kind| kind.is_file()) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            if prefixes.iter().any(|prefix| file_name.starts_with(prefix.as_str())) {
                continue;
            }
            items.push(read_startup_item(&path, location));
        }
    }
    items.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then(left.path.cmp(&right.path))
    });
    tracing::debug!(event = "startup_items_listed", count = items.len());
    items
}

fn read_startup_item(path: &Path, location: &StartupLocation) -> StartupItem {
    let content = fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();
    let (label, program, disabled, display) = match location.kind {
        StartupKind::LaunchAgent | StartupKind::LaunchDaemon => {
            let label = plist_string_value(content.as_str(), "Label");
            let program = plist_string_value(content.as_str(), "Program")
                .or_else(|| first_program_argument(content.as_str()));
            let disabled = plist_disabled(content.as_str());
            (label.clone(), program, disabled, label)
        }
        StartupKind::Autostart => {
            let fields = desktop_entry_fields(content.as_str());
            let disabled = fields.get("Hidden").is_some_and(|value| value == "true")
                || fields
                    .get("X-GNOME-Autostart-enabled")
                    .is_some_and(|value| value == "false");
            (
                None,
                fields.get("Exec").cloned(),
                disabled,
                fields.get("Name").cloned(),
            )
        }
    };
    let parent_readonly = path
        .parent()
        .and_then(|parent| fs::metadata(parent).ok())
        .is_some_and(|meta| meta.permissions().readonly());
    StartupItem {
        name: display.unwrap_or(stem),
        size_bytes: fs::metadata(path).map(|meta| meta.len()).unwrap_or_default(),
        path: path.to_path_buf(),
        kind: location.kind,
        scope: location.scope,
        label,
        program,
        disabled,
        requires_elevation: parent_readonly || location.scope == RootScope::System,
    }
}

fn first_program_argument(content: &str) -> Option<String> {
    let regex =
        Regex::new(r"<key>ProgramArguments</key>\s*<array>\s*<string>([^<]+)</string>").ok()?;
    let value = regex.captures(content)?.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn disabled_regex() -> Option<Regex> {
    Regex::new(r"<key>Disabled</key>\s*<(true|false)\s*/>").ok()
}

fn plist_disabled(content: &str) -> bool {
    disabled_regex()
        .and_then(|regex| regex.captures(content))
        .and_then(|captures| captures.get(1))
        .is_some_and(|value| value.as_str() == "true")
}

/// Keys of the `[Desktop Entry]` group. Later duplicates win.
fn desktop_entry_fields(content: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut in_entry = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_entry = line == DESKTOP_ENTRY_HEADER;
            continue;
        }
        if !in_entry || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    fields
}

/// The listed item at `path`.
pub fn find_startup_item(
    locations: &[StartupLocation],
    protected_name_prefixes: &[String],
    path: &Path,
) -> AppResult<StartupItem> {
    let wanted = lexical_normalize(path);
    list_startup_items(locations, protected_name_prefixes)
        .into_iter()
        .find(|item| item.path == wanted)
        .ok_or_else(|| {
            engine_error(
                EngineErrorCode::StartupItemNotFound,
                "no startup item is listed at this path",
            )
            .with_context("path", path.display().to_string())
        })
}

/// Unloads the job and marks its definition disabled in place: a
/// `Disabled` key for property lists, `Hidden=true` for desktop entries.
/// The file itself stays. Disabling an already disabled item changes
/// nothing.
pub fn disable_startup_item(
    item: &StartupItem,
    location: &StartupLocation,
    control: &dyn ServiceControl,
) -> AppResult<StartupItem> {
    if item.disabled {
        return Ok(item.clone());
    }
    let content = fs::read_to_string(&item.path)
        .with_code(
            EngineErrorCode::StartupFormatUnsupported.as_str(),
            "startup item is not a readable text file",
        )
        .with_ctx("path", item.path.display().to_string())?;
    let updated = match item.kind {
        StartupKind::LaunchAgent | StartupKind::LaunchDaemon => plist_with_disabled(&content),
        StartupKind::Autostart => desktop_entry_with_hidden(&content),
    }
    .ok_or_else(|| {
        engine_error(
            EngineErrorCode::StartupFormatUnsupported,
            "startup item format cannot be edited",
        )
        .with_context("path", item.path.display().to_string())
    })?;
    if let Err(error) = control.unload(item, true) {
        tracing::warn!(
            event = "startup_unload_failed",
            path = %sanitize_path(&item.path),
            error = %error
        );
    }
    write_atomically(&item.path, updated.as_str())?;
    tracing::info!(
        event = "startup_item_disabled",
        path = %sanitize_path(&item.path),
        kind = item.kind.as_str()
    );
    Ok(read_startup_item(&item.path, location))
}

fn plist_with_disabled(content: &str) -> Option<String> {
    if !content.contains("<plist") {
        return None;
    }
    let regex = disabled_regex()?;
    if regex.is_match(content) {
        return Some(
            regex
                .replace(content, "<key>Disabled</key>\n\t<true/>")
                .into_owned(),
        );
    }
    let at = content.rfind("</dict>")?;
    let mut updated = String::with_capacity(content.len() + 32);
    updated.push_str(&content[..at]);
    updated.push_str("\t<key>Disabled</key>\n\t<true/>\n");
    updated.push_str(&content[at..]);
    Some(updated)
}

fn desktop_entry_with_hidden(content: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut in_entry = false;
    let mut found_header = false;
    let mut replaced = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if in_entry && !replaced {
                lines.push("Hidden=true".to_string());
                replaced = true;
            }
            in_entry = trimmed == DESKTOP_ENTRY_HEADER;
            found_header |= in_entry;
            lines.push(line.to_string());
            continue;
        }
        if in_entry && trimmed.split_once('=').is_some_and(|(key, _)| key.trim() == "Hidden") {
            if !replaced {
                lines.push("Hidden=true".to_string());
                replaced = true;
            }
            continue;
        }
        lines.push(line.to_string());
    }
    if !found_header {
        return None;
    }
    if !replaced {
        lines.push("Hidden=true".to_string());
    }
    let mut updated = lines.join("\n");
    updated.push('\n');
    Some(updated)
}

fn write_atomically(path: &Path, content: &str) -> AppResult<()> {
    let file_name = path
        .file_name()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&temp_path, content)
        .with_code(
            EngineErrorCode::StartupUpdateFailed.as_str(),
            "failed to write startup item",
        )
        .with_ctx("path", temp_path.display().to_string())?;
    fs::rename(&temp_path, path)
        .map_err(|error| {
            let _ = fs::remove_file(&temp_path);
            error
        })
        .with_code(
            EngineErrorCode::StartupUpdateFailed.as_str(),
            "failed to replace startup item",
        )
        .with_ctx("path", path.display().to_string())
}

/// Removal candidate for a listed item. Identified by exact id: the user
/// picked this very file.
pub fn startup_candidate(
    item: &StartupItem,
    location: &StartupLocation,
    home: &Path,
) -> Option<Candidate> {
    let root = ResolvedRoot {
        kind: location.root_kind(),
        dir: location.dir.clone(),
    };
    let tag = item.label.as_deref().unwrap_or(item.name.as_str());
    direct_candidate(&root, &item.path, home, vec![format!("startup:{tag}")])
}

/// The location an item was listed from.
pub fn location_of<'a>(
    locations: &'a [StartupLocation],
    item: &StartupItem,
) -> Option<&'a StartupLocation> {
    locations
        .iter()
        .find(|location| item.path.parent() == Some(location.dir.as_path()))
}

#[cfg(test)]
#[path = "../tests/startup/startup_tests.rs"]
mod startup_tests;
