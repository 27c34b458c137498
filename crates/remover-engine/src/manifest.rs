use super::*;
use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleManifest {
    pub bundle_id: Option<String>,
    pub bundle_name: Option<String>,
    pub display_name: Option<String>,
}

pub fn is_app_bundle(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .is_some_and(|value| value.eq_ignore_ascii_case("app"))
}

/// Reads `Contents/Info.plist` of a bundle. Only XML property lists are
/// understood; binary ones yield `None`.
pub fn read_bundle_manifest(bundle: &Path) -> Option<BundleManifest> {
    let info_plist = bundle.join("Contents").join("Info.plist");
    let content = fs::read_to_string(&info_plist).ok()?;
    let manifest = BundleManifest {
        bundle_id: plist_string_value(content.as_str(), "CFBundleIdentifier"),
        bundle_name: plist_string_value(content.as_str(), "CFBundleName"),
        display_name: plist_string_value(content.as_str(), "CFBundleDisplayName"),
    };
    if manifest == BundleManifest::default() {
        tracing::debug!(
            event = "bundle_manifest_empty",
            path = %sanitize_path(&info_plist)
        );
        return None;
    }
    Some(manifest)
}

pub(crate) fn plist_string_value(content: &str, key: &str) -> Option<String> {
    let pattern = format!(
        r"<key>{}</key>\s*<string>([^<]+)</string>",
        regex::escape(key)
    );
    let regex = Regex::new(pattern.as_str()).ok()?;
    let value = regex.captures(content)?.get(1)?.as_str().trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}
