use super::*;
use crate::test_support::Sandbox;

#[test]
fn list_installed_apps_reads_manifests_and_sorts_by_name() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog();
    sandbox.app_bundle("Applications/Zed.app", "dev.zed.Zed", "Zed");
    sandbox.app_bundle("Applications/alpha.app", "com.acme.alpha", "Alpha");
    sandbox.mkdir("Applications/NotAnApp");

    let apps = list_installed_apps(&catalog);

    let names = apps.iter().map(|app| app.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["alpha", "Zed"]);
    assert_eq!(apps[0].bundle_id.as_deref(), Some("com.acme.alpha"));
    assert_eq!(apps[0].bundle_name.as_deref(), Some("Alpha"));
    assert!(apps[0].size_bytes > 0);
}

#[test]
fn looks_like_bundle_id_needs_three_parts() {
    assert_eq!(
        looks_like_bundle_id("com.acme.foo.plist"),
        Some("com.acme.foo".to_string())
    );
    assert_eq!(
        looks_like_bundle_id("com.acme.foo-helper"),
        Some("com.acme.foo-helper".to_string())
    );
    assert_eq!(looks_like_bundle_id("com.acme"), None);
    assert_eq!(looks_like_bundle_id("Google"), None);
    assert_eq!(looks_like_bundle_id("com..foo"), None);
    assert_eq!(looks_like_bundle_id("my file.v1.txt"), None);
}

#[test]
fn scan_orphans_skips_installed_helpers_and_protected_prefixes() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog();
    sandbox.write("Library/Preferences/com.acme.foo.plist", 4);
    sandbox.write("Library/Preferences/com.acme.foo.helper.plist", 4);
    sandbox.write("Library/Preferences/com.apple.finder.plist", 4);
    let orphan = sandbox.write("Library/Caches/org.gone.tool/blob", 64);
    sandbox.mkdir("Library/Application Support/Plain Folder");
    let installed = HashSet::from(["com.acme.foo".to_string()]);

    let orphans = scan_orphans(&catalog, &installed, &["com.apple.".to_string()]);

    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].probable_id, "org.gone.tool");
    assert_eq!(orphans[0].root_kind, PathRootKind::UserCache);
    assert_eq!(orphans[0].size_bytes, 64);
    assert_eq!(Some(orphans[0].path.as_path()), orphan.parent());
}

#[test]
fn orphan_candidate_is_an_exact_match_rooted_at_its_parent() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog();
    sandbox.write("Library/Caches/org.gone.tool/blob", 16);
    let orphans = scan_orphans(&catalog, &HashSet::new(), &[]);

    let candidate = orphan_candidate(&orphans[0], &sandbox.home).expect("candidate");

    assert_eq!(candidate.match_method, MatchMethod::ExactId);
    assert_eq!(candidate.entry_kind, EntryKind::Directory);
    assert_eq!(candidate.root_dir, sandbox.path("Library/Caches"));
    assert_eq!(candidate.size_bytes, 16);
    assert_eq!(candidate.evidence, vec!["orphan:org.gone.tool".to_string()]);
}

#[cfg(unix)]
#[test]
fn orphan_candidate_flags_link_leaving_its_root() {
    let sandbox = Sandbox::new();
    let catalog = sandbox.catalog();
    let outside = sandbox.mkdir("Documents/precious");
    std::os::unix::fs::symlink(&outside, sandbox.path("Library/Caches/org.gone.link"))
        .expect("symlink");
    let orphans = scan_orphans(&catalog, &HashSet::new(), &[]);

    let candidate = orphan_candidate(&orphans[0], &sandbox.home).expect("candidate");

    assert_eq!(candidate.entry_kind, EntryKind::Symlink);
    assert!(candidate.link_escapes_boundary);
}
