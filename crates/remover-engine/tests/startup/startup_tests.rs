use super::*;
use crate::test_support::Sandbox;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct RecordingControl {
    unloaded: Mutex<Vec<(PathBuf, bool)>>,
}

impl ServiceControl for RecordingControl {
    fn unload(&self, item: &StartupItem, persist: bool) -> io::Result<()> {
        self.unloaded
            .lock()
            .expect("lock")
            .push((item.path.clone(), persist));
        Ok(())
    }
}

fn agent_plist(label: &str, extra: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n\t<key>Label</key>\n\t<string>{label}</string>\n\t<key>ProgramArguments</key>\n\t<array>\n\t\t<string>/opt/acme/bin/agent</string>\n\t\t<string>--quiet</string>\n\t</array>\n{extra}</dict>\n</plist>\n"
    )
}

fn user_agents(sandbox: &Sandbox) -> StartupLocation {
    StartupLocation::new(
        sandbox.mkdir("Library/LaunchAgents"),
        StartupKind::LaunchAgent,
        RootScope::User,
    )
}

fn write_text(path: &Path, content: &str) {
    fs::write(path, content).expect("write startup item");
}

#[test]
fn list_reads_plist_fields_and_skips_protected_names() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    write_text(
        &location.dir.join("com.acme.agent.plist"),
        agent_plist("com.acme.agent", "").as_str(),
    );
    write_text(
        &location.dir.join("com.apple.something.plist"),
        agent_plist("com.apple.something", "").as_str(),
    );
    write_text(&location.dir.join("notes.txt"), "not a job");

    let items = list_startup_items(&[location], &["com.apple.".to_string()]);

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "com.acme.agent");
    assert_eq!(items[0].label.as_deref(), Some("com.acme.agent"));
    assert_eq!(items[0].program.as_deref(), Some("/opt/acme/bin/agent"));
    assert_eq!(items[0].kind, StartupKind::LaunchAgent);
    assert!(!items[0].disabled);
    assert!(!items[0].requires_elevation);
}

#[test]
fn list_reads_desktop_entries_and_their_hidden_flag() {
    let sandbox = Sandbox::new();
    let location = StartupLocation::new(
        sandbox.mkdir(".config/autostart"),
        StartupKind::Autostart,
        RootScope::User,
    );
    write_text(
        &location.dir.join("syncer.desktop"),
        "[Desktop Entry]\nType=Application\nName=Syncer\nExec=/usr/bin/syncer --tray\nHidden=true\n",
    );
    write_text(
        &location.dir.join("other.desktop"),
        "[Desktop Entry]\nName=Other\nExec=other\nX-GNOME-Autostart-enabled=true\n",
    );

    let items = list_startup_items(&[location], &[]);

    let names = items.iter().map(|item| item.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Other", "Syncer"]);
    assert!(!items[0].disabled);
    assert!(items[1].disabled);
    assert_eq!(items[1].program.as_deref(), Some("/usr/bin/syncer --tray"));
}

#[test]
fn missing_location_lists_nothing() {
    let sandbox = Sandbox::new();
    let location = StartupLocation::new(
        sandbox.path("nowhere"),
        StartupKind::LaunchDaemon,
        RootScope::System,
    );

    assert!(list_startup_items(&[location], &[]).is_empty());
}

#[test]
fn disable_adds_disabled_key_and_keeps_file() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    let path = location.dir.join("com.acme.agent.plist");
    write_text(&path, agent_plist("com.acme.agent", "").as_str());
    let control = RecordingControl::default();
    let item = find_startup_item(std::slice::from_ref(&location), &[], &path).expect("item");

    let disabled = disable_startup_item(&item, &location, &control).expect("disable");

    assert!(disabled.disabled);
    assert!(path.exists());
    let content = fs::read_to_string(&path).expect("read");
    assert!(content.contains("<key>Disabled</key>\n\t<true/>\n</dict>"));
    assert!(content.contains("<string>com.acme.agent</string>"));
    assert_eq!(
        *control.unloaded.lock().expect("lock"),
        vec![(path.clone(), true)]
    );
}

#[test]
fn disable_flips_existing_false_flag() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    let path = location.dir.join("com.acme.agent.plist");
    write_text(
        &path,
        agent_plist("com.acme.agent", "\t<key>Disabled</key>\n\t<false/>\n").as_str(),
    );
    let item = find_startup_item(std::slice::from_ref(&location), &[], &path).expect("item");

    disable_startup_item(&item, &location, &RecordingControl::default()).expect("disable");

    let content = fs::read_to_string(&path).expect("read");
    assert!(!content.contains("<false/>"));
    assert_eq!(content.matches("<key>Disabled</key>").count(), 1);
}

#[test]
fn disable_sets_hidden_in_desktop_entry_group_only() {
    let sandbox = Sandbox::new();
    let location = StartupLocation::new(
        sandbox.mkdir(".config/autostart"),
        StartupKind::Autostart,
        RootScope::User,
    );
    let path = location.dir.join("syncer.desktop");
    write_text(
        &path,
        "[Desktop Entry]\nName=Syncer\nExec=syncer\nHidden=false\n\n[Desktop Action Quit]\nName=Quit\n",
    );
    let item = find_startup_item(std::slice::from_ref(&location), &[], &path).expect("item");

    let disabled =
        disable_startup_item(&item, &location, &RecordingControl::default()).expect("disable");

    assert!(disabled.disabled);
    let content = fs::read_to_string(&path).expect("read");
    assert_eq!(
        content,
        "[Desktop Entry]\nName=Syncer\nExec=syncer\nHidden=true\n\n[Desktop Action Quit]\nName=Quit\n"
    );
}

#[test]
fn disable_rejects_binary_plist() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    let path = location.dir.join("com.acme.binary.plist");
    fs::write(&path, b"bplist00\xd1\x01\x02").expect("write");
    let item = find_startup_item(std::slice::from_ref(&location), &[], &path).expect("item");

    let error = disable_startup_item(&item, &location, &RecordingControl::default())
        .expect_err("binary plist");

    assert_eq!(error.code, EngineErrorCode::StartupFormatUnsupported.as_str());
    assert_eq!(fs::read(&path).expect("read"), b"bplist00\xd1\x01\x02");
}

#[test]
fn find_rejects_paths_that_are_not_listed() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    let stray = sandbox.write("Library/Preferences/com.acme.agent.plist", 4);

    let error = find_startup_item(&[location], &[], &stray).expect_err("not listed");

    assert_eq!(error.code, EngineErrorCode::StartupItemNotFound.as_str());
}

#[test]
fn startup_candidate_is_exact_and_tagged() {
    let sandbox = Sandbox::new();
    let location = user_agents(&sandbox);
    let path = location.dir.join("com.acme.agent.plist");
    write_text(&path, agent_plist("com.acme.agent", "").as_str());
    let item = find_startup_item(std::slice::from_ref(&location), &[], &path).expect("item");

    let candidate = startup_candidate(&item, &location, &sandbox.home).expect("candidate");

    assert_eq!(candidate.match_method, MatchMethod::ExactId);
    assert_eq!(candidate.root_kind, PathRootKind::UserLaunchAgents);
    assert_eq!(candidate.entry_kind, EntryKind::File);
    assert_eq!(candidate.evidence, vec!["startup:com.acme.agent".to_string()]);
    assert!(!candidate.link_escapes_boundary);
}
