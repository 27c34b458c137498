use super::*;
use crate::test_support::{Sandbox, candidate, test_policy};

fn plan_for(paths: &[PathBuf]) -> RemovalPlan {
    let classified = paths
        .iter()
        .map(|path| {
            let mut found = candidate(path, PathRootKind::UserSupport, MatchMethod::ExactName);
            found.size_bytes = path_size_bytes(path).size_bytes;
            ClassifiedCandidate {
                candidate: found,
                tier: RiskTier::Safe,
                reasons: Vec::new(),
            }
        })
        .collect::<Vec<_>>();
    RemovalPlan::build(&classified, paths, &test_policy()).expect("plan")
}

/// Fails with permission denied for one path, deletes everything else.
struct DenyOne(PathBuf);

impl EntryRemover for DenyOne {
    fn remove(&self, path: &Path, entry_kind: EntryKind) -> io::Result<()> {
        if path == self.0 {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        FsEntryRemover.remove(path, entry_kind)
    }
}

#[test]
fn permanent_removal_deletes_entries_and_reports_reclaimed_bytes() {
    let sandbox = Sandbox::new();
    let dir = sandbox.mkdir("Library/Application Support/Foo");
    sandbox.write("Library/Application Support/Foo/a.bin", 30);
    let file = sandbox.write("Library/Preferences/com.acme.foo.plist", 12);
    let plan = plan_for(&[dir.clone(), file.clone()]);

    let result = execute_plan(
        &plan,
        RemovalMode::Permanent,
        &sandbox.staging(),
        "Foo",
        &CancelFlag::new(),
    )
    .expect("execute");

    assert_eq!(result.removed_count(), 2);
    assert_eq!(result.reclaimed_bytes, 42);
    assert!(result.batch_id.is_none());
    assert!(!dir.exists());
    assert!(!file.exists());
    assert!(!sandbox.staging().root().exists());
}

#[test]
fn one_failing_item_does_not_stop_the_rest() {
    let sandbox = Sandbox::new();
    let first = sandbox.write("Library/Caches/Foo/one", 1);
    let denied = sandbox.write("Library/Caches/Foo/two", 1);
    let third = sandbox.write("Library/Caches/Foo/three", 1);
    let plan = plan_for(&[first.clone(), denied.clone(), third.clone()]);

    let result = execute_plan_with(
        &plan,
        RemovalMode::Permanent,
        &sandbox.staging(),
        "Foo",
        &CancelFlag::new(),
        &DenyOne(denied.clone()),
    )
    .expect("execute");

    assert_eq!(result.items.len(), 3);
    assert_eq!(result.removed_count(), 2);
    assert_eq!(result.failed_count(), 1);
    let failed = result
        .items
        .iter()
        .find(|item| item.path == denied)
        .expect("denied item");
    assert!(matches!(
        failed.outcome,
        RemovalOutcome::Failed {
            reason: FailureReason::PermissionDenied,
            ..
        }
    ));
    assert_eq!(
        EngineErrorCode::for_removal_outcome(&failed.outcome),
        Some(EngineErrorCode::PermissionDenied)
    );
    assert!(denied.exists());
    assert!(!first.exists());
    assert!(!third.exists());
}

#[test]
fn vanished_and_changed_entries_are_skipped() {
    let sandbox = Sandbox::new();
    let gone = sandbox.write("Library/Caches/Foo.tmp", 1);
    let changed = sandbox.write("Library/Caches/Foo", 1);
    let plan = plan_for(&[gone.clone(), changed.clone()]);
    fs::remove_file(&gone).expect("remove");
    fs::remove_file(&changed).expect("remove");
    fs::create_dir_all(&changed).expect("replace with dir");

    let result = execute_plan(
        &plan,
        RemovalMode::Permanent,
        &sandbox.staging(),
        "Foo",
        &CancelFlag::new(),
    )
    .expect("execute");

    let outcome_of = |path: &Path| {
        result
            .items
            .iter()
            .find(|item| item.path == path)
            .map(|item| item.outcome.clone())
    };
    assert_eq!(
        outcome_of(&gone),
        Some(RemovalOutcome::Skipped {
            reason: SkipReason::NotFound
        })
    );
    assert_eq!(
        outcome_of(&changed),
        Some(RemovalOutcome::Skipped {
            reason: SkipReason::StaleCandidate
        })
    );
    assert!(changed.is_dir());
}

#[test]
fn cancelled_execution_skips_every_remaining_item() {
    let sandbox = Sandbox::new();
    let file = sandbox.write("Library/Caches/Foo", 1);
    let plan = plan_for(std::slice::from_ref(&file));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = execute_plan(&plan, RemovalMode::Staged, &sandbox.staging(), "Foo", &cancel)
        .expect("execute");

    assert!(result.cancelled);
    assert_eq!(
        result.items[0].outcome,
        RemovalOutcome::Skipped {
            reason: SkipReason::Cancelled
        }
    );
    assert!(result.batch_id.is_none());
    assert!(file.exists());
}

#[test]
fn staged_removal_fails_before_touching_anything_when_staging_is_unusable() {
    let sandbox = Sandbox::new();
    let file = sandbox.write("Library/Caches/Foo", 1);
    let blocker = sandbox.write("not-a-dir", 1);
    let staging = StagingArea::new(blocker.join("staging"), std::time::Duration::from_secs(60));
    let plan = plan_for(std::slice::from_ref(&file));

    let error = execute_plan(&plan, RemovalMode::Staged, &staging, "Foo", &CancelFlag::new())
        .expect_err("staging must fail");

    assert_eq!(error.code, EngineErrorCode::StagingFailure.as_str());
    assert!(file.exists());
}

#[test]
fn staged_removal_round_trips_through_restore() {
    let sandbox = Sandbox::new();
    let dir = sandbox.mkdir("Library/Application Support/Foo");
    sandbox.write("Library/Application Support/Foo/nested/data.bin", 20);
    let inner = sandbox.write("Library/Application Support/Foo/top.txt", 5);
    let plist = sandbox.write("Library/Preferences/com.acme.foo.plist", 7);
    let plan = plan_for(&[dir.clone(), inner.clone(), plist.clone()]);
    let staging = sandbox.staging();

    let removed = execute_plan(&plan, RemovalMode::Staged, &staging, "Foo", &CancelFlag::new())
        .expect("execute");

    assert_eq!(removed.removed_count(), 3);
    let batch_id = removed.batch_id.clone().expect("batch id");
    assert!(!dir.exists());
    assert!(!plist.exists());
    assert!(removed.items.iter().all(|item| item.staged_path.is_some()));

    let restored = staging
        .restore(batch_id.as_str(), now_unix_millis())
        .expect("restore");

    assert!(restored.is_complete());
    assert_eq!(restored.restored_count(), 3);
    assert_eq!(fs::read(&inner).expect("inner").len(), 5);
    assert_eq!(
        fs::read(dir.join("nested/data.bin")).expect("nested").len(),
        20
    );
    assert_eq!(fs::read(&plist).expect("plist").len(), 7);
    assert!(!staging.root().join(batch_id.as_str()).exists());
}
