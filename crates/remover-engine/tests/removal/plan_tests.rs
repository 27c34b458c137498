use super::*;
use crate::test_support::{candidate, test_policy};

fn classified(path: &str, kind: EntryKind, tier: RiskTier) -> ClassifiedCandidate {
    let mut found = candidate(Path::new(path), PathRootKind::UserSupport, MatchMethod::ExactName);
    found.entry_kind = kind;
    found.size_bytes = 10;
    ClassifiedCandidate {
        candidate: found,
        tier,
        reasons: Vec::new(),
    }
}

#[test]
fn build_orders_descendants_before_ancestors_and_files_before_dirs() {
    let items = vec![
        classified("/data/Foo", EntryKind::Directory, RiskTier::Safe),
        classified("/data/Foo/cache", EntryKind::Directory, RiskTier::Safe),
        classified("/data/Foo/cache/blob", EntryKind::File, RiskTier::Safe),
        classified("/data/Foo/settings.json", EntryKind::File, RiskTier::Caution),
        classified("/data/Bar.plist", EntryKind::File, RiskTier::Safe),
    ];
    let confirmed = items
        .iter()
        .map(|item| item.candidate.path.clone())
        .collect::<Vec<_>>();

    let plan = RemovalPlan::build(&items, &confirmed, &test_policy()).expect("plan");

    let order = plan
        .items()
        .iter()
        .map(|item| item.candidate.path.to_string_lossy().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        order,
        vec![
            "/data/Foo/cache/blob",
            "/data/Foo/settings.json",
            "/data/Foo/cache",
            "/data/Bar.plist",
            "/data/Foo",
        ]
    );
    assert_eq!(plan.total_bytes(), 50);
}

#[test]
fn build_rejects_excluded_candidates() {
    let items = vec![classified("/data/Foo", EntryKind::Directory, RiskTier::Excluded)];

    let error = RemovalPlan::build(&items, &[PathBuf::from("/data/Foo")], &test_policy()).expect_err("must fail");

    assert_eq!(error.code, EngineErrorCode::PlanContainsExcluded.as_str());
}

#[test]
fn build_rejects_paths_that_were_never_classified() {
    let items = vec![classified("/data/Foo", EntryKind::Directory, RiskTier::Safe)];

    let error = RemovalPlan::build(&items, &[PathBuf::from("/etc")], &test_policy()).expect_err("must fail");

    assert_eq!(error.code, EngineErrorCode::PlanUnknownCandidate.as_str());
}

#[test]
fn build_deduplicates_confirmed_paths() {
    let items = vec![classified("/data/Foo", EntryKind::Directory, RiskTier::Safe)];
    let path = PathBuf::from("/data/Foo");

    let plan = RemovalPlan::build(&items, &[path.clone(), path], &test_policy()).expect("plan");

    assert_eq!(plan.len(), 1);
}

#[test]
fn from_tiers_and_leftovers_select_by_tier_and_root() {
    let mut bundle = classified("/Applications/Foo.app", EntryKind::Directory, RiskTier::Safe);
    bundle.candidate.root_kind = PathRootKind::Bundle;
    let items = vec![
        bundle,
        classified("/data/Foo", EntryKind::Directory, RiskTier::Safe),
        classified("/data/Foo Helper", EntryKind::Directory, RiskTier::Caution),
        classified("/data/com.apple.foo", EntryKind::File, RiskTier::Excluded),
    ];

    let policy = test_policy();

    assert_eq!(RemovalPlan::from_tiers(&items, false, &policy).len(), 2);
    assert_eq!(RemovalPlan::from_tiers(&items, true, &policy).len(), 3);
    let leftovers = RemovalPlan::leftovers(&items, &policy);
    assert_eq!(leftovers.len(), 1);
    assert_eq!(leftovers.items()[0].candidate.path, PathBuf::from("/data/Foo"));
}

#[test]
fn build_rederives_tier_instead_of_trusting_the_caller() {
    let items = vec![classified("/data/com.apple.foo", EntryKind::File, RiskTier::Safe)];

    let error = RemovalPlan::build(&items, &[PathBuf::from("/data/com.apple.foo")], &test_policy())
        .expect_err("must fail");

    assert_eq!(error.code, EngineErrorCode::PlanContainsExcluded.as_str());
    assert!(RemovalPlan::from_tiers(&items, true, &test_policy()).is_empty());
    assert!(RemovalPlan::leftovers(&items, &test_policy()).is_empty());
}

#[test]
fn build_keeps_the_stricter_of_supplied_and_derived_tier() {
    let items = vec![classified("/data/Foo Helper", EntryKind::Directory, RiskTier::Caution)];

    let plan = RemovalPlan::build(&items, &[PathBuf::from("/data/Foo Helper")], &test_policy())
        .expect("plan");

    assert_eq!(plan.items()[0].tier, RiskTier::Caution);
    assert!(RemovalPlan::from_tiers(&items, false, &test_policy()).is_empty());
}
