use super::*;
use crate::test_support::{candidate, test_policy};

const GIB: u64 = 1024 * 1024 * 1024;

fn user_support(name: &str) -> PathBuf {
    PathBuf::from("/Users/alex/Library/Application Support").join(name)
}

#[test]
fn exact_name_support_dir_is_safe() {
    let item = classify_candidate(
        candidate(&user_support("Foo"), PathRootKind::UserSupport, MatchMethod::ExactName),
        &test_policy(),
    );

    assert_eq!(item.tier, RiskTier::Safe);
    assert!(item.reasons.is_empty());
}

#[test]
fn oversized_fragment_match_is_caution() {
    let mut found = candidate(
        &user_support("Foo Helper"),
        PathRootKind::UserSupport,
        MatchMethod::Fragment,
    );
    found.confidence = 0.5;
    found.size_bytes = 2 * GIB;

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Caution);
    assert!(item.reasons.contains(&RiskReason::ModerateConfidence));
    assert!(item.reasons.contains(&RiskReason::OversizedMatch {
        size_bytes: 2 * GIB,
        threshold_bytes: GIB,
    }));
}

#[test]
fn oversized_exact_name_drops_to_caution() {
    let mut found = candidate(&user_support("Foo"), PathRootKind::UserSupport, MatchMethod::ExactName);
    found.size_bytes = 2 * GIB;

    assert_eq!(classify_candidate(found, &test_policy()).tier, RiskTier::Caution);
}

#[test]
fn exact_id_stays_safe_regardless_of_size_and_root() {
    for kind in PathRootKind::ALL {
        let mut found = candidate(
            &PathBuf::from("/opt/data/com.acme.foo"),
            kind,
            MatchMethod::ExactId,
        );
        found.size_bytes = 50 * GIB;

        let item = classify_candidate(found, &test_policy());

        assert_eq!(item.tier, RiskTier::Safe, "root kind {}", kind.as_str());
    }
}

#[test]
fn exact_id_is_excluded_only_by_denylist() {
    let found = candidate(
        &PathBuf::from("/Library/Frameworks/com.acme.foo"),
        PathRootKind::SharedSupport,
        MatchMethod::ExactId,
    );

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(matches!(
        item.reasons.first(),
        Some(RiskReason::DenylistOverlap { .. })
    ));
}

#[test]
fn relative_fragment_matches_any_component_run() {
    let found = candidate(
        &PathBuf::from("/Users/alex/Library/Keychains/Foo"),
        PathRootKind::UserSupport,
        MatchMethod::ExactName,
    );

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(item.reasons.contains(&RiskReason::DenylistOverlap {
        fragment: "Keychains".to_string(),
    }));
}

#[test]
fn apple_receipts_are_excluded_by_prefix_fragment() {
    let found = candidate(
        &PathBuf::from("/private/var/db/receipts/com.apple.pkg.Foo.bom"),
        PathRootKind::SystemReceipts,
        MatchMethod::ExactId,
    );

    assert_eq!(classify_candidate(found, &test_policy()).tier, RiskTier::Excluded);
}

#[test]
fn protected_name_prefix_is_excluded() {
    let found = candidate(
        &PathBuf::from("/Users/alex/Library/Preferences/com.apple.foo.plist"),
        PathRootKind::UserPreferences,
        MatchMethod::ExactId,
    );

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(item.reasons.contains(&RiskReason::ProtectedNamePrefix {
        prefix: "com.apple.".to_string(),
    }));
}

#[test]
fn fragment_match_in_system_scope_is_excluded() {
    let found = candidate(
        &PathBuf::from("/Library/Application Support/Foo Helper"),
        PathRootKind::SharedSupport,
        MatchMethod::Fragment,
    );

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(item.reasons.contains(&RiskReason::SystemScopeRequiresExactId));
}

#[test]
fn fragment_match_on_bundle_root_is_excluded() {
    let found = candidate(
        &PathBuf::from("/Applications/Foo Helper.app"),
        PathRootKind::Bundle,
        MatchMethod::Fragment,
    );

    let item = classify_candidate(found, &test_policy());

    assert!(item.reasons.contains(&RiskReason::BundleFragmentMatch));
    assert_eq!(item.tier, RiskTier::Excluded);
}

#[test]
fn escaping_symlink_is_excluded() {
    let mut found = candidate(&user_support("Foo"), PathRootKind::UserSupport, MatchMethod::ExactName);
    found.entry_kind = EntryKind::Symlink;
    found.link_escapes_boundary = true;

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(item.reasons.contains(&RiskReason::LinkEscapesBoundary));
}

#[test]
fn protected_paths_and_other_bundles_are_excluded() {
    let mut policy = test_policy().with_other_bundle_roots(vec![PathBuf::from("/Applications/Bar.app")]);
    policy.protected_paths = vec![PathBuf::from("/Users/alex/Documents")];

    let documents = candidate(
        &PathBuf::from("/Users/alex/Documents"),
        PathRootKind::UserSupport,
        MatchMethod::ExactName,
    );
    let inside_bar = candidate(
        &PathBuf::from("/Applications/Bar.app/Contents/Foo"),
        PathRootKind::Bundle,
        MatchMethod::ExactName,
    );

    let classified = classify(vec![documents, inside_bar], &policy);

    assert!(classified.iter().all(|item| item.tier == RiskTier::Excluded));
    assert!(matches!(
        classified[0].reasons[0],
        RiskReason::ProtectedPath { .. }
    ));
    assert!(matches!(
        classified[1].reasons[0],
        RiskReason::OtherApplicationBundle { .. }
    ));
}

#[test]
fn low_confidence_is_excluded() {
    let mut found = candidate(&user_support("Foo"), PathRootKind::UserSupport, MatchMethod::Fragment);
    found.confidence = 0.3;

    let item = classify_candidate(found, &test_policy());

    assert_eq!(item.tier, RiskTier::Excluded);
    assert!(item.reasons.contains(&RiskReason::LowConfidence));
}

#[test]
fn classification_is_deterministic() {
    let found = candidate(&user_support("Foo Helper"), PathRootKind::UserSupport, MatchMethod::Fragment);

    let first = classify_candidate(found.clone(), &test_policy());
    let second = classify_candidate(found, &test_policy());

    assert_eq!(first, second);
}

#[test]
fn policy_from_settings_protects_home_and_catalog_roots() {
    let catalog = PathCatalog::new(
        "/Users/alex",
        vec![CatalogEntry::new(PathRootKind::UserCache, "~/Library/Caches")],
    );
    let policy = RiskPolicy::from_settings(&EngineSettings::default(), &catalog);

    let home = candidate(&PathBuf::from("/Users/alex"), PathRootKind::UserSupport, MatchMethod::ExactName);
    let root = candidate(
        &PathBuf::from("/Users/alex/Library/Caches"),
        PathRootKind::UserCache,
        MatchMethod::ExactId,
    );

    assert_eq!(classify_candidate(home, &policy).tier, RiskTier::Excluded);
    assert_eq!(classify_candidate(root, &policy).tier, RiskTier::Excluded);
}
