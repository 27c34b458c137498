use super::*;
use crate::test_support::Sandbox;

#[test]
fn resolve_identity_normalizes_name_and_derives_vendor() {
    let reference = ApplicationReference::named("  Foo   Studio.app ").with_bundle_id("com.Acme.foo");
    let identity = resolve_identity(&reference).expect("identity");

    assert_eq!(identity.display_name, "Foo Studio.app");
    assert_eq!(identity.normalized_name, "foo studio");
    assert_eq!(identity.bundle_id.as_deref(), Some("com.Acme.foo"));
    assert_eq!(identity.vendor.as_deref(), Some("acme"));
    assert_eq!(identity.fragments, vec!["foo", "studio"]);
    assert!(identity.name_matchable);
}

#[test]
fn resolve_identity_reads_bundle_manifest_when_reference_is_bare() {
    let sandbox = Sandbox::new();
    let bundle = sandbox.app_bundle("Applications/Foo.app", "com.acme.foo", "Foo");

    let identity =
        resolve_identity(&ApplicationReference::from_install_path(&bundle)).expect("identity");

    assert_eq!(identity.display_name, "Foo");
    assert_eq!(identity.bundle_id.as_deref(), Some("com.acme.foo"));
    assert_eq!(identity.install_path.as_deref(), Some(bundle.as_path()));
}

#[test]
fn resolve_identity_prefers_caller_bundle_id_over_manifest() {
    let sandbox = Sandbox::new();
    let bundle = sandbox.app_bundle("Applications/Foo.app", "com.acme.foo", "Foo");
    let reference = ApplicationReference::from_install_path(&bundle).with_bundle_id("com.acme.other");

    let identity = resolve_identity(&reference).expect("identity");

    assert_eq!(identity.bundle_id.as_deref(), Some("com.acme.other"));
}

#[test]
fn resolve_identity_falls_back_to_install_path_stem() {
    let identity = resolve_identity(&ApplicationReference::from_install_path(
        "/nowhere/Applications/Widget Maker.app",
    ))
    .expect("identity");

    assert_eq!(identity.normalized_name, "widget maker");
    assert!(identity.bundle_id.is_none());
}

#[test]
fn resolve_identity_rejects_short_name_without_bundle_id() {
    let error = resolve_identity(&ApplicationReference::named("Go")).expect_err("must fail");

    assert_eq!(error.code, EngineErrorCode::UnresolvableIdentity.as_str());
    assert_eq!(error.context_value("displayName"), Some("Go"));
}

#[test]
fn resolve_identity_rejects_generic_name_without_bundle_id() {
    let error = resolve_identity(&ApplicationReference::named("App")).expect_err("must fail");

    assert_eq!(error.code, EngineErrorCode::UnresolvableIdentity.as_str());
}

#[test]
fn resolve_identity_rejects_name_made_only_of_generic_words() {
    for name in ["The App", "the application", "App Program"] {
        let error = resolve_identity(&ApplicationReference::named(name)).expect_err(name);

        assert_eq!(error.code, EngineErrorCode::UnresolvableIdentity.as_str(), "{name}");
    }
}

#[test]
fn resolve_identity_with_generic_name_matches_by_bundle_id_only() {
    let identity = resolve_identity(&ApplicationReference::named("The App").with_bundle_id("com.acme.app"))
        .expect("identity");

    assert!(!identity.name_matchable);
    assert!(identity.fragments.is_empty());
    assert!(match_entry_name(&identity, "The App Store Helper", None).is_none());
    assert!(match_entry_name(&identity, "com.acme.app", None).is_some());
}

#[test]
fn resolve_identity_keeps_bundle_id_when_name_is_too_short() {
    let identity = resolve_identity(&ApplicationReference::named("Go").with_bundle_id("io.go.ide"))
        .expect("identity");

    assert!(!identity.name_matchable);
    assert!(identity.fragments.is_empty());
    assert_eq!(identity.vendor.as_deref(), Some("go"));
}

#[test]
fn resolve_identity_drops_generic_fragments_when_specific_ones_remain() {
    let identity = resolve_identity(&ApplicationReference::named("The Foo App")).expect("identity");

    assert_eq!(identity.fragments, vec!["foo"]);
}

#[test]
fn resolve_identity_ignores_one_character_fragments() {
    let identity = resolve_identity(&ApplicationReference::named("X Foo Editor")).expect("identity");

    assert_eq!(identity.fragments, vec!["foo", "editor"]);
}

#[test]
fn resolve_identity_has_no_vendor_for_two_part_ids() {
    let identity =
        resolve_identity(&ApplicationReference::named("Discord").with_bundle_id("com.discord"))
            .expect("identity");

    assert!(identity.vendor.is_none());
}
