use super::*;
use crate::naming::{collapse_whitespace, is_generic_name, push_unique, word_tokens};

const MIN_MATCHABLE_NAME_CHARS: usize = 3;
const MIN_BUNDLE_ID_CHARS: usize = 3;
const MIN_FRAGMENT_CHARS: usize = 2;

/// Turns whatever the shell knows about an application into a matching
/// identity. A bundle manifest found at the install path fills in what the
/// reference leaves out; a bundle id given by the caller always wins.
pub fn resolve_identity(reference: &ApplicationReference) -> AppResult<Identity> {
    let manifest = reference
        .install_path
        .as_deref()
        .and_then(read_bundle_manifest);

    let bundle_id = non_empty(reference.bundle_id.as_deref())
        .or_else(|| {
            manifest
                .as_ref()
                .and_then(|value| non_empty(value.bundle_id.as_deref()))
        })
        .filter(|value| {
            let accepted = value.chars().count() >= MIN_BUNDLE_ID_CHARS;
            if !accepted {
                tracing::warn!(event = "identity_bundle_id_ignored", bundle_id = %value);
            }
            accepted
        });

    let display_name = non_empty(Some(reference.display_name.as_str()))
        .or_else(|| {
            manifest.as_ref().and_then(|value| {
                non_empty(value.display_name.as_deref())
                    .or_else(|| non_empty(value.bundle_name.as_deref()))
            })
        })
        .or_else(|| {
            reference
                .install_path
                .as_deref()
                .and_then(Path::file_stem)
                .and_then(|value| value.to_str())
                .and_then(|value| non_empty(Some(value)))
        })
        .map(|value| collapse_whitespace(value.as_str()))
        .unwrap_or_default();

    let normalized_name = normalize_display_name(display_name.as_str());
    let specific_fragments = specific_name_fragments(normalized_name.as_str());
    // A name made only of generic words would match unrelated data.
    let name_matchable = normalized_name.chars().count() >= MIN_MATCHABLE_NAME_CHARS
        && !is_generic_name(normalized_name.as_str())
        && !specific_fragments.is_empty();

    if bundle_id.is_none() && !name_matchable {
        return Err(engine_error(
            EngineErrorCode::UnresolvableIdentity,
            "application has neither a bundle identifier nor a usable name",
        )
        .with_context("displayName", display_name));
    }

    let fragments = if name_matchable {
        specific_fragments
    } else {
        Vec::new()
    };
    let vendor = bundle_id.as_deref().and_then(vendor_of);

    let identity = Identity {
        display_name,
        normalized_name,
        bundle_id,
        vendor,
        fragments,
        install_path: reference.install_path.clone(),
        name_matchable,
    };
    tracing::debug!(
        event = "identity_resolved",
        name = %identity.normalized_name,
        bundle_id = identity.bundle_id.as_deref().unwrap_or_default(),
        fragments = identity.fragments.len(),
        name_matchable = identity.name_matchable
    );
    Ok(identity)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Whole-word tokens of at least two characters, generic words removed.
fn specific_name_fragments(normalized_name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for token in word_tokens(normalized_name) {
        if token.chars().count() >= MIN_FRAGMENT_CHARS && !is_generic_name(token.as_str()) {
            push_unique(&mut tokens, token);
        }
    }
    tokens
}

/// Second component of a reverse-DNS identifier (`com.acme.foo` -> `acme`).
fn vendor_of(bundle_id: &str) -> Option<String> {
    let parts = bundle_id.split('.').collect::<Vec<_>>();
    if parts.len() < 3 {
        return None;
    }
    non_empty(Some(parts[1])).map(|value| value.to_lowercase())
}

#[cfg(test)]
#[path = "../tests/identity/identity_tests.rs"]
mod identity_tests;
