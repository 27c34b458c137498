use super::*;
use crate::naming::{strip_known_suffix, word_tokens};

pub const EXACT_ID_CONFIDENCE: f64 = 1.0;
pub const EXACT_NAME_CONFIDENCE: f64 = 0.9;
const FRAGMENT_BASE_TENTHS: u32 = 5;
const FRAGMENT_BONUS_CAP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryMatch {
    pub method: MatchMethod,
    pub confidence: f64,
}

/// 0.5 plus 0.1 per matched fragment, capped at three fragments.
pub fn fragment_confidence(matched_fragments: usize) -> f64 {
    let bonus = matched_fragments.min(FRAGMENT_BONUS_CAP) as u32;
    f64::from(FRAGMENT_BASE_TENTHS + bonus) / 10.0
}

/// Decides whether one directory entry belongs to `identity`.
///
/// `manifest_id` is the identifier declared inside the entry itself (an
/// application bundle's manifest). When both sides carry an identifier and
/// they differ, the entry belongs to another application and never matches.
pub fn match_entry_name(
    identity: &Identity,
    entry_name: &str,
    manifest_id: Option<&str>,
) -> Option<EntryMatch> {
    let stem = strip_known_suffix(entry_name.trim());
    if stem.is_empty() {
        return None;
    }

    if let Some(bundle_id) = identity.bundle_id.as_deref() {
        let id_hit = stem.eq_ignore_ascii_case(bundle_id)
            || manifest_id.is_some_and(|value| value.trim().eq_ignore_ascii_case(bundle_id));
        if id_hit {
            return Some(EntryMatch {
                method: MatchMethod::ExactId,
                confidence: EXACT_ID_CONFIDENCE,
            });
        }
        if manifest_id.is_some_and(|value| !value.trim().is_empty()) {
            return None;
        }
    }

    if !identity.name_matchable {
        return None;
    }

    if normalize_display_name(stem) == identity.normalized_name {
        return Some(EntryMatch {
            method: MatchMethod::ExactName,
            confidence: EXACT_NAME_CONFIDENCE,
        });
    }

    if identity.fragments.is_empty() {
        return None;
    }
    let tokens = word_tokens(stem);
    let all_present = identity
        .fragments
        .iter()
        .all(|fragment| tokens.iter().any(|token| token == fragment));
    if !all_present {
        return None;
    }
    Some(EntryMatch {
        method: MatchMethod::Fragment,
        confidence: fragment_confidence(identity.fragments.len()),
    })
}

#[cfg(test)]
#[path = "../tests/matching/matcher_tests.rs"]
mod matcher_tests;
