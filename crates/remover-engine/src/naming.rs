/// Entry-name suffixes that carry no identity on their own.
const KNOWN_SUFFIXES: [&str; 6] = [
    ".plist",
    ".savedState",
    ".binarycookies",
    ".app",
    ".pkg",
    ".bom",
];

const GENERIC_NAMES: [&str; 5] = ["app", "application", "applications", "program", "the"];

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases, collapses whitespace and drops a trailing `.app`.
pub fn normalize_display_name(value: &str) -> String {
    let collapsed = collapse_whitespace(value);
    let stripped = strip_suffix_ignore_case(collapsed.as_str(), ".app").unwrap_or(&collapsed);
    collapse_whitespace(stripped).to_lowercase()
}

pub(crate) fn strip_known_suffix(name: &str) -> &str {
    for suffix in KNOWN_SUFFIXES {
        if let Some(stripped) = strip_suffix_ignore_case(name, suffix)
            && !stripped.is_empty()
        {
            return stripped;
        }
    }
    name
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = value.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Whole-word tokens; only non-alphanumeric characters separate words, so
/// `FooBar` stays one token.
pub(crate) fn word_tokens(value: &str) -> Vec<String> {
    value
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub(crate) fn is_generic_name(value: &str) -> bool {
    GENERIC_NAMES.contains(&value)
}

pub(crate) fn push_unique(target: &mut Vec<String>, value: String) {
    if !target.iter().any(|existing| *existing == value) {
        target.push(value);
    }
}
