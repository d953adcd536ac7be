//! Naming utilities shared by the builders.

use lazy_static::lazy_static;
use regex::Regex;

/// The maximum length of a generated entity name.
pub const MAX_NAME_LEN: usize = 63;

lazy_static! {
    /// Regular expression which generated entity names must match.
    pub static ref RE_ENTITY_NAME: Regex = Regex::new(r"^[a-z0-9-]+$").expect("failed to compile RE_ENTITY_NAME regex");
    /// Regular expression matching runs of characters disallowed in entity names.
    static ref RE_NAME_DISALLOWED: Regex = Regex::new(r"[^a-z0-9-]+").expect("failed to compile RE_NAME_DISALLOWED regex");
    /// Regular expression matching runs of hyphens.
    static ref RE_HYPHENS: Regex = Regex::new(r"-{2,}").expect("failed to compile RE_HYPHENS regex");
    /// Regular expression matching `{{ name }}` style placeholders.
    /// Regular expression matching keys which can be addressed with dot syntax in expressions.
    static ref RE_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("failed to compile RE_IDENTIFIER regex");
    static ref RE_PLACEHOLDER: Regex = Regex::new(r"^\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}$").expect("failed to compile RE_PLACEHOLDER regex");
}

/// Normalize the given text into an entity name made of lowercase letters, digits & hyphens.
///
/// Disallowed character runs collapse into a single hyphen, leading & trailing hyphens are
/// trimmed, and the output is truncated to [`MAX_NAME_LEN`].
pub fn normalize_name(text: &str) -> String {
    let lower = text.to_lowercase();
    let replaced = RE_NAME_DISALLOWED.replace_all(&lower, "-");
    let collapsed = RE_HYPHENS.replace_all(&replaced, "-");
    let mut name: String = collapsed.trim_matches('-').chars().take(MAX_NAME_LEN).collect();
    while name.ends_with('-') {
        name.pop();
    }
    name
}

/// Check if the given name is a valid entity name.
pub fn is_valid_name(name: &str) -> bool {
    RE_ENTITY_NAME.is_match(name)
}

/// Normalize a tag value, returning `None` for tags which normalize to nothing.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let tag = normalize_name(tag.trim());
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

/// Turn a field key into a human readable title.
///
/// camelCase, PascalCase, snake_case & kebab-case keys are split into words, and each word is
/// title-cased: `maxConnections` → `Max Connections`, `db_engine` → `Db Engine`.
pub fn humanize(key: &str) -> String {
    split_words(key)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split an identifier into its words.
fn split_words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let (mut words, last) = chars.iter().enumerate().fold((Vec::new(), String::new()), |(mut words, mut current), (idx, ch)| {
        if *ch == '_' || *ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            return (words, current);
        }
        let prev = idx.checked_sub(1).map(|prev| chars[prev]);
        let next = chars.get(idx + 1);
        let boundary = ch.is_uppercase()
            && !current.is_empty()
            && (prev.map(|p| p.is_lowercase() || p.is_ascii_digit()).unwrap_or(false)
                || next.map(|n| n.is_lowercase()).unwrap_or(false) && prev.map(char::is_uppercase).unwrap_or(false));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(*ch);
        (words, current)
    });
    if !last.is_empty() {
        words.push(last);
    }
    words
}

/// Whether the given key can be addressed with dot syntax in an expression.
pub fn is_identifier(key: &str) -> bool {
    RE_IDENTIFIER.is_match(key)
}

/// Extract the referenced name of a `{{ name }}` placeholder, if the text is one.
pub fn placeholder_target(text: &str) -> Option<&str> {
    RE_PLACEHOLDER.captures(text.trim()).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}
