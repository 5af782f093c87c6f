//! Structured docstring fields (`:CaseComponent:`, `:CaseImportance:`,
//! `:BZ:`, `:JR:`).

use std::sync::OnceLock;

use regex::Regex;

/// Metadata fields found in one docstring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocFields {
    /// First `:CaseComponent:` value.
    pub component: Option<String>,
    /// First `:CaseImportance:` value.
    pub importance: Option<String>,
    /// Bugzilla ids listed on the last `:BZ:` line.
    pub bz: Vec<String>,
    /// Jira keys listed on the last `:JR:` line.
    pub jr: Vec<String>,
}

fn field_pattern(name: &str) -> Regex {
    // Values stop at end of line; an empty field never swallows the next line.
    Regex::new(&format!(r"(?im)^[ \t]*:{name}:[ \t]*(?P<value>.*?)[ \t]*$"))
        .expect("valid field regex")
}

fn component_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| field_pattern("CaseComponent"))
}

fn importance_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| field_pattern("CaseImportance"))
}

fn bz_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| field_pattern("BZ"))
}

fn jr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| field_pattern("JR"))
}

fn first_token(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures_iter(text)
        .find_map(|c| c["value"].split_whitespace().next().map(str::to_string))
}

fn last_list(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .last()
        .map(|c| {
            c["value"]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses the metadata fields of a docstring.
#[must_use]
pub fn parse(docstring: &str) -> DocFields {
    DocFields {
        component: first_token(component_pattern(), docstring),
        importance: first_token(importance_pattern(), docstring),
        bz: last_list(bz_pattern(), docstring),
        jr: last_list(jr_pattern(), docstring),
    }
}

/// The first `:CaseComponent:` anywhere in `text` (e.g. a whole module source).
#[must_use]
pub fn find_component(text: &str) -> Option<String> {
    first_token(component_pattern(), text)
}

/// Slug used for component filtering: first comma-separated component,
/// punctuation and spaces dropped, lowercased.
#[must_use]
pub fn component_slug(component: &str) -> String {
    component
        .split(',')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, ' ' | '&' | '/' | '-' | '(' | ')'))
        .collect::<String>()
        .to_lowercase()
}
