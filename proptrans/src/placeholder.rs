//! Placeholder extraction, parity checks and protection around translation.
//!
//! A placeholder is a `{...}` group without nested braces (`{0}`, `{name}`).
//! Before text reaches a translator, placeholders and HTML-like tags are
//! swapped for opaque `__PH_<hex>__` tokens and swapped back afterwards.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{[^{}]+\}").unwrap();
    static ref PROTECT_REGEX: Regex = Regex::new(r"<[^<>]+>|\{[^{}]+\}").unwrap();
}

/// Placeholders in occurrence order.
pub fn extract_placeholders(input: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Placeholder multiset: each distinct placeholder with its count.
pub fn signature(input: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for placeholder in extract_placeholders(input) {
        *counts.entry(placeholder).or_insert(0) += 1;
    }
    counts
}

/// True when both strings carry the same placeholders the same number of times.
///
/// Order is ignored so translations may reorder arguments.
pub fn has_placeholder_parity(source: &str, target: &str) -> bool {
    signature(source) == signature(target)
}

pub fn contains_placeholder(input: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(input)
}

/// Token -> original text, valid for one protect/restore cycle.
pub type PlaceholderMapping = HashMap<String, String>;

fn new_token() -> String {
    format!("__PH_{:032x}__", rand::random::<u128>())
}

/// Replaces placeholders and tags with random tokens.
pub fn protect_placeholders(text: &str) -> (String, PlaceholderMapping) {
    let mut mapping = PlaceholderMapping::new();
    let protected = PROTECT_REGEX.replace_all(text, |caps: &regex::Captures<'_>| {
        let token = new_token();
        mapping.insert(token.clone(), caps[0].to_string());
        token
    });
    (protected.into_owned(), mapping)
}

pub fn restore_placeholders(text: &str, mapping: &PlaceholderMapping) -> String {
    mapping
        .iter()
        .fold(text.to_string(), |acc, (token, original)| {
            acc.replace(token, original)
        })
}

/// Strips quotes or brackets the translator wrapped around the whole text.
pub fn clean_translated_text(translated: &str, original: &str) -> String {
    let mut text = translated;
    for (open, close) in [('"', '"'), ('[', ']')] {
        if is_wrapped(text, open, close) && !is_wrapped(original, open, close) {
            text = &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text.to_string()
}

fn is_wrapped(text: &str, open: char, close: char) -> bool {
    text.len() >= open.len_utf8() + close.len_utf8()
        && text.starts_with(open)
        && text.ends_with(close)
}

/// Doubles single quotes for MessageFormat when the source has placeholders.
///
/// Already doubled quotes stay doubled.
pub fn escape_message_format_quotes(source: &str, value: &str) -> String {
    if contains_placeholder(source) {
        value.replace("''", "'").replace('\'', "''")
    } else {
        value.to_string()
    }
}
