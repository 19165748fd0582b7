//! Core data model for parsed `.properties` content.
//!
//! A file is an ordered sequence of [`ParsedLine`]s. That sequence is the only
//! source of truth for file order; [`Translations`] is a derived lookup map.

use std::collections::BTreeMap;

/// `key -> current value` view of a parsed file. Last entry wins on duplicates.
pub type Translations = BTreeMap<String, String>;

/// One logical unit of a `.properties` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A comment (`#`, `!`) or blank line, stored verbatim including its newline.
    CommentOrBlank { raw_content: String },
    /// A key/value pair, possibly spanning several physical lines.
    Entry(Entry),
}

impl ParsedLine {
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            ParsedLine::Entry(entry) => Some(entry),
            ParsedLine::CommentOrBlank { .. } => None,
        }
    }

    pub fn as_entry_mut(&mut self) -> Option<&mut Entry> {
        match self {
            ParsedLine::Entry(entry) => Some(entry),
            ParsedLine::CommentOrBlank { .. } => None,
        }
    }

    /// The key of this line if it is an entry.
    pub fn key(&self) -> Option<&str> {
        self.as_entry().map(|e| e.key.as_str())
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, ParsedLine::Entry(_))
    }
}

/// A single key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Logical key with `\:`, `\=`, `\ ` and `\\` unescaped.
    pub key: String,
    /// Key exactly as written, including indentation and escapes.
    pub raw_key: String,
    /// Logical value: continuations joined, escape sequences left untouched.
    pub value: String,
    /// Raw physical fragments of the value, concatenated, before continuation stripping.
    pub original_value: String,
    /// Zero-based index of the first physical line of this entry.
    pub line_number: usize,
    pub was_multiline: bool,
    /// Separator plus surrounding whitespace, e.g. `" = "` or `":"`.
    pub separator_group: String,
    pub(crate) verbatim: Option<Verbatim>,
}

/// Exact text of an entry as read, with the value it decoded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Verbatim {
    text: String,
    value: String,
}

impl Entry {
    /// Creates an entry that has no original formatting to preserve.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Entry {
            raw_key: escape_key(&key),
            key,
            original_value: value.clone(),
            value,
            line_number: 0,
            was_multiline: false,
            separator_group: "=".to_string(),
            verbatim: None,
        }
    }

    pub(crate) fn with_verbatim(mut self, text: String) -> Self {
        self.verbatim = Some(Verbatim {
            text,
            value: self.value.clone(),
        });
        self
    }

    /// The exact source text if the value has not been touched since parsing.
    /// Terminator of the entry as read, `None` for new entries and a final line without one.
    pub(crate) fn line_ending(&self) -> Option<&'static str> {
        let text = &self.verbatim.as_ref()?.text;
        if text.ends_with("\r\n") {
            Some("\r\n")
        } else if text.ends_with('\n') {
            Some("\n")
        } else {
            None
        }
    }

    pub(crate) fn unchanged_text(&self) -> Option<&str> {
        self.verbatim
            .as_ref()
            .filter(|v| v.value == self.value)
            .map(|v| v.text.as_str())
    }

    /// Separator to emit; key-only lines get `=` once they carry a value.
    pub(crate) fn effective_separator(&self) -> &str {
        let has_separator = self.separator_group.contains(['=', ':']);
        if !has_separator && !self.value.is_empty() {
            "="
        } else {
            &self.separator_group
        }
    }
}

/// Escapes characters that would otherwise end or split a key.
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '=' | ':' | ' ' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Reverses the key escapes recognised by the parser. Unknown escapes stay as written.
pub fn unescape_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some(&next @ ('\\' | '=' | ':' | ' ')) => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
