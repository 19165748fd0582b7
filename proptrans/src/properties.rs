//! Lossless reader and writer for Java-style `.properties` files.
//!
//! Parsing never fails on decoded text. Each entry keeps the exact text it
//! was read from, so an untouched file serializes back to the same bytes.
//! Once a value changes, the entry is re-emitted using the layout of its
//! original value: escaped `\n`, backslash continuation, or a single line.

use std::{
    collections::BTreeSet,
    fmt,
    io::Write,
};

use crate::{
    error::Error,
    traits::Parser,
    types::{Entry, ParsedLine, Translations, unescape_key},
};

/// An ordered, parsed `.properties` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesFile {
    pub lines: Vec<ParsedLine>,
}

impl PropertiesFile {
    pub fn new(lines: Vec<ParsedLine>) -> Self {
        PropertiesFile { lines }
    }

    /// `key -> value` for every entry; later duplicates win.
    pub fn translations(&self) -> Translations {
        translations_of(&self.lines)
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.entries().map(|e| e.key.clone()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(ParsedLine::as_entry)
    }

    /// Index of the first line holding `key`.
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.key() == Some(key))
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries().find(|e| e.key == key)
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.lines
            .iter_mut()
            .filter_map(ParsedLine::as_entry_mut)
            .find(|e| e.key == key)
    }

    /// Replaces the value of every entry named `key`. Returns whether one existed.
    pub fn set_value(&mut self, key: &str, value: &str) -> bool {
        let mut found = false;
        for entry in self.lines.iter_mut().filter_map(ParsedLine::as_entry_mut) {
            if entry.key == key {
                entry.value = value.to_string();
                found = true;
            }
        }
        found
    }

    /// Inserts a line before `index`, clamped to the end of the file.
    pub fn insert_line(&mut self, index: usize, line: ParsedLine) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
    }

    pub fn serialize(&self) -> String {
        serialize(&self.lines)
    }
}

impl Parser for PropertiesFile {
    fn parse_str(text: &str) -> Self {
        PropertiesFile {
            lines: parse_lines(text),
        }
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(self.serialize().as_bytes())?;
        Ok(())
    }
}

impl fmt::Display for PropertiesFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Parses text into ordered lines plus the derived translations map.
pub fn parse(text: &str) -> (Vec<ParsedLine>, Translations) {
    let lines = parse_lines(text);
    let translations = translations_of(&lines);
    (lines, translations)
}

pub fn translations_of(lines: &[ParsedLine]) -> Translations {
    lines
        .iter()
        .filter_map(ParsedLine::as_entry)
        .map(|e| (e.key.clone(), e.value.clone()))
        .collect()
}

pub fn parse_lines(text: &str) -> Vec<ParsedLine> {
    let physical: Vec<&str> = text.split_inclusive('\n').collect();
    let mut lines = Vec::new();
    let mut i = 0;

    while i < physical.len() {
        let raw = physical[i];
        let content = strip_line_ending(raw);
        let trimmed = content.trim_start();

        if trimmed.is_empty() || trimmed.starts_with(['#', '!']) {
            lines.push(ParsedLine::CommentOrBlank {
                raw_content: raw.to_string(),
            });
            i += 1;
            continue;
        }

        let start = i;
        let (raw_key, separator_group, first_fragment) = split_entry(content);
        let mut value = first_fragment.to_string();
        let mut original_value = first_fragment.to_string();
        let mut verbatim = raw.to_string();
        let mut was_multiline = false;
        i += 1;

        while ends_with_odd_backslashes(&value) {
            was_multiline = true;
            value.pop();
            let Some(next) = physical.get(i) else {
                break;
            };
            let next_content = strip_line_ending(next);
            original_value.push_str(next_content);
            value.push_str(next_content.trim_start());
            verbatim.push_str(next);
            i += 1;
        }

        let entry = Entry {
            key: unescape_key(raw_key.trim_start()),
            raw_key: raw_key.to_string(),
            value,
            original_value,
            line_number: start,
            was_multiline,
            separator_group: separator_group.to_string(),
            verbatim: None,
        }
        .with_verbatim(verbatim);
        lines.push(ParsedLine::Entry(entry));
    }

    lines
}

/// Reassembles lines into file text. Every line but the last is terminated,
/// using the file's own line ending for lines that have none yet.
pub fn serialize(lines: &[ParsedLine]) -> String {
    let newline = dominant_line_ending(lines);
    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        match line {
            ParsedLine::CommentOrBlank { raw_content } => out.push_str(raw_content),
            ParsedLine::Entry(entry) => render_entry(entry, newline, &mut out),
        }
        if idx + 1 < lines.len() && !out.ends_with('\n') {
            out.push_str(newline);
        }
    }
    out
}

/// `"\r\n"` when the first terminated line of the file uses it.
fn dominant_line_ending(lines: &[ParsedLine]) -> &'static str {
    let first = lines.iter().find_map(|line| match line {
        ParsedLine::CommentOrBlank { raw_content } if raw_content.ends_with("\r\n") => Some("\r\n"),
        ParsedLine::CommentOrBlank { raw_content } if raw_content.ends_with('\n') => Some("\n"),
        ParsedLine::CommentOrBlank { .. } => None,
        ParsedLine::Entry(entry) => entry.line_ending(),
    });
    first.unwrap_or("\n")
}

/// Doubles a trailing odd backslash run so it cannot act as a continuation.
fn push_segment(segment: &str, out: &mut String) {
    out.push_str(segment);
    if ends_with_odd_backslashes(segment) {
        out.push('\\');
    }
}

fn render_entry(entry: &Entry, newline: &str, out: &mut String) {
    if let Some(text) = entry.unchanged_text() {
        out.push_str(text);
        return;
    }

    out.push_str(&entry.raw_key);
    out.push_str(entry.effective_separator());
    if entry.original_value.contains("\\n") {
        push_segment(&entry.value.replace('\n', "\\n"), out);
    } else if entry.value.contains('\n') || entry.was_multiline {
        let mut segments = entry.value.split('\n').peekable();
        while let Some(segment) = segments.next() {
            push_segment(segment, out);
            if segments.peek().is_some() {
                out.push_str("\\");
                out.push_str(newline);
            }
        }
    } else {
        push_segment(&entry.value, out);
    }
    out.push_str(entry.line_ending().unwrap_or(newline));
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// True when `s` ends in an odd-length run of backslashes.
pub(crate) fn ends_with_odd_backslashes(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits an entry line into `(raw_key, separator_group, value)`.
///
/// The separator is the first `=` or `:` preceded by an even number of
/// backslashes. Without one, the whole trimmed line is the key.
fn split_entry(content: &str) -> (&str, &str, &str) {
    let mut backslashes = 0usize;
    let mut separator = None;
    for (idx, ch) in content.char_indices() {
        match ch {
            '\\' => backslashes += 1,
            '=' | ':' if backslashes % 2 == 0 => {
                separator = Some(idx);
                break;
            }
            _ => backslashes = 0,
        }
    }

    match separator {
        Some(sep) => {
            let key_end = key_end(&content[..sep]);
            let after = &content[sep + 1..];
            let value_start = sep + 1 + (after.len() - after.trim_start().len());
            (
                &content[..key_end],
                &content[key_end..value_start],
                &content[value_start..],
            )
        }
        None => {
            let key_end = key_end(content);
            (&content[..key_end], &content[key_end..], "")
        }
    }
}

/// End of the key text, keeping a trailing whitespace character that is escaped.
fn key_end(before: &str) -> usize {
    let trimmed = before.trim_end();
    let mut end = trimmed.len();
    if end < before.len() && ends_with_odd_backslashes(trimmed) {
        end += before[end..].chars().next().map_or(0, char::len_utf8);
    }
    end
}
