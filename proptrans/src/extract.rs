//! Change detection: which keys of a target file need (re)translation.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    ledger::{FileLedger, LedgerStatus, compute_hash, normalize_value},
    placeholder::escape_message_format_quotes,
    properties::PropertiesFile,
    types::{Entry, ParsedLine, Translations},
};

/// Why a key was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Added by key synchronization in this run.
    NewlyAdded,
    /// Target equals source and identical values are retranslated.
    IdenticalToSource,
    /// Source text changed since the ledger recorded it.
    SourceChanged,
    /// The previous translation was reverted by validation.
    PreviouslyFailed,
    /// A translated value fell back to the source text.
    Regressed,
    /// In the source but not among the target lines.
    MissingFromTarget,
}

/// Texts to translate, each paired with its line position and key.
///
/// A position below `lines.len()` updates that line in place; anything
/// at or above it appends a new entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedTexts {
    pub texts: Vec<String>,
    pub positions: Vec<usize>,
    pub keys: Vec<String>,
    pub reasons: Vec<SelectionReason>,
}

impl ExtractedTexts {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    fn push(&mut self, text: &str, position: usize, key: &str, reason: SelectionReason) {
        self.texts.push(text.to_string());
        self.positions.push(position);
        self.keys.push(key.to_string());
        self.reasons.push(reason);
    }
}

/// Selects keys for translation. The text to translate is always the source value.
///
/// Existing entries come first in line order, then keys missing from the
/// target in sorted order.
pub fn extract_texts_to_translate(
    lines: &[ParsedLine],
    source: &Translations,
    target: &Translations,
    newly_added: &BTreeSet<String>,
    ledger: Option<&FileLedger>,
    retranslate_identical_existing: bool,
) -> ExtractedTexts {
    let mut out = ExtractedTexts::default();
    let mut present = BTreeSet::new();

    for (idx, entry) in lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| line.as_entry().map(|e| (idx, e)))
    {
        present.insert(entry.key.as_str());
        let Some(source_value) = source.get(&entry.key) else {
            continue;
        };
        let target_value = target.get(&entry.key).unwrap_or(&entry.value);
        let identical = normalize_value(source_value) == normalize_value(target_value);
        let recorded = ledger.and_then(|l| l.get(&entry.key));

        let reason = if newly_added.contains(&entry.key) {
            Some(SelectionReason::NewlyAdded)
        } else if retranslate_identical_existing && identical {
            Some(SelectionReason::IdenticalToSource)
        } else if let Some(recorded) = recorded {
            if recorded.source_hash != compute_hash(source_value) {
                Some(SelectionReason::SourceChanged)
            } else if recorded.status == Some(LedgerStatus::Failed) {
                Some(SelectionReason::PreviouslyFailed)
            } else if identical && recorded.target_hash != recorded.source_hash {
                Some(SelectionReason::Regressed)
            } else {
                None
            }
        } else {
            if identical {
                debug!(key = %entry.key, "no ledger baseline and target equals source, skipping");
            }
            None
        };

        if let Some(reason) = reason {
            debug!(key = %entry.key, ?reason, "selected for translation");
            out.push(source_value, idx, &entry.key, reason);
        }
    }

    let mut next_position = lines.len();
    for (key, source_value) in source {
        if present.contains(key.as_str()) {
            continue;
        }
        out.push(
            source_value,
            next_position,
            key,
            SelectionReason::MissingFromTarget,
        );
        next_position += 1;
    }

    out
}

/// Writes translated texts back at their positions.
///
/// Values are MessageFormat-escaped against their source text. Positions
/// past the end append new entries in order.
pub fn integrate_translations(
    file: &mut PropertiesFile,
    extracted: &ExtractedTexts,
    translations: &[String],
    source: &Translations,
) {
    let original_len = file.lines.len();
    for ((position, key), translated) in extracted
        .positions
        .iter()
        .zip(&extracted.keys)
        .zip(translations)
    {
        let source_text = source.get(key).map(String::as_str).unwrap_or("");
        let value = escape_message_format_quotes(source_text, translated);

        if *position < original_len {
            if let Some(entry) = file.lines[*position].as_entry_mut() {
                entry.value = value;
                debug!(%key, "integrated translation");
            }
        } else {
            let mut entry = Entry::new(key.clone(), value);
            entry.line_number = *position;
            file.lines.push(ParsedLine::Entry(entry));
            debug!(%key, "appended new translation");
        }
    }
}
