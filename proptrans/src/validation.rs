//! Validation around a translation run.
//!
//! Pre-translation checks decide whether a file is safe to translate at
//! all. Per-key validation runs on the finished translations and reverts
//! only the keys that broke.

use std::path::Path;

use tracing::{error, info, warn};

use crate::{
    encoding::{check_encoding_and_mojibake, decode_strict, has_encoding_damage},
    placeholder::{extract_placeholders, has_placeholder_parity},
    properties::{PropertiesFile, ends_with_odd_backslashes},
    sync::{SyncReport, synchronize_keys},
    traits::Parser,
    types::Translations,
};

/// Outcome of [`run_pre_translation_validation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreValidation {
    /// Empty when the file may be translated.
    pub errors: Vec<String>,
    /// Keys the synchronizer added and removed, if it ran.
    pub sync: SyncReport,
}

impl PreValidation {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Synchronizes keys, then checks encoding, lint rules and placeholder parity.
///
/// The target file is rewritten by the synchronizer when keys differ.
pub fn run_pre_translation_validation(target_path: &Path, source_path: &Path) -> PreValidation {
    let filename = file_label(target_path);
    info!(file = %filename, "running pre-translation validation");
    let mut result = PreValidation::default();

    match synchronize_keys(target_path, source_path) {
        Ok(report) => result.sync = report,
        Err(e) => {
            error!(file = %filename, error = %e, "key synchronization failed");
            result
                .errors
                .push(format!("I/O error during key synchronization: {e}"));
            return result;
        }
    }

    result.errors.extend(check_encoding_and_mojibake(target_path));
    result.errors.extend(lint_properties_file(target_path));

    let parsed = PropertiesFile::read_from(target_path)
        .and_then(|target| Ok((target, PropertiesFile::read_from(source_path)?)));
    let (target, source) = match parsed {
        Ok(pair) => pair,
        Err(e) => {
            error!(file = %filename, error = %e, "could not parse after key sync");
            result
                .errors
                .push(format!("Could not parse properties file after key sync: {e}"));
            return result;
        }
    };

    let target_map = target.translations();
    for (key, source_value) in source.translations() {
        let Some(target_value) = target_map.get(&key) else {
            continue;
        };
        if !has_placeholder_parity(&source_value, target_value) {
            result
                .errors
                .push(format!("Placeholder mismatch for key `{key}`."));
        }
    }

    if result.passed() {
        info!(file = %filename, "pre-translation validation passed");
    } else {
        warn!(file = %filename, errors = result.errors.len(), "pre-translation validation failed");
    }
    result
}

/// Lints a file on disk. Read and decode failures are reported as a single error.
pub fn lint_properties_file(path: &Path) -> Vec<String> {
    let text = std::fs::read(path)
        .map_err(crate::Error::from)
        .and_then(|bytes| decode_strict(&bytes, &path.display().to_string()).map(|t| t.into_owned()));
    match text {
        Ok(text) => lint_text(&text),
        Err(e) => vec![format!(
            "Linter Error: Could not read or process file {}. Reason: {e}",
            path.display()
        )],
    }
}

/// Flags keys containing `..` and values with escape sequences Java would not accept.
pub fn lint_text(text: &str) -> Vec<String> {
    let file = PropertiesFile::parse_str(text);
    let mut errors = Vec::new();
    for entry in file.entries() {
        let line = entry.line_number + 1;
        if entry.key.contains("..") {
            errors.push(format!(
                "Linter Error: Malformed key '{}' with double dots found on line {line}.",
                entry.key
            ));
        }
        if has_invalid_escape(&entry.value) {
            errors.push(format!(
                "Linter Error: Invalid escape sequence in value for key '{}' on line {line}.",
                entry.key
            ));
        }
    }
    errors
}

/// True when a backslash starts anything but `\t \n \f \r \\ \= \: \# \! \"`,
/// escaped whitespace or `\uXXXX`.
fn has_invalid_escape(value: &str) -> bool {
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            continue;
        }
        match chars.next() {
            None => {}
            Some('t' | 'n' | 'f' | 'r' | '\\' | '=' | ':' | '#' | '!' | '"') => {}
            Some(c) if c.is_whitespace() => {}
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                    return true;
                }
            }
            Some(_) => return true,
        }
    }
    false
}

/// Checks every final translation against its source value.
///
/// Returns the translations with failing keys reverted to their source text,
/// plus the failing keys in sorted order. Keys without a source value are kept.
pub fn run_per_key_validation(
    final_translations: &Translations,
    source: &Translations,
    filename: &str,
) -> (Translations, Vec<String>) {
    let mut valid = Translations::new();
    let mut failed_keys = Vec::new();

    for (key, translated) in final_translations {
        let Some(source_value) = source.get(key) else {
            valid.insert(key.clone(), translated.clone());
            continue;
        };

        if !has_placeholder_parity(source_value, translated) {
            error!(
                file = %filename,
                %key,
                source = %source_value,
                translated = %translated,
                expected = ?extract_placeholders(source_value),
                found = ?extract_placeholders(translated),
                "placeholder mismatch, reverting key to source"
            );
        } else if has_encoding_damage(translated) && !has_encoding_damage(source_value) {
            error!(
                file = %filename,
                %key,
                source = %source_value,
                translated = %translated,
                "encoding damage in translation, reverting key to source"
            );
        } else if ends_with_odd_backslashes(translated) && !ends_with_odd_backslashes(source_value)
        {
            error!(
                file = %filename,
                %key,
                source = %source_value,
                translated = %translated,
                "dangling backslash in translation, reverting key to source"
            );
        } else {
            valid.insert(key.clone(), translated.clone());
            continue;
        }

        valid.insert(key.clone(), source_value.clone());
        failed_keys.push(key.clone());
    }

    if !failed_keys.is_empty() {
        warn!(
            file = %filename,
            failed = failed_keys.len(),
            total = final_translations.len(),
            "per-key validation reverted keys"
        );
    }
    (valid, failed_keys)
}
