//! Strict UTF-8 decoding and detection of known encoding-damage signatures.
//!
//! Two signatures are recognised: UTF-8 text that was re-decoded as a
//! single-byte codepage (`Ã` followed by U+0080..U+00FF, e.g. `verfÃ¼gbar`),
//! and the replacement character U+FFFD left behind by a lossy decode. This
//! is not a general encoding-confusion detector.

use std::{borrow::Cow, path::Path};

use chardetng::EncodingDetector;
use encoding_rs::UTF_8;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

lazy_static! {
    static ref MOJIBAKE_REGEX: Regex = Regex::new(r"Ã[\x{80}-\x{FF}]").unwrap();
}

const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Decodes `bytes` as UTF-8 without BOM sniffing and without replacement.
pub fn decode_strict<'a>(bytes: &'a [u8], label: &str) -> Result<Cow<'a, str>, Error> {
    UTF_8
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| Error::InvalidEncoding {
            path: label.to_string(),
            guess: guess_encoding(bytes),
        })
}

/// Best guess for the real encoding of bytes that failed UTF-8 decoding.
fn guess_encoding(bytes: &[u8]) -> Option<String> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    if encoding == UTF_8 {
        None
    } else {
        Some(encoding.name().to_lowercase())
    }
}

pub fn has_mojibake(text: &str) -> bool {
    MOJIBAKE_REGEX.is_match(text)
}

pub fn has_replacement_char(text: &str) -> bool {
    text.contains(REPLACEMENT_CHAR)
}

/// Either damage signature is present.
pub fn has_encoding_damage(text: &str) -> bool {
    has_mojibake(text) || has_replacement_char(text)
}

/// Checks decoded text; one message per signature found.
pub fn check_text(text: &str, label: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if has_mojibake(text) {
        errors.push(format!(
            "Potential mojibake detected in '{label}'. Found patterns like 'Ã¼', 'Ã¤', etc."
        ));
    }
    if has_replacement_char(text) {
        errors.push(format!(
            "File '{label}' contains the Unicode replacement character (U+FFFD), indicating a previous encoding/decoding error."
        ));
    }
    errors
}

/// Checks a file on disk. Undecodable files yield a single error and no further checks.
pub fn check_encoding_and_mojibake(path: &Path) -> Vec<String> {
    let label = path.display().to_string();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return vec![format!("Could not read file '{label}'. Reason: {e}")],
    };
    match decode_strict(&bytes, &label) {
        Ok(text) => check_text(&text, &label),
        Err(e) => vec![e.to_string()],
    }
}
