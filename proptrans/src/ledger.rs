//! Persistent per-file, per-key record of source and target content hashes.
//!
//! The ledger lets a run skip keys whose source text has not changed since
//! they were last translated. It is advisory state: a missing or unreadable
//! ledger loads as empty, which only means more keys get retranslated.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{error::Error, types::Translations};

pub const LEDGER_VERSION: u32 = 1;

const NEWLINE_TOKEN: &str = "<newline>";

/// Last known state of one key in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub source_hash: String,
    pub target_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LedgerStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    /// The translation failed per-key validation and was reverted to the source text.
    Failed,
}

/// `key -> entry` for a single target file.
pub type FileLedger = BTreeMap<String, LedgerEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub version: u32,
    pub updated_at: String,
    #[serde(default)]
    pub files: BTreeMap<String, FileLedger>,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger {
            version: LEDGER_VERSION,
            updated_at: now_utc(),
            files: BTreeMap::new(),
        }
    }
}

impl Ledger {
    /// Loads the ledger, falling back to an empty one when the file is missing or invalid.
    pub fn load(path: &Path) -> Ledger {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "could not read ledger, starting empty");
                } else {
                    debug!(path = %path.display(), "no ledger yet, starting empty");
                }
                return Ledger::default();
            }
        };

        match serde_json::from_slice::<Ledger>(&bytes) {
            Ok(ledger) if ledger.version == LEDGER_VERSION => ledger,
            Ok(ledger) => {
                warn!(
                    path = %path.display(),
                    version = ledger.version,
                    "unsupported ledger version, starting empty"
                );
                Ledger::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid ledger, starting empty");
                Ledger::default()
            }
        }
    }

    /// Stamps `updated_at` and writes the ledger atomically.
    pub fn save(&mut self, path: &Path) -> Result<(), Error> {
        self.updated_at = now_utc();
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)
    }

    pub fn file(&self, name: &str) -> Option<&FileLedger> {
        self.files.get(name)
    }

    /// Replaces everything recorded for `name`.
    pub fn set_file(&mut self, name: impl Into<String>, entries: FileLedger) {
        self.files.insert(name.into(), entries);
    }
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Unifies literal and escaped newlines, collapses whitespace runs and trims.
pub fn normalize_value(value: &str) -> String {
    let unified = value
        .replace("\\n", NEWLINE_TOKEN)
        .replace('\n', NEWLINE_TOKEN);
    unified.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hex SHA-256 of the normalized value.
pub fn compute_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_value(value).as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds a fresh file ledger from this run's source values and final target values.
///
/// Keys absent from either map are not recorded.
pub fn build_file_ledger(source: &Translations, final_translations: &Translations) -> FileLedger {
    final_translations
        .iter()
        .filter_map(|(key, target_value)| {
            let source_value = source.get(key)?;
            Some((
                key.clone(),
                LedgerEntry {
                    source_hash: compute_hash(source_value),
                    target_hash: compute_hash(target_value),
                    status: None,
                },
            ))
        })
        .collect()
}

/// Flags keys whose translation was reverted so the next run retries them.
pub fn mark_failed<'a>(entries: &mut FileLedger, keys: impl IntoIterator<Item = &'a String>) {
    for key in keys {
        if let Some(entry) = entries.get_mut(key) {
            entry.status = Some(LedgerStatus::Failed);
        }
    }
}

/// Writes `bytes` to a sibling temp file, then renames it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("ledger.json");
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn map(pairs: &[(&str, &str)]) -> Translations {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_hash_ignores_newline_style() {
        assert_eq!(compute_hash("a\nb"), compute_hash("a\\nb"));
    }

    #[test]
    fn test_hash_ignores_whitespace_runs() {
        assert_eq!(compute_hash("  Hello   world \t"), compute_hash("Hello world"));
        assert_ne!(compute_hash("Hello world"), compute_hash("Hello World"));
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value(" a \\n  b\nc "), "a <newline> b<newline>c");
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::load(&dir.path().join("nope.json"));
        assert!(ledger.files.is_empty());
        assert_eq!(ledger.version, LEDGER_VERSION);
    }

    #[test]
    fn test_load_invalid_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Ledger::load(&path).files.is_empty());
        fs::write(&path, r#"{"version": 99, "updated_at": "x", "files": {}}"#).unwrap();
        assert!(Ledger::load(&path).files.is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.json");
        let mut ledger = Ledger::default();
        let mut entries = build_file_ledger(&map(&[("k", "Hello")]), &map(&[("k", "Hallo")]));
        mark_failed(&mut entries, [&"k".to_string()]);
        ledger.set_file("app_de.properties", entries);
        ledger.save(&path).unwrap();

        let loaded = Ledger::load(&path);
        assert_eq!(loaded, ledger);
        assert!(loaded.updated_at.ends_with('Z'));
        let entry = &loaded.file("app_de.properties").unwrap()["k"];
        assert_eq!(entry.status, Some(LedgerStatus::Failed));

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_status_omitted_when_none() {
        let entries = build_file_ledger(&map(&[("k", "v")]), &map(&[("k", "w")]));
        let json = serde_json::to_string(&entries).unwrap();
        assert!(!json.contains("status"));
        let raw = r#"{"k": {"source_hash": "a", "target_hash": "b", "status": "failed"}}"#;
        let parsed: FileLedger = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["k"].status, Some(LedgerStatus::Failed));
    }

    #[test]
    fn test_build_file_ledger_is_full_replacement() {
        let source = map(&[("a", "A"), ("b", "B")]);
        let final_map = map(&[("a", "Ä"), ("b", "B"), ("orphan", "x")]);
        let entries = build_file_ledger(&source, &final_map);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["a"].source_hash, compute_hash("A"));
        assert_eq!(entries["a"].target_hash, compute_hash("Ä"));
        assert_eq!(entries["b"].source_hash, entries["b"].target_hash);
    }
}
