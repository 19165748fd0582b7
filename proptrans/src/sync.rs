//! Key synchronization between a source-language file and a target file.
//!
//! After a sync the target holds exactly the source's keys. Existing target
//! entries keep their values and formatting; missing keys are copied from
//! the source and placed next to the neighbours they have in the source.

use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::Error,
    properties::PropertiesFile,
    traits::Parser,
    types::{Entry, ParsedLine},
};

/// Keys added to and removed from a target by a sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Present in the source, absent from the target.
    pub missing: BTreeSet<String>,
    /// Present in the target, absent from the source.
    pub extra: BTreeSet<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Compares key sets without touching anything.
pub fn key_coverage(source: &PropertiesFile, target: &PropertiesFile) -> SyncReport {
    let source_keys = source.keys();
    let target_keys = target.keys();
    SyncReport {
        missing: source_keys.difference(&target_keys).cloned().collect(),
        extra: target_keys.difference(&source_keys).cloned().collect(),
    }
}

/// Reconciles `target` to the key set of `source` in memory.
pub fn synchronize_lines(target: &mut PropertiesFile, source: &PropertiesFile) -> SyncReport {
    let report = key_coverage(source, target);
    if report.is_empty() {
        return report;
    }

    target
        .lines
        .retain(|line| line.key().is_none_or(|key| !report.extra.contains(key)));

    // First occurrence of each source key, with its line index.
    let mut seen = BTreeSet::new();
    let source_entries: Vec<(usize, &Entry)> = source
        .lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| line.as_entry().map(|e| (idx, e)))
        .filter(|&(_, e)| seen.insert(e.key.as_str()))
        .collect();

    for (pos, (source_idx, entry)) in source_entries.iter().enumerate() {
        if !report.missing.contains(&entry.key) {
            continue;
        }
        let index = insertion_index(target, source, &source_entries, pos, *source_idx);
        debug!(key = %entry.key, index, "inserting missing key");
        target.insert_line(index, ParsedLine::Entry((*entry).clone()));
    }

    report
}

fn insertion_index(
    target: &PropertiesFile,
    source: &PropertiesFile,
    source_entries: &[(usize, &Entry)],
    pos: usize,
    source_idx: usize,
) -> usize {
    let following = source_entries[pos + 1..]
        .iter()
        .find_map(|(idx, e)| target.position_of(&e.key).map(|t| (*idx, t)));

    if let Some((anchor_source_idx, anchor_target_idx)) = following {
        let gap_has_structure = source.lines[source_idx + 1..anchor_source_idx]
            .iter()
            .any(|line| !line.is_entry());
        if gap_has_structure {
            return before_comment_block(target, anchor_target_idx);
        }
        return anchor_target_idx;
    }

    let preceding = source_entries[..pos]
        .iter()
        .rev()
        .find_map(|(_, e)| target.position_of(&e.key));

    match preceding {
        Some(anchor_target_idx) => anchor_target_idx + 1,
        None => target.lines.len(),
    }
}

/// Moves an insertion point above the comments and blanks that head `index`,
/// as long as an entry precedes them.
fn before_comment_block(target: &PropertiesFile, index: usize) -> usize {
    let mut idx = index;
    while idx > 0 && !target.lines[idx - 1].is_entry() {
        idx -= 1;
    }
    if idx == 0 { index } else { idx }
}

/// Synchronizes the target file on disk with the source file.
///
/// The target is only rewritten when keys were added or removed.
pub fn synchronize_keys(target_path: &Path, source_path: &Path) -> Result<SyncReport, Error> {
    let source = PropertiesFile::read_from(source_path)?;
    let mut target = PropertiesFile::read_from(target_path)?;
    let report = synchronize_lines(&mut target, &source);
    if report.is_empty() {
        return Ok(report);
    }
    target.write_to(target_path)?;
    info!(
        file = %target_path.display(),
        added = report.missing.len(),
        removed = report.extra.len(),
        "synchronized keys with source"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::fs;
    use tempfile::TempDir;

    fn sync_text(target: &str, source: &str) -> (String, SyncReport) {
        let source = PropertiesFile::parse_str(source);
        let mut target = PropertiesFile::parse_str(target);
        let report = synchronize_lines(&mut target, &source);
        (target.serialize(), report)
    }

    #[test]
    fn test_identical_key_sets_noop() {
        let (out, report) = sync_text("a=A\nb=B\n", "a=1\nb=2\n");
        assert!(report.is_empty());
        assert_eq!(out, "a=A\nb=B\n");
    }

    #[test]
    fn test_missing_key_inserted_before_following_anchor() {
        let (out, report) = sync_text("a=A\nc=C\n", "a=1\nb=2\nc=3\n");
        assert_eq!(report.missing, BTreeSet::from(["b".to_string()]));
        assert_eq!(out, "a=A\nb=2\nc=C\n");
    }

    #[test]
    fn test_missing_key_after_preceding_anchor() {
        let (out, _) = sync_text("a=A\n# trailer\n", "a=1\nz=26\n");
        assert_eq!(out, "a=A\nz=26\n# trailer\n");
    }

    #[test]
    fn test_missing_run_keeps_source_order() {
        let (out, _) = sync_text("a=A\nd=D\n", "a=1\nc=3\nb=2\nd=4\n");
        assert_eq!(out, "a=A\nc=3\nb=2\nd=D\n");
    }

    #[test]
    fn test_no_anchor_appends() {
        let (out, _) = sync_text("# only comment\n", "x=1\ny=2\n");
        assert_eq!(out, "# only comment\nx=1\ny=2\n");
    }

    #[test]
    fn test_insertion_skips_section_comment() {
        let source = indoc! {"
            a=1
            b=2

            # Section two
            c=3
        "};
        let target = indoc! {"
            a=A

            # Section two
            c=C
        "};
        let (out, _) = sync_text(target, source);
        assert_eq!(out, "a=A\nb=2\n\n# Section two\nc=C\n");
    }

    #[test]
    fn test_insertion_inside_section_without_gap() {
        let source = indoc! {"
            # Section
            a=1
            b=2
        "};
        let target = indoc! {"
            # Section
            b=B
        "};
        let (out, _) = sync_text(target, source);
        assert_eq!(out, "# Section\na=1\nb=B\n");
    }

    #[test]
    fn test_extra_keys_removed_comments_kept() {
        let (out, report) = sync_text("# head\na=A\nold=O\nb=B\n", "a=1\nb=2\n");
        assert_eq!(report.extra, BTreeSet::from(["old".to_string()]));
        assert_eq!(out, "# head\na=A\nb=B\n");
    }

    #[test]
    fn test_multiline_source_entry_copied_verbatim() {
        let (out, _) = sync_text("a=A\n", "a=1\nlong=one \\\n  two\n");
        assert_eq!(out, "a=A\nlong=one \\\n  two\n");
    }

    #[test]
    fn test_sync_converges() {
        let source = "a=1\nb=2\nc=3\n";
        let (once, _) = sync_text("c=C\nx=X\n", source);
        let (twice, report) = sync_text(&once, source);
        assert!(report.is_empty());
        assert_eq!(once, twice);
        assert_eq!(
            PropertiesFile::parse_str(&twice).keys(),
            PropertiesFile::parse_str(source).keys()
        );
    }

    #[test]
    fn test_synchronize_keys_leaves_untouched_file_alone() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.properties");
        let target = dir.path().join("app_de.properties");
        fs::write(&source, "a=1\n").unwrap();
        fs::write(&target, "a = A").unwrap();
        let report = synchronize_keys(&target, &source).unwrap();
        assert!(report.is_empty());
        assert_eq!(fs::read_to_string(&target).unwrap(), "a = A");
    }

    #[test]
    fn test_synchronize_keys_rewrites_target() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("app.properties");
        let target = dir.path().join("app_de.properties");
        fs::write(&source, "a=1\nb=2\n").unwrap();
        fs::write(&target, "a=A\nstale=S\n").unwrap();
        let report = synchronize_keys(&target, &source).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.extra.len(), 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "a=A\nb=2\n");
    }
}
