//! End-of-run summary and the Markdown report of skipped files.

use std::{collections::BTreeMap, fmt::Write as _, fs, path::Path};

use indoc::indoc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Files that went through translation and were written.
    pub processed: Vec<String>,
    /// Files with nothing to translate.
    pub unchanged: Vec<String>,
    /// `file -> errors` for files skipped before translation.
    pub skipped: BTreeMap<String, Vec<String>>,
    /// `file -> keys` reverted to source by per-key validation.
    pub failed_keys: BTreeMap<String, Vec<String>>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// One-line summary for terminals and logs.
    pub fn summary(&self) -> String {
        let failed: usize = self.failed_keys.values().map(Vec::len).sum();
        format!(
            "{} processed, {} unchanged, {} skipped, {} keys reverted",
            self.processed.len(),
            self.unchanged.len(),
            self.skipped.len(),
            failed
        )
    }
}

const SKIPPED_HEADER: &str = indoc! {"
    ## ⚠️ Translation Pipeline Warnings

    The following files were skipped during the AI translation process due to validation or linter errors. These issues must be addressed manually.

"};

/// Renders skipped files as Markdown.
pub fn render_skipped_report(skipped: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from(SKIPPED_HEADER);
    for (file, errors) in skipped {
        let _ = writeln!(out, "### 📄 `{file}`");
        for error in errors {
            let _ = writeln!(out, "- {error}");
        }
        out.push('\n');
    }
    out
}

/// Writes the skipped-files report, or removes a stale one when nothing was skipped.
pub fn write_skipped_report(path: &Path, report: &RunReport) -> Result<(), Error> {
    if report.skipped.is_empty() {
        if path.exists() {
            fs::remove_file(path)?;
            info!(path = %path.display(), "removed stale skipped-files report");
        }
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_skipped_report(&report.skipped))?;
    info!(path = %path.display(), files = report.skipped.len(), "wrote skipped-files report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report_with_skip() -> RunReport {
        let mut report = RunReport::default();
        report.skipped.insert(
            "app_de.properties".to_string(),
            vec!["Placeholder mismatch for key `a`.".to_string()],
        );
        report
    }

    #[test]
    fn test_render_skipped_report() {
        let text = render_skipped_report(&report_with_skip().skipped);
        assert!(text.starts_with("## ⚠️ Translation Pipeline Warnings\n\n"));
        assert!(text.contains("### 📄 `app_de.properties`\n- Placeholder mismatch for key `a`.\n\n"));
    }

    #[test]
    fn test_write_then_remove_stale_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("skipped.md");
        write_skipped_report(&path, &report_with_skip()).unwrap();
        assert!(path.exists());
        write_skipped_report(&path, &RunReport::default()).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_summary() {
        let mut report = report_with_skip();
        report.processed.push("a_fr.properties".to_string());
        report
            .failed_keys
            .insert("a_fr.properties".to_string(), vec!["k1".into(), "k2".into()]);
        assert_eq!(report.summary(), "1 processed, 0 unchanged, 1 skipped, 2 keys reverted");
        assert!(report.has_errors());
    }
}
