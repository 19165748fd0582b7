use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use proptrans::FileJob;
use tracing::debug;

use crate::config::AppConfig;

const EXTENSION: &str = ".properties";

/// A target file and the source file it is translated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub target: PathBuf,
    pub source: PathBuf,
    pub language_code: String,
    /// Path relative to the input folder, `/`-separated.
    pub relative: String,
}

impl TargetFile {
    pub fn into_job(self, config: &AppConfig) -> FileJob {
        let name = config.language_name(&self.language_code);
        let mut job = FileJob::new(self.target, self.source, self.language_code, name);
        job.ledger_key = self.relative;
        job
    }
}

/// Compiled `translation_filter_glob`.
pub struct NameFilter {
    matcher: GlobMatcher,
    match_relative: bool,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
            match_relative: pattern.contains('/'),
        })
    }

    pub fn is_match(&self, relative: &str) -> bool {
        if self.match_relative {
            self.matcher.is_match(relative)
        } else {
            let name = relative.rsplit('/').next().unwrap_or(relative);
            self.matcher.is_match(name)
        }
    }
}

fn is_lower_alpha(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_lowercase())
}

fn is_region(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Whether `code` has the `xx`, `xxx` or `xx_YY` shape used in file names.
pub fn is_file_language_code(code: &str) -> bool {
    match code.split_once('_') {
        Some((lang, region)) => is_lower_alpha(lang, 2, 3) && is_region(region),
        None => is_lower_alpha(code, 2, 3),
    }
}

/// Finds the language code at the end of a file stem.
///
/// Configured codes win, longest first, so `app_pt_BR` is `pt_BR` rather
/// than an `app_pt` file with a stray suffix. Without configured codes the
/// naming pattern alone decides.
pub fn language_code_of(stem: &str, known_codes: &[String]) -> Option<String> {
    if !known_codes.is_empty() {
        let mut codes: Vec<&String> = known_codes.iter().collect();
        codes.sort_by_key(|c| std::cmp::Reverse(c.len()));
        return codes
            .into_iter()
            .find(|code| {
                stem.len() > code.len() + 1
                    && stem.ends_with(code.as_str())
                    && stem.as_bytes()[stem.len() - code.len() - 1] == b'_'
                    && is_file_language_code(code)
            })
            .cloned();
    }

    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() >= 3 {
        let pair = format!("{}_{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if is_file_language_code(&pair) {
            return Some(pair);
        }
    }
    match parts.as_slice() {
        [_, .., last] if is_file_language_code(last) => Some(last.to_string()),
        _ => None,
    }
}

/// Resolves a single target path to its source and language.
pub fn resolve_target(path: &Path, root: &Path, known_codes: &[String]) -> Option<TargetFile> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(EXTENSION)?;
    let code = language_code_of(stem, known_codes)?;
    let base = &stem[..stem.len() - code.len() - 1];
    let source = path.with_file_name(format!("{base}{EXTENSION}"));
    let relative = path
        .strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(TargetFile {
        target: path.to_path_buf(),
        source,
        language_code: code,
        relative,
    })
}

/// Walks `root` (gitignore-aware) and returns every target file, sorted by path.
pub fn discover_targets(
    root: &Path,
    known_codes: &[String],
    filter: Option<&NameFilter>,
) -> Vec<TargetFile> {
    let walker = WalkBuilder::new(root)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .hidden(false)
        .ignore(true)
        .parents(true)
        .build();

    let mut found: Vec<TargetFile> = Vec::new();
    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(_e) => continue,
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(target) = resolve_target(dent.path(), root, known_codes) else {
            continue;
        };
        if filter.is_some_and(|f| !f.is_match(&target.relative)) {
            debug!(file = %target.relative, "excluded by filter glob");
            continue;
        }
        if !target.source.is_file() {
            debug!(file = %target.relative, "no source file, skipping");
            continue;
        }
        found.push(target);
    }
    found.sort_by(|a, b| a.target.cmp(&b.target));
    found
}
