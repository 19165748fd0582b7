use std::path::{Path, PathBuf};

use proptrans::{
    PropertiesFile, encoding::check_encoding_and_mojibake, has_placeholder_parity,
    lint_properties_file, sync::key_coverage, traits::Parser,
};
use rayon::prelude::*;
use tracing::{info, warn};
use unic_langid::LanguageIdentifier;

/// Validate file path exists and is readable
pub fn validate_file_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(format!("File does not exist: {}", path));
    }

    if !path_obj.is_file() {
        return Err(format!("Path is not a file: {}", path));
    }

    Ok(())
}

/// Validate a directory exists
pub fn validate_dir_path(path: &Path) -> Result<(), String> {
    if !path.is_dir() {
        return Err(format!("Directory does not exist: {}", path.display()));
    }
    Ok(())
}

/// Validate language code format using unic-langid.
///
/// Both `pt-BR` and the file-name form `pt_BR` are accepted.
pub fn validate_language_code(lang: &str) -> Result<(), String> {
    if lang.is_empty() {
        return Err("Language code cannot be empty".to_string());
    }

    match lang.parse::<LanguageIdentifier>() {
        Ok(lang_id) if lang_id.language.as_str() != "und" => Ok(()),
        _ => Err(format!(
            "Invalid language code format: {}. Expected valid BCP 47 language identifier",
            lang
        )),
    }
}

/// Problems found in one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidation {
    pub target: PathBuf,
    pub errors: Vec<String>,
}

/// Checks one target against its source without writing anything.
pub fn validate_target(target: &Path, source: &PropertiesFile) -> FileValidation {
    let mut errors = check_encoding_and_mojibake(target);
    errors.extend(lint_properties_file(target));

    match PropertiesFile::read_from(target) {
        Ok(parsed) => {
            let coverage = key_coverage(source, &parsed);
            for key in &coverage.missing {
                errors.push(format!("Missing key `{key}`."));
            }
            for key in &coverage.extra {
                errors.push(format!("Extra key `{key}` not present in source."));
            }
            let target_values = parsed.translations();
            for (key, source_value) in source.translations() {
                if let Some(target_value) = target_values.get(&key)
                    && !has_placeholder_parity(&source_value, target_value)
                {
                    errors.push(format!("Placeholder mismatch for key `{key}`."));
                }
            }
        }
        // Decode failures are already reported by the encoding check.
        Err(proptrans::Error::InvalidEncoding { .. }) => {}
        Err(e) => errors.push(format!("Could not parse properties file: {e}")),
    }

    FileValidation {
        target: target.to_path_buf(),
        errors,
    }
}

/// Validates every target against `source` in parallel.
pub fn validate_targets(source: &Path, targets: &[PathBuf]) -> Result<Vec<FileValidation>, String> {
    let source_file = PropertiesFile::read_from(source)
        .map_err(|e| format!("Cannot read source '{}': {}", source.display(), e))?;

    let results: Vec<FileValidation> = targets
        .par_iter()
        .map(|target| validate_target(target, &source_file))
        .collect();
    Ok(results)
}

pub fn run_validate_command(source: &str, targets: &[String]) -> Result<(), String> {
    validate_file_path(source)?;
    if targets.is_empty() {
        return Err("No target files given".to_string());
    }
    for target in targets {
        validate_file_path(target)?;
    }

    let paths: Vec<PathBuf> = targets.iter().map(PathBuf::from).collect();
    let results = validate_targets(Path::new(source), &paths)?;

    let mut failed = 0usize;
    for result in &results {
        if result.errors.is_empty() {
            println!("✅ {}", result.target.display());
            continue;
        }
        failed += 1;
        warn!(file = %result.target.display(), errors = result.errors.len(), "validation failed");
        println!("❌ {}", result.target.display());
        for error in &result.errors {
            println!("   - {}", error);
        }
    }
    info!(files = results.len(), failed, "validation finished");

    if failed > 0 {
        return Err(format!("{} of {} file(s) failed validation", failed, results.len()));
    }
    Ok(())
}
