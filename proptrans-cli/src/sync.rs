use proptrans::{PropertiesFile, SyncReport, sync::key_coverage, synchronize_keys, traits::Parser};
use serde_json::json;

use crate::validation::validate_file_path;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub source: String,
    pub target: String,
    pub dry_run: bool,
    /// Print the report as JSON instead of a list.
    pub json: bool,
}

fn print_report(opts: &SyncOptions, report: &SyncReport) -> Result<(), String> {
    if opts.json {
        let payload = json!({
            "source": opts.source,
            "target": opts.target,
            "dry_run": opts.dry_run,
            "missing": report.missing,
            "extra": report.extra,
        });
        let text = serde_json::to_string_pretty(&payload)
            .map_err(|e| format!("Failed to serialize report JSON: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    if report.is_empty() {
        println!("✅ {} is in sync with {}", opts.target, opts.source);
        return Ok(());
    }
    let (added, removed) = if opts.dry_run {
        ("Missing", "Extra")
    } else {
        ("Added", "Removed")
    };
    println!("{} keys ({}):", added, report.missing.len());
    for key in &report.missing {
        println!("  + {}", key);
    }
    println!("{} keys ({}):", removed, report.extra.len());
    for key in &report.extra {
        println!("  - {}", key);
    }
    Ok(())
}

pub fn run_sync_command(opts: SyncOptions) -> Result<(), String> {
    validate_file_path(&opts.source)?;
    validate_file_path(&opts.target)?;

    let report = if opts.dry_run {
        let source = PropertiesFile::read_from(&opts.source)
            .map_err(|e| format!("Failed to read source '{}': {}", opts.source, e))?;
        let target = PropertiesFile::read_from(&opts.target)
            .map_err(|e| format!("Failed to read target '{}': {}", opts.target, e))?;
        key_coverage(&source, &target)
    } else {
        synchronize_keys(opts.target.as_ref(), opts.source.as_ref())
            .map_err(|e| format!("Key synchronization failed: {}", e))?
    };

    print_report(&opts, &report)
}
