use std::{path::Path, sync::Arc};

use proptrans::{
    FileJob, Glossary, Pipeline, RunReport, Translator,
    translator::{MockMode, MockTranslator},
    write_skipped_report,
};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    discovery::{NameFilter, discover_targets, resolve_target},
    openai::OpenAiTranslator,
    validation::{validate_dir_path, validate_file_path},
};

#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Explicit target files; empty means discover under `input_folder`.
    pub files: Vec<String>,
    pub dry_run: bool,
}

/// Builds the job list from explicit files or by walking the input folder.
pub fn collect_jobs(config: &AppConfig, files: &[String]) -> Result<Vec<FileJob>, String> {
    let codes = config.language_codes();

    if !files.is_empty() {
        let mut jobs = Vec::with_capacity(files.len());
        for file in files {
            validate_file_path(file)?;
            let target = resolve_target(Path::new(file), &config.input_folder, &codes)
                .ok_or_else(|| format!("Cannot determine language of '{}'", file))?;
            validate_file_path(&target.source.to_string_lossy())
                .map_err(|e| format!("Source for '{}' not found: {}", file, e))?;
            jobs.push(target.into_job(config));
        }
        return Ok(jobs);
    }

    validate_dir_path(&config.input_folder)?;
    let filter = config
        .translation_filter_glob
        .as_deref()
        .map(NameFilter::new)
        .transpose()?;
    Ok(discover_targets(&config.input_folder, &codes, filter.as_ref())
        .into_iter()
        .map(|t| t.into_job(config))
        .collect())
}

fn build_translator(
    config: &AppConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn Translator>, String> {
    match api_key {
        Some(key) => {
            let translator = OpenAiTranslator::new(key, config).map_err(|e| e.to_string())?;
            Ok(Arc::new(translator))
        }
        // Never called in dry-run mode.
        None if config.dry_run => Ok(Arc::new(MockTranslator::new(MockMode::Echo))),
        None => Err("OPENAI_API_KEY not found. Set it or enable dry_run in config.".to_string()),
    }
}

pub async fn run_translate_command(
    mut config: AppConfig,
    opts: TranslateOptions,
    api_key: Option<String>,
) -> Result<RunReport, String> {
    config.dry_run |= opts.dry_run;

    let jobs = collect_jobs(&config, &opts.files)?;
    if jobs.is_empty() {
        warn!(folder = %config.input_folder.display(), "no target files found");
        println!("No target .properties files found.");
        return Ok(RunReport::default());
    }
    info!(files = jobs.len(), dry_run = config.dry_run, "starting translation run");

    let translator = build_translator(&config, api_key)?;
    let glossary = Glossary::load(&config.glossary_file_path);
    let pipeline = Pipeline::new(translator, config.pipeline_config(), glossary);

    let report = pipeline.run(&jobs, &config.ledger_path).await;

    write_skipped_report(&config.skipped_report_path, &report)
        .map_err(|e| format!("Failed to write skipped-files report: {}", e))?;

    for (file, keys) in &report.failed_keys {
        println!("⚠️  {}: reverted {}", file, keys.join(", "));
    }
    for file in report.skipped.keys() {
        println!("⏭️  {}: skipped (see {})", file, config.skipped_report_path.display());
    }
    println!("{}", report.summary());
    Ok(report)
}
