//! Orchestrates validation, change detection, translation and write-back per file.
//!
//! Files are processed one after another. Within a file, translation
//! requests run concurrently up to `max_concurrent_api_calls`; results are
//! put back in request order before anything is integrated.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::{StreamExt, stream::FuturesUnordered};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::{
    extract::{ExtractedTexts, extract_texts_to_translate, integrate_translations},
    glossary::Glossary,
    ledger::{Ledger, build_file_ledger, mark_failed},
    placeholder::{clean_translated_text, protect_placeholders, restore_placeholders},
    properties::PropertiesFile,
    report::RunReport,
    traits::Parser,
    translator::{TranslationRequest, Translator, build_context},
    types::Translations,
    validation::{run_per_key_validation, run_pre_translation_validation},
};

/// Run-wide settings, built once by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_concurrent_api_calls: usize,
    /// Retranslate existing values that equal their source text.
    pub retranslate_identical_existing: bool,
    /// Validate and extract only; never call the translator or write results.
    pub dry_run: bool,
    pub context_char_budget: usize,
    /// Brand and technical terms the translator must keep verbatim.
    pub brand_terms: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_concurrent_api_calls: 4,
            retranslate_identical_existing: false,
            dry_run: false,
            context_char_budget: 4000,
            brand_terms: Vec::new(),
        }
    }
}

/// One target file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub target_path: PathBuf,
    pub source_path: PathBuf,
    /// Name the file is recorded under in the ledger and reports.
    pub ledger_key: String,
    pub language_code: String,
    pub language_name: String,
}

impl FileJob {
    /// A job keyed by the target's file name.
    pub fn new(
        target_path: impl Into<PathBuf>,
        source_path: impl Into<PathBuf>,
        language_code: impl Into<String>,
        language_name: impl Into<String>,
    ) -> Self {
        let target_path = target_path.into();
        let ledger_key = target_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| target_path.display().to_string());
        FileJob {
            target_path,
            source_path: source_path.into(),
            ledger_key,
            language_code: language_code.into(),
            language_name: language_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Keys were translated; `failed_keys` were reverted to source.
    Translated {
        translated: usize,
        failed_keys: Vec<String>,
    },
    /// Nothing needed translation.
    Unchanged,
    /// Pre-translation checks failed; the file was not translated.
    Skipped { errors: Vec<String> },
}

pub struct Pipeline {
    translator: Arc<dyn Translator>,
    config: PipelineConfig,
    glossary: Glossary,
    limiter: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(translator: Arc<dyn Translator>, config: PipelineConfig, glossary: Glossary) -> Self {
        let permits = config.max_concurrent_api_calls.max(1);
        Pipeline {
            translator,
            config,
            glossary,
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every job in order, saving the ledger after each file.
    pub async fn run(&self, jobs: &[FileJob], ledger_path: &Path) -> RunReport {
        let mut ledger = Ledger::load(ledger_path);
        let mut report = RunReport::default();

        for job in jobs {
            let outcome = self.process_file(job, &mut ledger).await;
            match outcome {
                FileOutcome::Translated { failed_keys, .. } => {
                    if !failed_keys.is_empty() {
                        report.failed_keys.insert(job.ledger_key.clone(), failed_keys);
                    }
                    report.processed.push(job.ledger_key.clone());
                }
                FileOutcome::Unchanged => report.unchanged.push(job.ledger_key.clone()),
                FileOutcome::Skipped { errors } => {
                    report.skipped.insert(job.ledger_key.clone(), errors);
                    continue;
                }
            }

            if self.config.dry_run {
                continue;
            }
            if let Err(e) = ledger.save(ledger_path) {
                error!(path = %ledger_path.display(), error = %e, "failed to save ledger");
            }
        }

        info!(summary = %report.summary(), "translation run finished");
        report
    }

    /// Runs one file through the whole pipeline.
    pub async fn process_file(&self, job: &FileJob, ledger: &mut Ledger) -> FileOutcome {
        let file = job.ledger_key.as_str();
        info!(file, language = %job.language_code, "processing file");

        let pre = run_pre_translation_validation(&job.target_path, &job.source_path);
        if !pre.sync.missing.is_empty() {
            info!(file, keys = ?pre.sync.missing, "keys added by synchronization");
        }
        if !pre.passed() {
            for e in &pre.errors {
                error!(file, "{e}");
            }
            return FileOutcome::Skipped { errors: pre.errors };
        }

        let loaded = PropertiesFile::read_from(&job.target_path)
            .and_then(|target| Ok((target, PropertiesFile::read_from(&job.source_path)?)));
        let (mut target, source) = match loaded {
            Ok(pair) => pair,
            Err(e) => {
                error!(file, error = %e, "could not read files after validation");
                return FileOutcome::Skipped {
                    errors: vec![format!("Could not read file: {e}")],
                };
            }
        };
        let source_map = source.translations();
        let target_map = target.translations();

        let extracted = extract_texts_to_translate(
            &target.lines,
            &source_map,
            &target_map,
            &pre.sync.missing,
            ledger.file(&job.ledger_key),
            self.config.retranslate_identical_existing,
        );

        if extracted.is_empty() {
            info!(file, "no texts to translate");
            if !self.config.dry_run {
                ledger.set_file(&job.ledger_key, build_file_ledger(&source_map, &target_map));
            }
            return FileOutcome::Unchanged;
        }
        info!(file, count = extracted.len(), "texts selected for translation");

        let mut untranslated = Vec::new();
        let translations: Vec<String> = if self.config.dry_run {
            info!(file, "dry run, translator not called");
            extracted.texts.clone()
        } else {
            let context = build_context(&target, &source_map, self.config.context_char_budget);
            let results = self.translate_all(job, &extracted, &context).await;
            results
                .into_iter()
                .zip(extracted.texts.iter().zip(&extracted.keys))
                .map(|(result, (text, key))| {
                    result.unwrap_or_else(|| {
                        untranslated.push(key.clone());
                        text.clone()
                    })
                })
                .collect()
        };

        integrate_translations(&mut target, &extracted, &translations, &source_map);
        let (valid, failed_keys) =
            run_per_key_validation(&target.translations(), &source_map, file);
        for key in &failed_keys {
            if let Some(value) = valid.get(key) {
                target.set_value(key, value);
            }
        }
        let final_map: Translations = target.translations();

        if self.config.dry_run {
            info!(file, "dry run, target file and ledger left untouched");
        } else {
            match target.write_to(&job.target_path) {
                Ok(()) => info!(file, "translated file written"),
                Err(e) => {
                    error!(file, error = %e, "failed to write translated file");
                    return FileOutcome::Skipped {
                        errors: vec![format!("Could not write translated file: {e}")],
                    };
                }
            }
            let mut entries = build_file_ledger(&source_map, &final_map);
            mark_failed(&mut entries, failed_keys.iter().chain(&untranslated));
            ledger.set_file(&job.ledger_key, entries);
        }

        FileOutcome::Translated {
            translated: extracted
                .len()
                .saturating_sub(failed_keys.len() + untranslated.len()),
            failed_keys,
        }
    }

    /// Translates all extracted texts concurrently; output order matches input order.
    /// `None` marks a text the translator could not handle.
    async fn translate_all(
        &self,
        job: &FileJob,
        extracted: &ExtractedTexts,
        context: &[String],
    ) -> Vec<Option<String>> {
        let glossary = self.glossary.for_language(&job.language_code);
        let mut pending: FuturesUnordered<_> = extracted
            .texts
            .iter()
            .zip(&extracted.keys)
            .enumerate()
            .map(|(idx, (text, key))| {
                let request = TranslationRequest {
                    key: key.clone(),
                    text: text.clone(),
                    source_text: text.clone(),
                    language_code: job.language_code.clone(),
                    language_name: job.language_name.clone(),
                    glossary: glossary.clone(),
                    brand_terms: self.config.brand_terms.clone(),
                    context: context.to_vec(),
                };
                async move { (idx, self.translate_one(request).await) }
            })
            .collect();

        let mut results = Vec::with_capacity(extracted.len());
        while let Some(result) = pending.next().await {
            results.push(result);
        }
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, text)| text).collect()
    }

    /// Translates one key; `None` when the source text has to be kept.
    async fn translate_one(&self, mut request: TranslationRequest) -> Option<String> {
        let Ok(_permit) = self.limiter.acquire().await else {
            warn!(key = %request.key, "concurrency limiter closed, keeping original text");
            return None;
        };

        let (protected, mapping) = protect_placeholders(&request.source_text);
        request.text = protected;

        match self.translator.translate(&request).await {
            Ok(raw) => {
                let restored = restore_placeholders(&raw, &mapping);
                let cleaned = clean_translated_text(restored.trim(), &request.source_text);
                if cleaned.is_empty() && !request.source_text.trim().is_empty() {
                    warn!(key = %request.key, "empty translation, keeping original text");
                    return None;
                }
                debug!(key = %request.key, translator = self.translator.name(), "translated");
                Some(cleaned)
            }
            Err(e) => {
                warn!(
                    key = %request.key,
                    translator = self.translator.name(),
                    error = %e,
                    "translation failed, keeping original text"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::{LedgerStatus, compute_hash},
        translator::{MockMode, MockTranslator},
    };
    use std::{collections::HashMap, fs};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        job: FileJob,
    }

    fn fixture(source: &str, target: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        let source_path = dir.path().join("app.properties");
        let target_path = dir.path().join("app_es.properties");
        fs::write(&source_path, source).unwrap();
        fs::write(&target_path, target).unwrap();
        let job = FileJob::new(target_path, source_path, "es", "Spanish");
        Fixture { dir, job }
    }

    fn pipeline(mode: MockMode, config: PipelineConfig) -> (Pipeline, Arc<MockTranslator>) {
        let mock = Arc::new(MockTranslator::new(mode));
        let pipeline = Pipeline::new(mock.clone(), config, Glossary::default());
        (pipeline, mock)
    }

    fn mappings(pairs: &[(&str, &str)]) -> MockMode {
        MockMode::Mappings(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_original() {
        let fx = fixture("a=Hello {0}\nb=Bye\n", "");
        let (pipeline, _) = pipeline(
            MockMode::FailKeys(vec!["a".to_string()]),
            PipelineConfig::default(),
        );
        let mut ledger = Ledger::default();
        let outcome = pipeline.process_file(&fx.job, &mut ledger).await;
        assert_eq!(
            outcome,
            FileOutcome::Translated {
                translated: 1,
                failed_keys: vec![]
            }
        );
        let written = fs::read_to_string(&fx.job.target_path).unwrap();
        assert_eq!(written, "a=Hello {0}\nb=Bye_es\n");
        let entries = ledger.file("app_es.properties").unwrap();
        assert_eq!(entries["a"].status, Some(LedgerStatus::Failed));
        assert_eq!(entries["b"].status, None);
    }

    #[tokio::test]
    async fn test_placeholder_break_reverted_and_marked_failed() {
        let fx = fixture("a=Hello {0}\nb=Bye\n", "");
        let (pipeline, _) = pipeline(
            mappings(&[("a", "Hola"), ("b", "Adiós")]),
            PipelineConfig::default(),
        );
        let mut ledger = Ledger::default();
        let outcome = pipeline.process_file(&fx.job, &mut ledger).await;
        assert_eq!(
            outcome,
            FileOutcome::Translated {
                translated: 1,
                failed_keys: vec!["a".to_string()]
            }
        );
        assert_eq!(
            fs::read_to_string(&fx.job.target_path).unwrap(),
            "a=Hello {0}\nb=Adiós\n"
        );
        let entries = ledger.file("app_es.properties").unwrap();
        assert_eq!(entries["a"].status, Some(LedgerStatus::Failed));
        assert_eq!(entries["b"].target_hash, compute_hash("Adiós"));
    }

    #[tokio::test]
    async fn test_tokens_restored_and_quotes_cleaned() {
        let fx = fixture("a=Hi <b>{name}</b>\n", "");
        let (pipeline, _) = pipeline(MockMode::Suffix, PipelineConfig::default());
        let mut ledger = Ledger::default();
        pipeline.process_file(&fx.job, &mut ledger).await;
        assert_eq!(
            fs::read_to_string(&fx.job.target_path).unwrap(),
            "a=Hi <b>{name}</b>_es\n"
        );
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_translator_or_writes() {
        let fx = fixture("a=Hello\n", "# header\n");
        let config = PipelineConfig {
            dry_run: true,
            ..PipelineConfig::default()
        };
        let (pipeline, mock) = pipeline(MockMode::Suffix, config);
        let ledger_path = fx.dir.path().join("ledger.json");
        let report = pipeline.run(std::slice::from_ref(&fx.job), &ledger_path).await;
        assert_eq!(mock.calls(), 0);
        assert_eq!(report.processed, vec!["app_es.properties"]);
        assert!(!ledger_path.exists());
        // Synchronization still ran as part of validation.
        assert_eq!(
            fs::read_to_string(&fx.job.target_path).unwrap(),
            "# header\na=Hello\n"
        );
    }

    #[tokio::test]
    async fn test_skipped_file_reported_and_untranslated() {
        let fx = fixture("a=Hello {0}\n", "a=Hola\n");
        let (pipeline, mock) = pipeline(MockMode::Suffix, PipelineConfig::default());
        let ledger_path = fx.dir.path().join("ledger.json");
        let report = pipeline.run(std::slice::from_ref(&fx.job), &ledger_path).await;
        assert_eq!(mock.calls(), 0);
        assert_eq!(
            report.skipped["app_es.properties"],
            vec!["Placeholder mismatch for key `a`."]
        );
        assert_eq!(fs::read_to_string(&fx.job.target_path).unwrap(), "a=Hola\n");
    }

    #[tokio::test]
    async fn test_concurrent_results_stay_in_order() {
        let source: String = (0..20).map(|i| format!("key{i:02}=Text {i}\n")).collect();
        let fx = fixture(&source, "");
        let mock = Arc::new(MockTranslator::with_delay(MockMode::Suffix, 5));
        let config = PipelineConfig {
            max_concurrent_api_calls: 3,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(mock.clone(), config, Glossary::default());
        let mut ledger = Ledger::default();
        pipeline.process_file(&fx.job, &mut ledger).await;
        let expected: String = (0..20).map(|i| format!("key{i:02}=Text {i}_es\n")).collect();
        assert_eq!(fs::read_to_string(&fx.job.target_path).unwrap(), expected);
        assert_eq!(mock.calls(), 20);
    }
}
