//! Application configuration, loaded once at startup.
//!
//! The file format is picked by extension: `.toml` goes through `toml`,
//! anything else through `serde_yaml`. A missing file yields defaults;
//! the caller decides whether to warn about it.

use std::path::{Path, PathBuf};

use proptrans::PipelineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_file_path: Option<PathBuf>,
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file_path: Some(PathBuf::from("logs/translation_log.log")),
            log_to_console: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_folder: PathBuf,
    pub ledger_path: PathBuf,
    pub glossary_file_path: PathBuf,
    pub skipped_report_path: PathBuf,
    pub model_name: String,
    pub api_base_url: String,
    pub max_concurrent_api_calls: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub dry_run: bool,
    pub retranslate_identical_existing: bool,
    pub context_char_budget: usize,
    pub translation_filter_glob: Option<String>,
    pub supported_locales: Vec<Locale>,
    pub brand_technical_glossary: Vec<String>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_folder: PathBuf::from("."),
            ledger_path: PathBuf::from("translation_ledger.json"),
            glossary_file_path: PathBuf::from("glossary.json"),
            skipped_report_path: PathBuf::from("logs/skipped_files_report.md"),
            model_name: "gpt-4".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            max_concurrent_api_calls: 1,
            request_timeout_secs: 60,
            max_retries: 5,
            temperature: 0.3,
            dry_run: false,
            retranslate_identical_existing: false,
            context_char_budget: 4000,
            translation_filter_glob: None,
            supported_locales: Vec::new(),
            brand_technical_glossary: ["MuSig", "Bisq", "Lightning", "I2P", "Tor"]
                .into_iter()
                .map(String::from)
                .collect(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config at `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {}", path.display(), e))?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let config: Self = if is_toml {
            toml::from_str(&text)
                .map_err(|e| format!("Invalid TOML config '{}': {}", path.display(), e))?
        } else {
            serde_yaml::from_str(&text)
                .map_err(|e| format!("Invalid YAML config '{}': {}", path.display(), e))?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_api_calls == 0 {
            return Err("max_concurrent_api_calls must be at least 1".to_string());
        }
        for locale in &self.supported_locales {
            crate::validation::validate_language_code(&locale.code)?;
        }
        Ok(())
    }

    pub fn language_codes(&self) -> Vec<String> {
        self.supported_locales.iter().map(|l| l.code.clone()).collect()
    }

    /// Display name for `code`, or the code itself when it is not configured.
    pub fn language_name(&self, code: &str) -> String {
        self.supported_locales
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_concurrent_api_calls: self.max_concurrent_api_calls,
            retranslate_identical_existing: self.retranslate_identical_existing,
            dry_run: self.dry_run,
            context_char_budget: self.context_char_budget,
            brand_terms: self.brand_technical_glossary.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "input_folder: i18n\nmax_concurrent_api_calls: 3\nsupported_locales:\n  - code: de\n    name: German\n  - code: pt_BR\n    name: Brazilian Portuguese\nlogging:\n  log_level: debug\n",
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.input_folder, PathBuf::from("i18n"));
        assert_eq!(config.max_concurrent_api_calls, 3);
        assert_eq!(config.language_codes(), vec!["de", "pt_BR"]);
        assert_eq!(config.language_name("pt_BR"), "Brazilian Portuguese");
        assert_eq!(config.language_name("xx"), "xx");
        assert_eq!(config.logging.log_level, "debug");
        assert!(config.logging.log_to_console);
        assert_eq!(config.model_name, "gpt-4");
    }

    #[test]
    fn test_toml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "dry_run = true\ncontext_char_budget = 100\n\n[[supported_locales]]\ncode = \"fr\"\nname = \"French\"\n",
        )
        .unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert!(config.dry_run);
        let pipeline = config.pipeline_config();
        assert!(pipeline.dry_run);
        assert_eq!(pipeline.context_char_budget, 100);
        assert_eq!(pipeline.brand_terms.len(), 5);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "max_concurrent_api_calls: 0\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_rejects_bad_locale_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "supported_locales:\n  - code: \"not a code!\"\n    name: X\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
    }
}
