//! The translation capability consumed by the pipeline.
//!
//! The pipeline never talks to a translation service directly. It builds a
//! [`TranslationRequest`] per key and hands it to a [`Translator`]; an
//! error from the translator means "keep the original text".
//!
//! # Example
//!
//! ```ignore
//! use proptrans::translator::{MockMode, MockTranslator, TranslationRequest, Translator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTranslator::new(MockMode::Suffix);
//!     let request = TranslationRequest::new("greeting", "Hello", "de", "German");
//!     assert_eq!(mock.translate(&request).await.unwrap(), "Hello_de");
//! }
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::Error,
    ledger::normalize_value,
    properties::PropertiesFile,
    types::Translations,
};

/// Everything a translator gets to know about one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationRequest {
    pub key: String,
    /// Text to translate, placeholders already replaced by opaque tokens.
    pub text: String,
    /// Unprotected source text, for reference only.
    pub source_text: String,
    pub language_code: String,
    pub language_name: String,
    /// `term -> translation` for the target language.
    pub glossary: BTreeMap<String, String>,
    /// Terms that must be kept as-is.
    pub brand_terms: Vec<String>,
    /// Existing `key = "translation"` lines from the same file.
    pub context: Vec<String>,
}

impl TranslationRequest {
    pub fn new(
        key: impl Into<String>,
        text: impl Into<String>,
        language_code: impl Into<String>,
        language_name: impl Into<String>,
    ) -> Self {
        let text = text.into();
        TranslationRequest {
            key: key.into(),
            source_text: text.clone(),
            text,
            language_code: language_code.into(),
            language_name: language_name.into(),
            ..Default::default()
        }
    }
}

/// A translation backend.
///
/// Implementations must return the translated text or an error; they must
/// not panic. Retries, rate limits and timeouts are the implementation's
/// business.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, Error>;

    /// Name used in log lines.
    fn name(&self) -> &str {
        "translator"
    }
}

/// Collects up to `char_budget` characters of existing translations as prompt context.
///
/// Only entries that differ from their source value are used, in file order.
pub fn build_context(
    target: &PropertiesFile,
    source: &Translations,
    char_budget: usize,
) -> Vec<String> {
    let mut examples = Vec::new();
    let mut used = 0;
    for entry in target.entries() {
        let Some(source_value) = source.get(&entry.key).filter(|v| !v.is_empty()) else {
            continue;
        };
        if normalize_value(source_value) == normalize_value(&entry.value) {
            continue;
        }
        let example = format!("{} = \"{}\"", entry.key, entry.value);
        let cost = example.chars().count();
        if used + cost > char_budget {
            break;
        }
        used += cost;
        examples.push(example);
    }
    examples
}

/// Behaviour of a [`MockTranslator`].
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Appends `_<language_code>` to the text: `"Hello"` becomes `"Hello_de"`.
    Suffix,
    /// Returns the mapped value for the request key, otherwise behaves like `Suffix`.
    Mappings(HashMap<String, String>),
    /// Returns the text unchanged.
    Echo,
    /// Fails every request with this message.
    Error(String),
    /// Fails requests for these keys, behaves like `Suffix` otherwise.
    FailKeys(Vec<String>),
}

/// Deterministic translator for tests and dry experiments. Counts its calls.
#[derive(Debug)]
pub struct MockTranslator {
    mode: MockMode,
    delay_ms: u64,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Sleeps `delay_ms` before answering, to exercise out-of-order completion.
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        MockTranslator {
            mode,
            delay_ms,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn suffix(request: &TranslationRequest) -> String {
        format!("{}_{}", request.text, request.language_code)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            // Vary latency by key so completions interleave.
            let jitter = (request.key.len() as u64) % 5;
            tokio::time::sleep(Duration::from_millis(self.delay_ms + jitter)).await;
        }
        match &self.mode {
            MockMode::Suffix => Ok(Self::suffix(request)),
            MockMode::Mappings(map) => Ok(map
                .get(&request.key)
                .cloned()
                .unwrap_or_else(|| Self::suffix(request))),
            MockMode::Echo => Ok(request.text.clone()),
            MockMode::Error(message) => Err(Error::translation_error(message.clone())),
            MockMode::FailKeys(keys) if keys.contains(&request.key) => Err(
                Error::translation_error(format!("mock failure for '{}'", request.key)),
            ),
            MockMode::FailKeys(_) => Ok(Self::suffix(request)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
