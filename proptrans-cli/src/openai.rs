//! Translator backed by an OpenAI-compatible chat completions endpoint.

use std::{fmt::Write as _, time::Duration};

use async_trait::async_trait;
use proptrans::{Error, TranslationRequest, Translator};
use rand::Rng;
use reqwest::{StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

const BASE_DELAY_SECS: f64 = 1.0;

#[derive(Clone)]
pub struct OpenAiTranslator {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Whether a failed attempt is worth repeating.
enum Attempt {
    Retry {
        reason: String,
        after: Option<Duration>,
    },
    Fatal(String),
}

impl OpenAiTranslator {
    pub fn new(api_key: String, config: &AppConfig) -> Result<Self, Error> {
        if api_key.trim().is_empty() {
            return Err(Error::config_error("API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::config_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries.max(1),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn attempt(&self, body: &serde_json::Value) -> Result<String, Attempt> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Attempt::Retry {
                reason: format!("transport error: {}", e),
                after: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let after = retry_after(response.headers().get(RETRY_AFTER));
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let reason = format!("API error ({}): {}", status, error_text);
            return Err(if is_retryable(status) {
                Attempt::Retry { reason, after }
            } else {
                Attempt::Fatal(reason)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(format!("Failed to parse API response: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Attempt::Fatal("Invalid API response: no message content".to_string()))
    }
}

impl std::fmt::Debug for OpenAiTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTranslator")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, Error> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": system_prompt(&request.language_name) },
                { "role": "user", "content": user_prompt(request) },
            ],
        });

        for attempt in 1..=self.max_retries {
            match self.attempt(&body).await {
                Ok(text) => {
                    debug!(key = %request.key, attempt, "translation received");
                    return Ok(text);
                }
                Err(Attempt::Fatal(reason)) => return Err(Error::translation_error(reason)),
                Err(Attempt::Retry { reason, after }) => {
                    if attempt == self.max_retries {
                        return Err(Error::translation_error(format!(
                            "gave up on key '{}' after {} attempts: {}",
                            request.key, self.max_retries, reason
                        )));
                    }
                    let delay = after.unwrap_or_else(|| backoff_delay(attempt));
                    warn!(key = %request.key, %reason, "request failed");
                    info!(
                        "Retrying request to /chat/completions in {:.2} seconds (Attempt {}/{})",
                        delay.as_secs_f64(),
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(Error::translation_error(format!(
            "no attempt made for key '{}'",
            request.key
        )))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Parses `Retry-After` given in seconds or as `<n>ms`.
fn retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    let raw = value?.to_str().ok()?.trim();
    if let Some(ms) = raw.strip_suffix("ms") {
        return ms.trim().parse::<f64>().ok().map(|v| Duration::from_secs_f64(v.max(0.0) / 1000.0));
    }
    raw.parse::<f64>().ok().map(|v| Duration::from_secs_f64(v.max(0.0)))
}

/// `base * 2^(attempt-1)` plus up to one second of jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY_SECS * 2f64.powi(attempt.saturating_sub(1) as i32);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(exp + jitter)
}

fn system_prompt(language_name: &str) -> String {
    format!(
        "You are an expert translator specializing in software localization. \
Translate the following text from English to {language_name}, considering the context and glossary provided.

Instructions:
- Do not translate or modify placeholder tokens: any text enclosed within double underscores (e.g. __PH_abc123__) must remain exactly as is.
- Brand/technical glossary terms MUST NOT be translated. Preserve their original casing and form.
- Translation glossary entries are non-negotiable. Use the provided translation, matching the source term case-insensitively.
- Preserve formatting such as \\n and \\t.
- Do not add any additional characters or punctuation (no square brackets, no quotation marks).
- Do not escape single quotes. Treat ' as a literal character.
- Provide only the translated text corresponding to the Value."
    )
}

fn user_prompt(request: &TranslationRequest) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Brand/Technical Glossary (Do NOT translate these terms):");
    let mut seen = std::collections::BTreeSet::new();
    for term in request.brand_terms.iter().filter(|t| seen.insert(t.as_str())) {
        let _ = writeln!(out, "- {term}");
    }
    let _ = writeln!(out, "\nTranslation Glossary:");
    for (term, translation) in &request.glossary {
        let _ = writeln!(out, "- \"{term}\" -> \"{translation}\"");
    }
    let _ = writeln!(out, "\nContext (Existing Translations):");
    for example in &request.context {
        let _ = writeln!(out, "{example}");
    }
    let _ = writeln!(out, "\nText to Translate:\nKey: {}\nValue: {}", request.key, request.text);
    let _ = write!(out, "\nProvide the translation of the Value only, following the instructions above.");
    out
}
