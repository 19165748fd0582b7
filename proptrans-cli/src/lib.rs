//! CLI library for testing purposes

pub mod config;
pub mod discovery;
pub mod logging;
pub mod openai;
pub mod sync;
pub mod translate;
pub mod validation;

pub use config::{AppConfig, Locale, LoggingConfig};
pub use discovery::{NameFilter, TargetFile, discover_targets};
pub use openai::OpenAiTranslator;
