#![forbid(unsafe_code)]
//! Safe AI translation of Java `.properties` localization files.
//!
//! The crate reads and writes `.properties` files without losing a byte of
//! formatting, keeps target files in key-sync with their source, decides
//! which keys actually need translation through a persistent hash ledger,
//! and validates every translated value before it is written.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc};
//! use proptrans::{
//!     FileJob, Glossary, Pipeline, PipelineConfig,
//!     translator::{MockMode, MockTranslator},
//! };
//!
//! # async fn run() {
//! let translator = Arc::new(MockTranslator::new(MockMode::Suffix));
//! let pipeline = Pipeline::new(translator, PipelineConfig::default(), Glossary::default());
//! let job = FileJob::new("i18n/app_de.properties", "i18n/app.properties", "de", "German");
//! let report = pipeline.run(&[job], Path::new("translation_ledger.json")).await;
//! println!("{}", report.summary());
//! # }
//! ```
//!
//! # Guarantees
//!
//! - `serialize(parse(text)) == text` for untouched files
//! - a target's key set equals its source's key set after synchronization
//! - a translation that breaks placeholders or encoding is reverted for that key only
//! - a failed translation call keeps the original text

pub mod encoding;
pub mod error;
pub mod extract;
pub mod glossary;
pub mod ledger;
pub mod pipeline;
pub mod placeholder;
pub mod properties;
pub mod report;
pub mod sync;
pub mod traits;
pub mod translator;
pub mod types;
pub mod validation;

// Re-export most used types for easy consumption
pub use crate::{
    error::Error,
    extract::{ExtractedTexts, extract_texts_to_translate},
    glossary::Glossary,
    ledger::{Ledger, LedgerEntry, LedgerStatus, build_file_ledger, compute_hash},
    pipeline::{FileJob, FileOutcome, Pipeline, PipelineConfig},
    placeholder::has_placeholder_parity,
    properties::{PropertiesFile, parse, serialize},
    report::{RunReport, write_skipped_report},
    sync::{SyncReport, synchronize_keys},
    traits::Parser,
    translator::{TranslationRequest, Translator},
    types::{Entry, ParsedLine, Translations},
    validation::{
        PreValidation, lint_properties_file, run_per_key_validation,
        run_pre_translation_validation,
    },
};
