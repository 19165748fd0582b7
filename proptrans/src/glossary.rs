//! Per-language glossary: `{ "<code>": { "<term>": "<translation>" } }` in JSON.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Glossary(pub BTreeMap<String, BTreeMap<String, String>>);

impl Glossary {
    /// Loads a glossary file. Missing or invalid files yield an empty glossary.
    pub fn load(path: &Path) -> Glossary {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                error!(path = %path.display(), error = %e, "glossary file not readable");
                return Glossary::default();
            }
        };
        match serde_json::from_str::<Glossary>(&text) {
            Ok(glossary) => {
                info!(path = %path.display(), languages = glossary.0.len(), "loaded glossary");
                glossary
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "invalid glossary JSON");
                Glossary::default()
            }
        }
    }

    /// Terms for one language; empty when the language has none.
    pub fn for_language(&self, code: &str) -> BTreeMap<String, String> {
        self.0.get(code).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_and_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glossary.json");
        std::fs::write(&path, r#"{"de": {"wallet": "Wallet", "fee": "Gebühr"}}"#).unwrap();
        let glossary = Glossary::load(&path);
        assert_eq!(glossary.for_language("de").get("fee").map(String::as_str), Some("Gebühr"));
        assert!(glossary.for_language("fr").is_empty());
    }

    #[test]
    fn test_missing_and_invalid_are_empty() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Glossary::load(&dir.path().join("none.json")), Glossary::default());
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(Glossary::load(&path), Glossary::default());
    }
}
