use anyhow::{Context as AnyhowContext, Result};
use evidence_corpus::CorpusOptions;
use evidence_session::SessionConfig;
use evidence_suggest::SuggestConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "EVIDENCE_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV: &str = "EVIDENCE_API_BASE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSection {
    /// Corpus file; `--corpus` takes precedence
    pub path: Option<PathBuf>,

    #[serde(flatten)]
    pub options: CorpusOptions,
}

/// Whole configuration file. Every section and field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: CorpusSection,
    pub session: SessionConfig,
    pub suggest: SuggestConfig,
}

impl AppConfig {
    /// Read `path` (or start from defaults) and layer environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = present(API_KEY_ENV).or_else(|| present(OPENAI_KEY_ENV)) {
            self.suggest.api_key = Some(key);
        }
        if let Some(base) = present(API_BASE_ENV) {
            self.suggest.base_url = base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evidence_corpus::TextEncoding;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.corpus.options.delimiter, ',');
        assert_eq!(config.session.limit_seconds(), 600);
        assert_eq!(config.session.page_size, 30);
        assert_eq!(config.suggest.count, 30);
        assert!(config.suggest.api_key.is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [corpus]
            path = "data/files.csv"
            delimiter = ";"
            encodings = ["cp949", "latin1"]

            [session]
            time_limit_minutes = 5
            page_size = 20
            threshold = 1.0
            min_len = 3
            log_dir = "out"
            resume_clock = true

            [suggest]
            model = "local-model"
            attempts = 5
        "#;
        let config = AppConfig::from_toml(raw).unwrap();
        assert_eq!(config.corpus.path, Some(PathBuf::from("data/files.csv")));
        assert_eq!(config.corpus.options.delimiter, ';');
        assert_eq!(
            config.corpus.options.encodings,
            vec![TextEncoding::Cp949, TextEncoding::Latin1]
        );
        assert_eq!(config.session.limit_seconds(), 300);
        assert_eq!(config.session.page_size, 20);
        assert_eq!(config.session.matching.min_len, 3);
        assert_eq!(config.session.log_dir, PathBuf::from("out"));
        assert!(config.session.resume_clock);
        assert_eq!(config.suggest.model, "local-model");
        assert_eq!(config.suggest.attempts, 5);
        assert_eq!(config.suggest.temperature, 0.3);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let raw = "[corpus]\nencodings = [\"utf-16\"]\n";
        assert!(AppConfig::from_toml(raw).is_err());
    }

    #[test]
    fn environment_supplies_key_and_endpoint() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            OPENAI_KEY_ENV => Some("sk-test".to_string()),
            API_KEY_ENV => Some(" ".to_string()),
            API_BASE_ENV => Some("http://localhost:8080/v1".to_string()),
            _ => None,
        });
        assert_eq!(config.suggest.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.suggest.base_url, "http://localhost:8080/v1");
    }
}
