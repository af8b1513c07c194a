use crate::gateway::{RetryPolicy, SuggestionGateway};
use crate::openai::OpenAiKeywordSource;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-5-chat-latest";

/// `[suggest]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    pub base_url: String,
    pub model: String,
    /// Number of suggestions requested per call
    pub count: usize,
    pub temperature: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    /// Per-attempt request timeout
    pub timeout_secs: u64,
    pub attempts: u32,
    /// Fixed pause between attempts
    pub backoff_ms: u64,
    /// Never read from or written to the config file; comes from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            count: 30,
            temperature: 0.3,
            presence_penalty: 0.8,
            max_tokens: 800,
            timeout_secs: 45,
            attempts: 3,
            backoff_ms: 2_000,
            api_key: None,
        }
    }
}

impl SuggestConfig {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
            attempt_timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Gateway over the configured HTTP service, or a disabled gateway when no API key
    /// is available.
    pub fn build_gateway(&self) -> Result<SuggestionGateway> {
        let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            log::info!("No API key configured; keyword suggestions are disabled");
            return Ok(SuggestionGateway::disabled());
        };
        let source = OpenAiKeywordSource::new(self, key)?;
        Ok(SuggestionGateway::new(Arc::new(source), self.retry_policy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let cfg = SuggestConfig::default();
        let policy = cfg.retry_policy();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(45));
    }

    #[test]
    fn missing_key_disables_gateway() {
        let cfg = SuggestConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!cfg.build_gateway().unwrap().is_enabled());
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let cfg = SuggestConfig {
            attempts: 0,
            ..Default::default()
        };
        assert_eq!(cfg.retry_policy().attempts, 1);
    }
}
