use crate::error::{GatewayError, Result};
use crate::source::KeywordSource;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    /// Bound on a single attempt, independent of the source's own timeout
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(45),
        }
    }
}

/// Retrying front for a [`KeywordSource`]. "No suggestions" is a normal outcome: failures
/// are logged and collapse to an empty list.
#[derive(Clone)]
pub struct SuggestionGateway {
    source: Option<Arc<dyn KeywordSource>>,
    policy: RetryPolicy,
}

impl SuggestionGateway {
    pub fn new(source: Arc<dyn KeywordSource>, policy: RetryPolicy) -> Self {
        Self {
            source: Some(source),
            policy,
        }
    }

    /// Gateway that never calls out and always yields no suggestions.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            source: None,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// Up to `target` cleaned suggestions for `seeds`; empty on failure.
    pub async fn expand(&self, seeds: &[String], target: usize) -> Vec<String> {
        if seeds.is_empty() || target == 0 {
            return Vec::new();
        }
        match self.try_expand(seeds, target).await {
            Ok(words) => words,
            Err(err) => {
                log::warn!("Keyword suggestion failed: {err}");
                Vec::new()
            }
        }
    }

    /// Like [`Self::expand`] but reports why nothing came back.
    pub async fn try_expand(&self, seeds: &[String], target: usize) -> Result<Vec<String>> {
        let source = self.source.as_ref().ok_or(GatewayError::NotConfigured)?;
        let attempts = self.policy.attempts.max(1);

        for attempt in 1..=attempts {
            let outcome =
                tokio::time::timeout(self.policy.attempt_timeout, source.fetch(seeds, target))
                    .await
                    .unwrap_or_else(|_| {
                        Err(GatewayError::Timeout(self.policy.attempt_timeout.as_millis()))
                    });
            match outcome {
                Ok(raw) => return Ok(tidy_keywords(raw, target)),
                Err(err) => {
                    log::debug!("suggestion attempt {attempt}/{attempts} failed: {err}");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff).await;
                    }
                }
            }
        }
        Err(GatewayError::Exhausted(attempts))
    }
}

/// Trim, drop blanks, dedup case-sensitively keeping first occurrence, cap at `target`.
#[must_use]
pub fn tidy_keywords(raw: Vec<String>, target: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|word| word.trim().to_string())
        .filter(|word| !word.is_empty())
        .filter(|word| seen.insert(word.clone()))
        .take(target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticKeywordSource;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySource {
        failures_left: AtomicU32,
        calls: AtomicU32,
        words: Vec<String>,
    }

    impl FlakySource {
        fn new(failures: u32, words: &[&str]) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                words: words.iter().map(|w| w.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl KeywordSource for FlakySource {
        async fn fetch(&self, _seeds: &[String], _count: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(GatewayError::malformed("boom"));
            }
            Ok(self.words.clone())
        }
    }

    struct HangingSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl KeywordSource for HangingSource {
        async fn fetch(&self, _seeds: &[String], _count: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            Ok(vec!["late".to_string()])
        }
    }

    fn seeds() -> Vec<String> {
        vec!["land".to_string()]
    }

    #[test]
    fn tidy_dedups_case_sensitively_and_truncates() {
        let raw = ["zoning", " Zoning ", "zoning", "", "   ", "permit", "tax"]
            .iter()
            .map(|w| w.to_string())
            .collect();
        assert_eq!(tidy_keywords(raw, 3), vec!["zoning", "Zoning", "permit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let source = Arc::new(FlakySource::new(2, &["housing", "housing", "tax"]));
        let gateway = SuggestionGateway::new(source.clone(), RetryPolicy::default());

        let words = gateway.expand(&seeds(), 30).await;
        assert_eq!(words, vec!["housing", "tax"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_yields_empty_list() {
        let source = Arc::new(FlakySource::new(10, &["housing"]));
        let gateway = SuggestionGateway::new(source.clone(), RetryPolicy::default());

        assert!(gateway.expand(&seeds(), 30).await.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            gateway.try_expand(&seeds(), 30).await,
            Err(GatewayError::Exhausted(3))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_attempts_are_cut_off() {
        let source = Arc::new(HangingSource {
            calls: AtomicU32::new(0),
        });
        let gateway = SuggestionGateway::new(source.clone(), RetryPolicy::default());

        assert!(gateway.expand(&seeds(), 30).await.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn disabled_gateway_and_empty_seeds_yield_nothing() {
        assert!(SuggestionGateway::disabled()
            .expand(&seeds(), 30)
            .await
            .is_empty());

        let gateway = SuggestionGateway::new(
            Arc::new(StaticKeywordSource::new(["housing"])),
            RetryPolicy::default(),
        );
        assert!(gateway.expand(&[], 30).await.is_empty());
        assert_eq!(gateway.expand(&seeds(), 30).await, vec!["housing"]);
    }
}
