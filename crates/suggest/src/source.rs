use crate::error::Result;
use async_trait::async_trait;

/// One attempt against a keyword-expansion backend. Implementations return the raw
/// keyword list; trimming, dedup and truncation happen in the gateway.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn fetch(&self, seeds: &[String], count: usize) -> Result<Vec<String>>;
}

/// Fixed answer, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticKeywordSource {
    words: Vec<String>,
}

impl StaticKeywordSource {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl KeywordSource for StaticKeywordSource {
    async fn fetch(&self, _seeds: &[String], _count: usize) -> Result<Vec<String>> {
        Ok(self.words.clone())
    }
}
