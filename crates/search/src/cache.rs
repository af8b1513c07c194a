use crate::matcher::{search, MatchOptions};
use evidence_corpus::Corpus;
use evidence_protocol::MatchResult;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    corpus: String,
    keywords: Vec<String>,
    threshold_bits: u32,
    min_len: usize,
    ignore_single_digit: bool,
}

impl CacheKey {
    fn new(corpus: &Corpus, keywords: &[String], options: &MatchOptions) -> Self {
        Self {
            corpus: corpus.fingerprint().to_string(),
            keywords: keywords.to_vec(),
            threshold_bits: options.threshold.to_bits(),
            min_len: options.min_len,
            ignore_single_digit: options.ignore_single_digit,
        }
    }
}

/// Memoizes [`search`] by (corpus fingerprint, keyword list, options).
pub struct SearchCache {
    entries: LruCache<CacheKey, Arc<Vec<MatchResult>>>,
    hits: u64,
    misses: u64,
}

impl SearchCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn search(
        &mut self,
        corpus: &Corpus,
        keywords: &[String],
        options: &MatchOptions,
    ) -> Arc<Vec<MatchResult>> {
        let key = CacheKey::new(corpus, keywords, options);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(hit);
        }
        self.misses += 1;
        let results = Arc::new(search(corpus.entries(), keywords, options));
        log::debug!(
            "search cache miss: {} keywords -> {} results",
            keywords.len(),
            results.len()
        );
        self.entries.put(key, Arc::clone(&results));
        results
    }

    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
