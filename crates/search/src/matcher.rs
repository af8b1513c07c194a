use evidence_protocol::{CorpusEntry, MatchResult};
use serde::{Deserialize, Serialize};

pub const MATCH_SCORE: f32 = 1.0;
pub const MISS_SCORE: f32 = 0.0;

/// Keyword filtering and acceptance options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Minimum score for an entry to be returned
    pub threshold: f32,

    /// Keywords shorter than this (in characters, after trimming) are ignored
    pub min_len: usize,

    /// Ignore keywords that are a single numeric character
    pub ignore_single_digit: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            min_len: 2,
            ignore_single_digit: true,
        }
    }
}

impl MatchOptions {
    #[must_use]
    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }
}

/// Drop keywords the matcher would ignore. Survivors are trimmed, in input order.
#[must_use]
pub fn filter_keywords(keywords: &[String], options: &MatchOptions) -> Vec<String> {
    keywords
        .iter()
        .map(|kw| kw.trim())
        .filter(|kw| kw.chars().count() >= options.min_len)
        .filter(|kw| !(options.ignore_single_digit && is_single_digit(kw)))
        .map(str::to_string)
        .collect()
}

fn is_single_digit(kw: &str) -> bool {
    let mut chars = kw.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_numeric())
}

/// Lower-case and strip every whitespace character.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Binary score: 1.0 when any normalized keyword occurs in the normalized filename.
/// Additional hits do not raise the score.
#[must_use]
pub fn score(filename: &str, normalized_keywords: &[String]) -> f32 {
    let haystack = normalize_text(filename);
    if normalized_keywords
        .iter()
        .any(|kw| haystack.contains(kw.as_str()))
    {
        MATCH_SCORE
    } else {
        MISS_SCORE
    }
}

/// Score every entry and keep those at or above the threshold, highest score first.
/// Entries with equal scores keep corpus order. An empty keyword list after filtering
/// yields no results rather than the whole corpus.
#[must_use]
pub fn search(
    corpus: &[CorpusEntry],
    keywords: &[String],
    options: &MatchOptions,
) -> Vec<MatchResult> {
    let filtered = filter_keywords(keywords, options);
    if filtered.is_empty() {
        log::debug!("all {} keywords filtered out", keywords.len());
        return Vec::new();
    }
    let normalized: Vec<String> = filtered.iter().map(|kw| normalize_text(kw)).collect();

    let mut results: Vec<MatchResult> = corpus
        .iter()
        .map(|entry| MatchResult {
            score: score(&entry.filename, &normalized),
            entry: entry.clone(),
        })
        .filter(|result| result.score >= options.threshold)
        .collect();

    // sort_by is stable, so ties keep corpus order
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results
}
