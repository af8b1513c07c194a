//! Keyword matching over the filename corpus, plus paging of the result set.

mod cache;
mod error;
mod matcher;
mod pagination;

pub use cache::{SearchCache, DEFAULT_CACHE_CAPACITY};
pub use error::{Result, SearchError};
pub use matcher::{
    filter_keywords, normalize_text, score, search, MatchOptions, MATCH_SCORE, MISS_SCORE,
};
pub use pagination::{page, page_count, Pager, DEFAULT_PAGE_SIZE};
