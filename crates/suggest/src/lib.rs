//! # Evidence Suggest
//!
//! Adapter for the external keyword-expansion service.
//!
//! ```text
//! seeds + count
//!     │
//!     ├──> KeywordSource::fetch   (one attempt, bounded by attempt_timeout)
//!     │      └─> retried up to RetryPolicy::attempts with a fixed backoff
//!     │
//!     └──> tidy_keywords          (trim, drop blanks, dedup, truncate)
//! ```
//!
//! Exhausted retries produce an empty list, never an error.

mod config;
mod error;
mod gateway;
mod openai;
mod source;

pub use config::{SuggestConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{GatewayError, Result};
pub use gateway::{tidy_keywords, RetryPolicy, SuggestionGateway};
pub use openai::{OpenAiKeywordSource, SYSTEM_PROMPT};
pub use source::{KeywordSource, StaticKeywordSource};
