//! # Evidence Session
//!
//! The per-participant state machine that ties the corpus, matcher, suggestion gateway
//! and ledger together.
//!
//! ```text
//! AwaitingIdentity ──identify──> KeywordEntry ──search──> Searched <──> Reviewing
//!                                     │                       │             │
//!                                     └──────── deadline passed (checked lazily) ──> Finalized
//! ```
//!
//! Every transition attempt first compares the [`SessionClock`] against the injected
//! [`Clock`]. Once expired, outstanding selections are written as
//! `evidence_mark_on_timeout` and the session only allows log export.

mod clock;
mod config;
mod error;
mod keywords;
mod session;

pub use clock::{Clock, ManualClock, SessionClock, SystemClock};
pub use config::{SessionConfig, DEFAULT_PREVIEW_LEN, DEFAULT_TIME_LIMIT_MINUTES};
pub use error::{Result, SessionError};
pub use keywords::KeywordSet;
pub use session::{
    CommitOutcome, FinalizeReport, IdentifyOutcome, PageItem, PageView, Phase, SearchOutcome,
    Session, SessionStatus, SuggestionOutcome, ALERT_THRESHOLDS,
};
