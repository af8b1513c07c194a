use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod identity;

pub use identity::{normalize_identity, ParticipantId, ParticipantIdError};

/// One row of the filename corpus. Immutable once loaded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct CorpusEntry {
    pub filename: String,
    #[serde(default)]
    pub label: String,
}

impl CorpusEntry {
    pub fn new(filename: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct MatchResult {
    pub entry: CorpusEntry,
    pub score: f32,
}

impl MatchResult {
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.entry.filename
    }
}

/// Event kinds written to the participant ledger. The string forms are part of the
/// exported log format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EventKind {
    #[serde(rename = "phase_B_start")]
    PhaseStart,
    #[serde(rename = "phase_B_step1_popup")]
    IntroShown,
    #[serde(rename = "click_generate")]
    ClickGenerate,
    #[serde(rename = "llm_keywords")]
    SuggestedKeywords,
    #[serde(rename = "search")]
    Search,
    #[serde(rename = "search_results")]
    SearchResults,
    #[serde(rename = "evidence_mark")]
    EvidenceMark,
    #[serde(rename = "evidence_mark_on_timeout")]
    EvidenceMarkOnTimeout,
    #[serde(rename = "phase_B_end")]
    PhaseEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::PhaseStart,
        EventKind::IntroShown,
        EventKind::ClickGenerate,
        EventKind::SuggestedKeywords,
        EventKind::Search,
        EventKind::SearchResults,
        EventKind::EvidenceMark,
        EventKind::EvidenceMarkOnTimeout,
        EventKind::PhaseEnd,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::PhaseStart => "phase_B_start",
            EventKind::IntroShown => "phase_B_step1_popup",
            EventKind::ClickGenerate => "click_generate",
            EventKind::SuggestedKeywords => "llm_keywords",
            EventKind::Search => "search",
            EventKind::SearchResults => "search_results",
            EventKind::EvidenceMark => "evidence_mark",
            EventKind::EvidenceMarkOnTimeout => "evidence_mark_on_timeout",
            EventKind::PhaseEnd => "phase_B_end",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }

    /// Events whose payload is a list of filenames committed as evidence.
    #[must_use]
    pub const fn is_commit(self) -> bool {
        matches!(
            self,
            EventKind::EvidenceMark | EventKind::EvidenceMarkOnTimeout
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blocking messages surfaced to the participant. None of them interrupt the session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Shown once when the session opens.
    Intro,
    /// Every keyword was dropped by the length/digit filter.
    EmptyKeywordSet,
    EmptyResult,
    /// The suggestion gateway produced nothing (failure or empty answer).
    NoSuggestions,
    /// Commit found only filenames that were already evidence.
    NoNewEvidence,
    /// Remaining time crossed an alert threshold.
    TimeRemaining { seconds: u64 },
    /// The deadline passed and outstanding selections were auto-saved.
    AutoSaved { added: usize, total: usize },
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
