use crate::session::FinalizeReport;
use evidence_ledger::LedgerError;
use evidence_protocol::ParticipantIdError;
use evidence_search::SearchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A participant identity is required before any other action")]
    IdentityRequired,

    #[error("Invalid participant identity: {0}")]
    InvalidIdentity(#[from] ParticipantIdError),

    #[error("Session is already identified as {0}")]
    AlreadyIdentified(String),

    #[error("Session is finalized; only log export is available")]
    Finalized,

    /// The deadline passed and this action triggered finalization instead of running.
    #[error("Time limit exceeded; {} outstanding selection(s) auto-saved", .0.added.len())]
    Expired(FinalizeReport),

    #[error("No base keywords entered")]
    NoKeywords,

    #[error("{0} is not in the current search results")]
    NotInResults(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

impl SessionError {
    /// Stable machine-readable code for response envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            SessionError::IdentityRequired => "identity_required",
            SessionError::InvalidIdentity(_) => "invalid_identity",
            SessionError::AlreadyIdentified(_) => "already_identified",
            SessionError::Finalized => "finalized",
            SessionError::Expired(_) => "expired",
            SessionError::NoKeywords => "no_keywords",
            SessionError::NotInResults(_) => "not_in_results",
            SessionError::Ledger(_) => "ledger",
            SessionError::Search(_) => "search",
        }
    }
}
