use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_PARTICIPANT_CHARS: usize = 64;

/// Deduplication key for a filename: case-folded and whitespace-trimmed.
#[must_use]
pub fn normalize_identity(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParticipantIdError {
    #[error("participant identity is empty")]
    Empty,

    #[error("participant identity is longer than {MAX_PARTICIPANT_CHARS} characters")]
    TooLong,

    #[error("participant identity contains unsafe character {0:?}")]
    UnsafeChar(char),

    #[error("participant identity must not start with '.'")]
    LeadingDot,
}

/// Participant identity. Doubles as the ledger partition key, so it must be usable as a
/// single file name on every platform. Unsafe input is rejected rather than rewritten so
/// two participants can never end up sharing one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn parse(raw: &str) -> Result<Self, ParticipantIdError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ParticipantIdError::Empty);
        }
        if value.chars().count() > MAX_PARTICIPANT_CHARS {
            return Err(ParticipantIdError::TooLong);
        }
        if value.starts_with('.') {
            return Err(ParticipantIdError::LeadingDot);
        }
        if let Some(bad) = value.chars().find(|c| is_unsafe(*c)) {
            return Err(ParticipantIdError::UnsafeChar(bad));
        }
        Ok(Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_unsafe(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ParticipantIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ParticipantId> for String {
    fn from(value: ParticipantId) -> Self {
        value.0
    }
}
