use anyhow::Result;
use evidence_protocol::{ErrorEnvelope, Notice};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct CommandRequest {
    pub action: CommandAction,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    Identify,
    Keywords,
    Suggest,
    ChooseSuggestions,
    Search,
    Select,
    Deselect,
    Toggle,
    SelectPage,
    DeselectPage,
    ClearSelection,
    Commit,
    Page,
    Status,
    Evidence,
    Export,
    Tick,
}

impl CommandAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandAction::Identify => "identify",
            CommandAction::Keywords => "keywords",
            CommandAction::Suggest => "suggest",
            CommandAction::ChooseSuggestions => "choose_suggestions",
            CommandAction::Search => "search",
            CommandAction::Select => "select",
            CommandAction::Deselect => "deselect",
            CommandAction::Toggle => "toggle",
            CommandAction::SelectPage => "select_page",
            CommandAction::DeselectPage => "deselect_page",
            CommandAction::ClearSelection => "clear_selection",
            CommandAction::Commit => "commit",
            CommandAction::Page => "page",
            CommandAction::Status => "status",
            CommandAction::Evidence => "evidence",
            CommandAction::Export => "export",
            CommandAction::Tick => "tick",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub participant: String,
}

/// Free text, comma or whitespace separated.
#[derive(Debug, Deserialize)]
pub struct KeywordsPayload {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChooseSuggestionsPayload {
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilenamePayload {
    pub filename: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageMove {
    Next,
    Prev,
}

/// `{"page": n}` jumps, `{"move": "next"|"prev"}` steps, `{}` shows the current page.
#[derive(Debug, Deserialize, Default)]
pub struct PagePayload {
    pub page: Option<usize>,
    #[serde(rename = "move")]
    pub step: Option<PageMove>,
}

#[derive(Debug, Deserialize)]
pub struct ExportPayload {
    pub dest: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SelectionOutput {
    pub changed: usize,
    pub selected: usize,
}

#[derive(Debug, Serialize)]
pub struct EvidenceOutput {
    pub total: usize,
    pub preview: Vec<String>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    Error,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    pub data: Value,
}

impl CommandResponse {
    pub fn ok(outcome: CommandOutcome) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: None,
            error: None,
            notices: outcome.notices,
            data: outcome.data,
        }
    }

    pub fn error(envelope: ErrorEnvelope) -> Self {
        Self {
            status: CommandStatus::Error,
            message: Some(envelope.message.clone()),
            error: Some(envelope),
            notices: Vec::new(),
            data: Value::Null,
        }
    }
}

pub struct CommandOutcome {
    pub data: Value,
    pub notices: Vec<Notice>,
}

impl CommandOutcome {
    pub fn from_value<T: Serialize>(value: T) -> Result<Self> {
        Ok(Self {
            data: serde_json::to_value(value)?,
            notices: Vec::new(),
        })
    }

    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }
}

pub fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(Into::into)
}
