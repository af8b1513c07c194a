pub mod domain;

pub use domain::{CommandAction, CommandRequest, CommandResponse, CommandStatus};

use anyhow::Result;
use domain::{
    parse_payload, ChooseSuggestionsPayload, CommandOutcome, EvidenceOutput, ExportOutput,
    ExportPayload, FilenamePayload, IdentifyPayload, KeywordsPayload, PageMove, PagePayload,
    SelectionOutput,
};
use evidence_protocol::ErrorEnvelope;
use evidence_session::{Session, SessionError};
use evidence_suggest::SuggestionGateway;
use serde_json::json;

/// Drives one [`Session`] from JSON requests. Requests are handled strictly one at a time.
pub struct SessionHandler {
    session: Session,
    gateway: SuggestionGateway,
    suggestion_count: usize,
}

impl SessionHandler {
    pub fn new(session: Session, gateway: SuggestionGateway, suggestion_count: usize) -> Self {
        Self {
            session,
            gateway,
            suggestion_count,
        }
    }

    pub async fn execute(&mut self, request: CommandRequest) -> CommandResponse {
        let action = request.action;
        let mut response = match self.dispatch(request).await {
            Ok(outcome) => CommandResponse::ok(outcome),
            Err(err) => error_response(action, &err),
        };
        if let Some(alert) = self.session.take_alert() {
            response.notices.push(alert);
        }
        response
    }

    async fn dispatch(&mut self, request: CommandRequest) -> Result<CommandOutcome> {
        let CommandRequest { action, payload } = request;
        log::debug!("session action {}", action.as_str());

        match action {
            CommandAction::Identify => {
                let payload: IdentifyPayload = parse_payload(payload)?;
                let outcome = self.session.identify(&payload.participant)?;
                let notices = outcome.notices.clone();
                Ok(CommandOutcome::from_value(outcome)?.with_notices(notices))
            }
            CommandAction::Keywords => {
                let payload: KeywordsPayload = parse_payload(payload)?;
                let base = self.session.set_keywords(&payload.text)?;
                CommandOutcome::from_value(json!({ "base_keywords": base }))
            }
            CommandAction::Suggest => {
                let seeds = self.session.begin_suggestions()?;
                let words = self.gateway.expand(&seeds, self.suggestion_count).await;
                let outcome = self.session.complete_suggestions(words)?;
                let notices = outcome.notices.clone();
                Ok(CommandOutcome::from_value(outcome)?.with_notices(notices))
            }
            CommandAction::ChooseSuggestions => {
                let payload: ChooseSuggestionsPayload = parse_payload(payload)?;
                let chosen = self.session.choose_suggestions(&payload.keywords)?;
                CommandOutcome::from_value(json!({
                    "chosen": chosen,
                    "keywords": self.session.keywords().combined(),
                }))
            }
            CommandAction::Search => {
                let outcome = self.session.search()?;
                let notices = outcome.notices.clone();
                Ok(CommandOutcome::from_value(outcome)?.with_notices(notices))
            }
            CommandAction::Select | CommandAction::Deselect => {
                let payload: FilenamePayload = parse_payload(payload)?;
                let selected = action == CommandAction::Select;
                let changed = self.session.set_selected(&payload.filename, selected)?;
                self.selection_output(usize::from(changed))
            }
            CommandAction::Toggle => {
                let payload: FilenamePayload = parse_payload(payload)?;
                let selected = self.session.toggle(&payload.filename)?;
                CommandOutcome::from_value(json!({
                    "filename": payload.filename,
                    "selected": selected,
                    "selection": self.session.selection().len(),
                }))
            }
            CommandAction::SelectPage => {
                let changed = self.session.select_page()?;
                self.selection_output(changed)
            }
            CommandAction::DeselectPage => {
                let changed = self.session.deselect_page()?;
                self.selection_output(changed)
            }
            CommandAction::ClearSelection => {
                let changed = self.session.clear_selection()?;
                self.selection_output(changed)
            }
            CommandAction::Commit => {
                let outcome = self.session.commit()?;
                let notices = outcome.notices.clone();
                Ok(CommandOutcome::from_value(outcome)?.with_notices(notices))
            }
            CommandAction::Page => {
                let payload: PagePayload = parse_payload(payload)?;
                let view = match (payload.page, payload.step) {
                    (Some(page), _) => self.session.go_to_page(page)?,
                    (None, Some(PageMove::Next)) => self.session.next_page()?,
                    (None, Some(PageMove::Prev)) => self.session.prev_page()?,
                    (None, None) => self.session.page_view(),
                };
                CommandOutcome::from_value(view)
            }
            CommandAction::Status => CommandOutcome::from_value(self.session.status()),
            CommandAction::Evidence => {
                let evidence = self.session.evidence();
                CommandOutcome::from_value(EvidenceOutput {
                    total: evidence.len(),
                    preview: owned(self.session.evidence_preview()),
                    evidence: owned(evidence.sorted()),
                })
            }
            CommandAction::Export => {
                let payload: ExportPayload = parse_payload(payload)?;
                let bytes = self.session.export_log(&payload.dest)?;
                CommandOutcome::from_value(ExportOutput {
                    path: payload.dest,
                    bytes,
                })
            }
            CommandAction::Tick => {
                let finalized = self.session.check_deadline()?;
                let notices = finalized.iter().map(|report| report.notice()).collect();
                Ok(CommandOutcome::from_value(self.session.status())?.with_notices(notices))
            }
        }
    }

    fn selection_output(&self, changed: usize) -> Result<CommandOutcome> {
        CommandOutcome::from_value(SelectionOutput {
            changed,
            selected: self.session.selection().len(),
        })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}

/// Map a failed action onto the wire envelope. Session errors keep their own code; the
/// deadline transition also carries the auto-save notice and report.
pub fn error_response(action: CommandAction, err: &anyhow::Error) -> CommandResponse {
    let Some(session_err) = err.downcast_ref::<SessionError>() else {
        let envelope = ErrorEnvelope::new("invalid_request", format!("{err:#}"))
            .with_hint(format!("Check the payload fields for action={}", action.as_str()));
        return CommandResponse::error(envelope);
    };

    let mut envelope = ErrorEnvelope::new(session_err.code(), session_err.to_string());
    let mut notices = Vec::new();
    match session_err {
        SessionError::IdentityRequired => {
            envelope = envelope.with_hint("Send action=identify with payload.participant first");
        }
        SessionError::Finalized => {
            envelope = envelope.with_hint("Only action=export is available after the time limit");
        }
        SessionError::Expired(report) => {
            envelope.details = serde_json::to_value(report).ok();
            notices.push(report.notice());
        }
        SessionError::NoKeywords => {
            envelope = envelope.with_hint("Send action=keywords before asking for suggestions");
        }
        _ => {}
    }
    log::warn!("{} failed: {session_err}", action.as_str());

    let mut response = CommandResponse::error(envelope);
    response.notices = notices;
    response
}
