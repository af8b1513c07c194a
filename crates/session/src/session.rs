use crate::clock::{Clock, SessionClock};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::keywords::KeywordSet;
use evidence_corpus::Corpus;
use evidence_ledger::{EvidenceSet, LedgerStore};
use evidence_protocol::{EventKind, MatchResult, Notice, ParticipantId};
use evidence_search::{filter_keywords, Pager, SearchCache, DEFAULT_CACHE_CAPACITY};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Remaining-time marks (seconds) that raise a one-shot alert.
pub const ALERT_THRESHOLDS: [u64; 3] = [60, 30, 10];

const INTRO_PAYLOAD: &str = "shown";
const END_PAYLOAD: &str = "Time limit exceeded for B";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingIdentity,
    KeywordEntry,
    Searched,
    Reviewing,
    Finalized,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::AwaitingIdentity => "awaiting_identity",
            Phase::KeywordEntry => "keyword_entry",
            Phase::Searched => "searched",
            Phase::Reviewing => "reviewing",
            Phase::Finalized => "finalized",
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Phase::KeywordEntry | Phase::Searched | Phase::Reviewing
        )
    }
}

/// What the deadline transition saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizeReport {
    /// Filenames written under `evidence_mark_on_timeout`
    pub added: Vec<String>,
    /// Evidence count after finalization
    pub total: usize,
}

impl FinalizeReport {
    #[must_use]
    pub fn notice(&self) -> Notice {
        Notice::AutoSaved {
            added: self.added.len(),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifyOutcome {
    pub participant: String,
    pub phase: Phase,
    /// Evidence recovered from an existing ledger
    pub recovered: usize,
    pub skipped_records: usize,
    pub resumed_clock: bool,
    pub remaining_seconds: u64,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionOutcome {
    pub offered: Vec<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Keywords the matcher actually used
    pub keywords: Vec<String>,
    pub total: usize,
    pub page: PageView,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitOutcome {
    pub added: Vec<String>,
    pub total: usize,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageItem {
    pub filename: String,
    pub label: String,
    pub score: f32,
    pub selected: bool,
    pub evidence: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub total: usize,
    pub items: Vec<PageItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: Phase,
    pub participant: Option<String>,
    pub remaining_seconds: Option<u64>,
    pub expired: bool,
    pub evidence: usize,
    pub selected: usize,
    pub results: usize,
    pub page: usize,
    pub page_count: usize,
    pub keywords: Vec<String>,
}

/// One participant's evidence-collection session.
///
/// Every mutating operation first checks the deadline. If it has passed, outstanding
/// selections are auto-saved, the session moves to [`Phase::Finalized`] and the operation
/// fails with [`SessionError::Expired`] carrying what was saved.
pub struct Session {
    config: SessionConfig,
    corpus: Arc<Corpus>,
    ledger: LedgerStore,
    clock: Arc<dyn Clock>,
    cache: SearchCache,
    phase: Phase,
    participant: Option<ParticipantId>,
    deadline: Option<SessionClock>,
    keywords: KeywordSet,
    results: Arc<Vec<MatchResult>>,
    pager: Pager,
    selection: BTreeSet<String>,
    evidence: EvidenceSet,
    alerts_sent: BTreeSet<u64>,
    end_logged: bool,
}

impl Session {
    pub fn new(config: SessionConfig, corpus: Arc<Corpus>, clock: Arc<dyn Clock>) -> Result<Self> {
        let pager = Pager::new(config.page_size)?;
        let ledger = LedgerStore::new(&config.log_dir);
        Ok(Self {
            config,
            corpus,
            ledger,
            clock,
            cache: SearchCache::new(DEFAULT_CACHE_CAPACITY),
            phase: Phase::AwaitingIdentity,
            participant: None,
            deadline: None,
            keywords: KeywordSet::new(),
            results: Arc::new(Vec::new()),
            pager,
            selection: BTreeSet::new(),
            evidence: EvidenceSet::new(),
            alerts_sent: BTreeSet::new(),
            end_logged: false,
        })
    }

    /// Bind the session to a participant, recovering any evidence already in their ledger,
    /// and start the clock.
    pub fn identify(&mut self, raw: &str) -> Result<IdentifyOutcome> {
        if let Some(current) = &self.participant {
            return Err(SessionError::AlreadyIdentified(current.to_string()));
        }
        let participant = ParticipantId::parse(raw)?;
        let report = self.ledger.replay(&participant)?;
        let now = self.clock.now();
        let limit = self.config.limit_seconds();

        let resumed_start = if self.config.resume_clock {
            report.started_at
        } else {
            None
        };
        let mut deadline = SessionClock::new(resumed_start.unwrap_or(now), limit);
        let recovered = report.evidence.len();
        let skipped_records = report.warnings.len();

        if self.config.resume_clock && report.ended {
            deadline.expire();
            self.deadline = Some(deadline);
            self.evidence = report.evidence;
            self.participant = Some(participant);
            self.end_logged = true;
            self.phase = Phase::Finalized;
            log::info!("Ledger already closed; session opens finalized");
            return Ok(self.identify_outcome(recovered, skipped_records, true, Vec::new()));
        }

        if resumed_start.is_none() {
            let payload = format!("Phase B started: {} minutes", self.config.minutes_label());
            self.ledger
                .append_at(&participant, EventKind::PhaseStart, &json!(payload), now)?;
        }
        self.ledger
            .append_at(&participant, EventKind::IntroShown, &json!(INTRO_PAYLOAD), now)?;

        log::info!(
            "Session started for {participant}: {} s limit, {recovered} evidence recovered",
            limit
        );
        self.deadline = Some(deadline);
        self.evidence = report.evidence;
        self.participant = Some(participant);
        self.phase = Phase::KeywordEntry;

        let mut notices = vec![Notice::Intro];
        if let Some(saved) = self.expire_if_due()? {
            notices.push(saved.notice());
        }
        Ok(self.identify_outcome(
            recovered,
            skipped_records,
            resumed_start.is_some(),
            notices,
        ))
    }

    fn identify_outcome(
        &self,
        recovered: usize,
        skipped_records: usize,
        resumed_clock: bool,
        notices: Vec<Notice>,
    ) -> IdentifyOutcome {
        IdentifyOutcome {
            participant: self
                .participant
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            phase: self.phase,
            recovered,
            skipped_records,
            resumed_clock,
            remaining_seconds: self.remaining_seconds().unwrap_or(0),
            notices,
        }
    }

    /// Replace the base keywords with those parsed from `text`.
    pub fn set_keywords(&mut self, text: &str) -> Result<Vec<String>> {
        self.guard()?;
        Ok(self.keywords.set_base(text).to_vec())
    }

    /// First half of a suggestion round: log the request and hand back the seeds. The
    /// caller runs the gateway without holding the session, then calls
    /// [`Session::complete_suggestions`].
    pub fn begin_suggestions(&mut self) -> Result<Vec<String>> {
        self.guard()?;
        let seeds = self.keywords.base().to_vec();
        if seeds.is_empty() {
            return Err(SessionError::NoKeywords);
        }
        self.record(EventKind::ClickGenerate, &json!(seeds.join(",")))?;
        Ok(seeds)
    }

    pub fn complete_suggestions(&mut self, words: Vec<String>) -> Result<SuggestionOutcome> {
        self.guard()?;
        self.record(EventKind::SuggestedKeywords, &json!(words.join("|")))?;
        self.keywords.offer(words);

        let offered = self.keywords.offered().to_vec();
        let notices = if offered.is_empty() {
            vec![Notice::NoSuggestions]
        } else {
            Vec::new()
        };
        Ok(SuggestionOutcome { offered, notices })
    }

    pub fn choose_suggestions<S: AsRef<str>>(&mut self, picks: &[S]) -> Result<Vec<String>> {
        self.guard()?;
        Ok(self.keywords.choose(picks).to_vec())
    }

    /// Run the matcher over the current keywords and replace the stored results. Selection
    /// and evidence are kept; paging restarts at page 1.
    pub fn search(&mut self) -> Result<SearchOutcome> {
        self.guard()?;
        self.record(
            EventKind::Search,
            &json!({
                "base_keywords": self.keywords.base(),
                "llm_keywords": self.keywords.chosen(),
            }),
        )?;

        let keywords = self.keywords.combined();
        let effective = filter_keywords(&keywords, &self.config.matching);
        let results = self
            .cache
            .search(&self.corpus, &keywords, &self.config.matching);

        let filenames: Vec<&str> = results.iter().map(MatchResult::filename).collect();
        self.record(EventKind::SearchResults, &json!(filenames))?;

        let mut notices = Vec::new();
        if effective.is_empty() {
            notices.push(Notice::EmptyKeywordSet);
        } else if results.is_empty() {
            notices.push(Notice::EmptyResult);
        }

        log::info!(
            "Search with {} keyword(s) matched {} of {} files",
            effective.len(),
            results.len(),
            self.corpus.len()
        );
        self.pager.reset(results.len());
        self.results = results;
        self.phase = Phase::Searched;

        Ok(SearchOutcome {
            keywords: effective,
            total: self.results.len(),
            page: self.page_view(),
            notices,
        })
    }

    /// Check or uncheck one filename. Returns whether the selection changed.
    pub fn set_selected(&mut self, filename: &str, selected: bool) -> Result<bool> {
        self.guard()?;
        let changed = if selected {
            self.ensure_in_results(filename)?;
            self.selection.insert(filename.to_string())
        } else {
            self.selection.remove(filename)
        };
        self.mark_reviewing();
        Ok(changed)
    }

    /// Flip one filename. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, filename: &str) -> Result<bool> {
        self.guard()?;
        let selected = if self.selection.remove(filename) {
            false
        } else {
            self.ensure_in_results(filename)?;
            self.selection.insert(filename.to_string());
            true
        };
        self.mark_reviewing();
        Ok(selected)
    }

    /// Select every filename on the current page. Returns how many were newly selected.
    pub fn select_page(&mut self) -> Result<usize> {
        self.guard()?;
        let mut added = 0;
        for result in self.pager.slice(self.results.as_slice()) {
            if self.selection.insert(result.filename().to_string()) {
                added += 1;
            }
        }
        self.mark_reviewing();
        Ok(added)
    }

    pub fn deselect_page(&mut self) -> Result<usize> {
        self.guard()?;
        let mut removed = 0;
        for result in self.pager.slice(self.results.as_slice()) {
            if self.selection.remove(result.filename()) {
                removed += 1;
            }
        }
        self.mark_reviewing();
        Ok(removed)
    }

    pub fn clear_selection(&mut self) -> Result<usize> {
        self.guard()?;
        let cleared = self.selection.len();
        self.selection.clear();
        Ok(cleared)
    }

    /// Move selected filenames that are not yet evidence into the evidence set. Only the
    /// newly added names are written to the ledger. The selection is cleared either way.
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        self.guard()?;
        let added = self
            .evidence
            .new_items(self.selection.iter().map(String::as_str));

        let mut notices = Vec::new();
        if added.is_empty() {
            notices.push(Notice::NoNewEvidence);
        } else {
            self.record(EventKind::EvidenceMark, &json!(added))?;
            for name in &added {
                self.evidence.insert(name);
            }
            log::info!(
                "Committed {} new evidence item(s), {} total",
                added.len(),
                self.evidence.len()
            );
        }
        self.selection.clear();

        Ok(CommitOutcome {
            added,
            total: self.evidence.len(),
            notices,
        })
    }

    pub fn next_page(&mut self) -> Result<PageView> {
        self.guard()?;
        self.pager.next();
        Ok(self.page_view())
    }

    pub fn prev_page(&mut self) -> Result<PageView> {
        self.guard()?;
        self.pager.prev();
        Ok(self.page_view())
    }

    /// Jump to a 1-indexed page, clamped to the available range.
    pub fn go_to_page(&mut self, page: usize) -> Result<PageView> {
        self.guard()?;
        self.pager.go_to(page);
        Ok(self.page_view())
    }

    /// The current page of results with selection and evidence marks.
    #[must_use]
    pub fn page_view(&self) -> PageView {
        let items = self
            .pager
            .slice(self.results.as_slice())
            .iter()
            .map(|result| PageItem {
                filename: result.entry.filename.clone(),
                label: result.entry.label.clone(),
                score: result.score,
                selected: self.selection.contains(result.filename()),
                evidence: self.evidence.contains(result.filename()),
            })
            .collect();
        PageView {
            page: self.pager.current(),
            page_count: self.pager.page_count(),
            page_size: self.pager.page_size(),
            total: self.results.len(),
            items,
        }
    }

    /// Finalize if the deadline has passed. Returns the report only for the call that
    /// performed the transition; later calls are no-ops.
    pub fn check_deadline(&mut self) -> Result<Option<FinalizeReport>> {
        if !self.phase.is_active() {
            return Ok(None);
        }
        self.expire_if_due()
    }

    /// End the session now, auto-saving outstanding selections. Calling it on an already
    /// finalized session writes nothing and reports no additions.
    pub fn finalize(&mut self) -> Result<FinalizeReport> {
        match self.phase {
            Phase::AwaitingIdentity => Err(SessionError::IdentityRequired),
            Phase::Finalized => Ok(FinalizeReport {
                added: Vec::new(),
                total: self.evidence.len(),
            }),
            _ => {
                if let Some(deadline) = self.deadline.as_mut() {
                    deadline.expire();
                }
                self.finalize_now()
            }
        }
    }

    /// Next due remaining-time alert, if any. Each threshold fires at most once; when
    /// several are crossed at once only the tightest is reported.
    pub fn take_alert(&mut self) -> Option<Notice> {
        if !self.phase.is_active() {
            return None;
        }
        let remaining = self.remaining_seconds()?;
        if remaining == 0 {
            return None;
        }
        let crossed: Vec<u64> = ALERT_THRESHOLDS
            .into_iter()
            .filter(|threshold| remaining <= *threshold && !self.alerts_sent.contains(threshold))
            .collect();
        let tightest = crossed.iter().copied().min()?;
        self.alerts_sent.extend(crossed);
        Some(Notice::TimeRemaining { seconds: tightest })
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let remaining = self.remaining_seconds();
        SessionStatus {
            phase: self.phase,
            participant: self.participant.as_ref().map(ToString::to_string),
            remaining_seconds: remaining,
            expired: self.phase == Phase::Finalized || remaining == Some(0),
            evidence: self.evidence.len(),
            selected: self.selection.len(),
            results: self.results.len(),
            page: self.pager.current(),
            page_count: self.pager.page_count(),
            keywords: self.keywords.combined(),
        }
    }

    /// First few evidence filenames, sorted.
    #[must_use]
    pub fn evidence_preview(&self) -> Vec<&str> {
        let mut names = self.evidence.sorted();
        names.truncate(self.config.preview_len);
        names
    }

    /// Copy the participant's ledger to `dest`. Allowed in every phase after identification.
    pub fn export_log(&self, dest: impl AsRef<Path>) -> Result<u64> {
        let participant = self
            .participant
            .as_ref()
            .ok_or(SessionError::IdentityRequired)?;
        Ok(self.ledger.export(participant, dest)?)
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    #[must_use]
    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    #[must_use]
    pub const fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    #[must_use]
    pub const fn evidence(&self) -> &EvidenceSet {
        &self.evidence
    }

    fn remaining_seconds(&self) -> Option<u64> {
        self.deadline
            .as_ref()
            .map(|deadline| deadline.remaining(self.clock.now()))
    }

    fn guard(&mut self) -> Result<()> {
        match self.phase {
            Phase::AwaitingIdentity => return Err(SessionError::IdentityRequired),
            Phase::Finalized => return Err(SessionError::Finalized),
            _ => {}
        }
        match self.expire_if_due()? {
            Some(report) => Err(SessionError::Expired(report)),
            None => Ok(()),
        }
    }

    fn expire_if_due(&mut self) -> Result<Option<FinalizeReport>> {
        let now = self.clock.now();
        let due = self
            .deadline
            .as_mut()
            .is_some_and(|deadline| deadline.check(now));
        if !due || self.phase == Phase::Finalized {
            return Ok(None);
        }
        self.finalize_now().map(Some)
    }

    // End marker first, then the auto-saved names. A failed write leaves the session
    // active so the next action retries without repeating the end marker.
    fn finalize_now(&mut self) -> Result<FinalizeReport> {
        if !self.end_logged {
            self.record(EventKind::PhaseEnd, &json!(END_PAYLOAD))?;
            self.end_logged = true;
        }
        let added = self
            .evidence
            .new_items(self.selection.iter().map(String::as_str));
        if !added.is_empty() {
            self.record(EventKind::EvidenceMarkOnTimeout, &json!(added))?;
            for name in &added {
                self.evidence.insert(name);
            }
        }
        self.selection.clear();
        self.phase = Phase::Finalized;

        let report = FinalizeReport {
            added,
            total: self.evidence.len(),
        };
        log::info!(
            "Time limit reached: {} selection(s) auto-saved, {} evidence total",
            report.added.len(),
            report.total
        );
        Ok(report)
    }

    fn record(&self, kind: EventKind, payload: &Value) -> Result<()> {
        let participant = self
            .participant
            .as_ref()
            .ok_or(SessionError::IdentityRequired)?;
        self.ledger
            .append_at(participant, kind, payload, self.clock.now())?;
        Ok(())
    }

    fn ensure_in_results(&self, filename: &str) -> Result<()> {
        if self.results.iter().any(|result| result.filename() == filename) {
            Ok(())
        } else {
            Err(SessionError::NotInResults(filename.to_string()))
        }
    }

    fn mark_reviewing(&mut self) {
        if self.phase == Phase::Searched {
            self.phase = Phase::Reviewing;
        }
    }
}
