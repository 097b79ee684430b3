//! Launch fetch workflow
//!
//! One "fetch" action: index open launch tickets for duplicate detection,
//! pull the day's tickets for the designer's column, load the provider
//! directory, and render a report per ticket.

use std::sync::Arc;

use chrono::NaiveDate;
use gametools_core::{
    AppError, AppResult, Config, ProviderMatchPolicy, ProviderRecord, SessionContext, TicketRef,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::duplicates::{collect_all_pages, ClosedStates, DuplicateIndex, IndexStatus, MatchMode};
use crate::providers::ProviderDirectory;
use crate::traits::{IssueTracker, SpreadsheetStore, TicketQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FetchPhase {
    #[default]
    Idle,
    FetchingIndex,
    FetchingDayList,
    Rendering,
    Error,
}

/// Tracks the phase of a fetch and rejects out-of-order steps
#[derive(Debug, Default)]
pub struct FetchStateMachine {
    phase: FetchPhase,
    history: Vec<FetchPhase>,
    last_error: Option<String>,
}

impl FetchStateMachine {
    pub fn new() -> Self {
        Self {
            history: vec![FetchPhase::Idle],
            ..Self::default()
        }
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Every phase entered, starting with `Idle`
    pub fn history(&self) -> &[FetchPhase] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_transition(from: FetchPhase, to: FetchPhase) -> bool {
        use FetchPhase::*;
        matches!(
            (from, to),
            (Idle, FetchingIndex)
                | (FetchingIndex, FetchingDayList)
                | (FetchingDayList, Rendering)
                | (Rendering, Idle)
                | (FetchingIndex, Error)
                | (FetchingDayList, Error)
                | (Error, Idle)
        )
    }

    pub fn transition(&mut self, to: FetchPhase) -> AppResult<()> {
        if !Self::can_transition(self.phase, to) {
            return Err(AppError::Internal(format!(
                "Illegal fetch transition {:?} -> {:?}",
                self.phase, to
            )));
        }
        self.phase = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to `Error`, keeping the cause for display
    pub fn fail(&mut self, cause: &AppError) -> AppResult<()> {
        self.transition(FetchPhase::Error)?;
        self.last_error = Some(cause.to_string());
        Ok(())
    }
}

/// Matching and query settings for the fetch
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub launch_label: String,
    pub closed_states: ClosedStates,
    pub match_mode: MatchMode,
    pub page_size: u32,
    pub provider_range: String,
    pub provider_policy: ProviderMatchPolicy,
}

impl FetchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            launch_label: config.launch_label.clone(),
            closed_states: ClosedStates::from_config(config),
            match_mode: MatchMode::from_config(config),
            page_size: config.tracker_page_size,
            provider_range: config.provider_range.clone(),
            provider_policy: config.provider_match_policy,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            launch_label: "Game Launch".to_string(),
            closed_states: ClosedStates::default(),
            match_mode: MatchMode::Exact,
            page_size: 50,
            provider_range: "Sheet1!A:Z".to_string(),
            provider_policy: ProviderMatchPolicy::default(),
        }
    }
}

/// Everything shown for one launch ticket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchReport {
    pub title: String,
    pub ticket: TicketRef,
    pub duplicates: Vec<TicketRef>,
    pub providers: Vec<ProviderRecord>,
    pub unmatched_tags: Vec<String>,
    pub provider_notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub date: NaiveDate,
    pub index_status: IndexStatus,
    pub reports: Vec<LaunchReport>,
    pub phases: Vec<FetchPhase>,
}

impl FetchOutcome {
    /// Warning to show when duplicate detection ran on a partial index
    pub fn index_warning(&self) -> Option<String> {
        match &self.index_status {
            IndexStatus::Complete => None,
            IndexStatus::Incomplete { reason } => Some(format!(
                "Duplicate check may be incomplete: {}",
                reason
            )),
        }
    }
}

pub struct LaunchFetcher {
    tracker: Arc<dyn IssueTracker>,
    sheets: Arc<dyn SpreadsheetStore>,
    settings: FetchSettings,
}

impl LaunchFetcher {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        sheets: Arc<dyn SpreadsheetStore>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            tracker,
            sheets,
            settings,
        }
    }

    /// Run one fetch. On success the session's issue map is replaced by the
    /// day's tickets; on failure it is left untouched.
    #[instrument(skip(self, session), fields(designer = %session.designer()))]
    pub async fn fetch(
        &self,
        session: &mut SessionContext,
        date: NaiveDate,
    ) -> AppResult<FetchOutcome> {
        if session.tracker_key().is_empty() {
            return Err(AppError::MissingField("tracker API key".to_string()));
        }

        let mut machine = FetchStateMachine::new();
        match self.run(&mut machine, session, date).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(phase = ?machine.phase(), error = %err, "Fetch failed");
                if machine.fail(&err).is_ok() {
                    machine.transition(FetchPhase::Idle)?;
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        machine: &mut FetchStateMachine,
        session: &mut SessionContext,
        date: NaiveDate,
    ) -> AppResult<FetchOutcome> {
        let settings = &self.settings;
        let api_key = session.tracker_key().to_string();

        machine.transition(FetchPhase::FetchingIndex)?;
        // No state filter upstream: closed keywords match state names by
        // substring, which `nin` on exact names cannot express.
        let fetched = collect_all_pages(
            self.tracker.as_ref(),
            &api_key,
            &TicketQuery::labelled(&settings.launch_label),
            settings.page_size,
        )
        .await;
        let index = DuplicateIndex::from_fetch(fetched, |t| settings.closed_states.is_open(t));
        if let IndexStatus::Incomplete { reason } = index.status() {
            warn!(reason = %reason, "Duplicate index is incomplete");
        }

        machine.transition(FetchPhase::FetchingDayList)?;
        let day_query = TicketQuery::labelled(&settings.launch_label)
            .due_on(date)
            .in_state(session.state_name());
        let tickets = collect_all_pages(
            self.tracker.as_ref(),
            &api_key,
            &day_query,
            settings.page_size,
        )
        .await
        .map_err(|incomplete| incomplete.cause)?;

        let rows = self.sheets.read_rows(&settings.provider_range).await?;
        let directory = ProviderDirectory::from_rows(&rows)?.with_policy(settings.provider_policy);

        machine.transition(FetchPhase::Rendering)?;
        session.replace_issues(&tickets);
        let reports: Vec<LaunchReport> = tickets
            .iter()
            .map(|ticket| {
                let lookup = directory.lookup_title(&ticket.title);
                let provider_notice = lookup.notice();
                LaunchReport {
                    title: ticket.title.clone(),
                    ticket: ticket.to_ref(),
                    duplicates: index
                        .duplicates_of(ticket, settings.match_mode)
                        .into_iter()
                        .cloned()
                        .collect(),
                    providers: lookup.matches,
                    unmatched_tags: lookup.unmatched_tags,
                    provider_notice,
                }
            })
            .collect();

        info!(
            date = %date,
            tickets = reports.len(),
            duplicates = reports.iter().filter(|r| !r.duplicates.is_empty()).count(),
            "Fetch complete"
        );
        machine.transition(FetchPhase::Idle)?;

        Ok(FetchOutcome {
            date,
            index_status: index.status().clone(),
            reports,
            phases: machine.history().to_vec(),
        })
    }
}
