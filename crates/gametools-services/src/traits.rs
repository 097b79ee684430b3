//! Seams to the external collaborators.
//!
//! Workflows only see these traits; the HTTP clients implement them and tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDate;
use gametools_core::{AppResult, Ticket};
use serde::Serialize;

/// Row-oriented access to a spreadsheet.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    /// All rows in `range` (A1 notation). Ragged rows are returned as-is.
    async fn read_rows(&self, range: &str) -> AppResult<Vec<Vec<String>>>;

    /// Append one row after the last populated row of `range`.
    async fn append_row(&self, range: &str, row: Vec<String>) -> AppResult<()>;

    /// Overwrite the cells of `range` with one row.
    async fn update_row(&self, range: &str, row: Vec<String>) -> AppResult<()>;
}

/// Issue filter supported by the tracker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketQuery {
    pub due_date: Option<NaiveDate>,
    pub label: Option<String>,
    /// Workflow state name must equal this
    pub state: Option<String>,
    /// Workflow state name must not be any of these
    pub excluded_states: Vec<String>,
}

impl TicketQuery {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn in_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Cursor-paginated issue search.
///
/// The caller's API key travels with every call; one client serves every
/// session.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn fetch_page(
        &self,
        api_key: &str,
        query: &TicketQuery,
        first: u32,
        after: Option<&str>,
    ) -> AppResult<TicketPage>;
}
