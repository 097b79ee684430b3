//! In-memory collaborators for workflow tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use gametools_core::{AppError, AppResult, Ticket};

use crate::traits::{IssueTracker, SpreadsheetStore, TicketPage, TicketQuery};

/// Sheet contents keyed by the exact range string, with writes recorded
#[derive(Default)]
pub struct MemorySheet {
    pub rows: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    pub updates: Mutex<Vec<(String, Vec<String>)>>,
    pub appends: Mutex<Vec<(String, Vec<String>)>>,
    pub fail_reads: Mutex<bool>,
}

impl MemorySheet {
    pub fn with_rows(range: &str, rows: &[&[&str]]) -> Self {
        let sheet = MemorySheet::default();
        sheet.insert(range, rows);
        sheet
    }

    pub fn insert(&self, range: &str, rows: &[&[&str]]) {
        self.rows.lock().unwrap().insert(
            range.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
    }
}

#[async_trait]
impl SpreadsheetStore for MemorySheet {
    async fn read_rows(&self, range: &str) -> AppResult<Vec<Vec<String>>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(AppError::external("Google Sheets", "quota exceeded"));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(range)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> AppResult<()> {
        self.appends
            .lock()
            .unwrap()
            .push((range.to_string(), row.clone()));
        self.rows
            .lock()
            .unwrap()
            .entry(range.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn update_row(&self, range: &str, row: Vec<String>) -> AppResult<()> {
        self.updates
            .lock()
            .unwrap()
            .push((range.to_string(), row));
        Ok(())
    }
}

pub fn ticket(id: &str, title: &str, state: &str, due: Option<NaiveDate>) -> Ticket {
    Ticket {
        id: id.to_string(),
        identifier: format!("GL-{}", id),
        title: title.to_string(),
        url: format!("https://linear.app/issue/{}", id),
        due_date: due,
        state: state.to_string(),
    }
}

/// Tracker that applies the query filter to a fixed ticket list and pages it
#[derive(Default)]
pub struct MemoryTracker {
    pub tickets: Vec<Ticket>,
    /// Fail any query with a due date (the day list)
    pub fail_day_list: bool,
    /// Fail the n-th page request (0-based) of queries without a due date
    pub fail_index_page: Option<usize>,
    pub requests: Mutex<Vec<(TicketQuery, Option<String>)>>,
}

impl MemoryTracker {
    pub fn new(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets,
            ..Self::default()
        }
    }

    fn matches(query: &TicketQuery, ticket: &Ticket) -> bool {
        query.due_date.map_or(true, |d| ticket.due_date == Some(d))
            && query.state.as_ref().map_or(true, |s| &ticket.state == s)
            && !query.excluded_states.contains(&ticket.state)
    }
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    async fn fetch_page(
        &self,
        _api_key: &str,
        query: &TicketQuery,
        first: u32,
        after: Option<&str>,
    ) -> AppResult<TicketPage> {
        let page_number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((query.clone(), after.map(str::to_string)));
            requests
                .iter()
                .filter(|(q, _)| q.due_date.is_none())
                .count()
                .saturating_sub(1)
        };

        if query.due_date.is_some() && self.fail_day_list {
            return Err(AppError::external("Linear", "day list unavailable"));
        }
        if query.due_date.is_none() && self.fail_index_page == Some(page_number) {
            return Err(AppError::Timeout {
                service: "Linear".to_string(),
            });
        }

        let start: usize = after.and_then(|c| c.parse().ok()).unwrap_or(0);
        let matching: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| Self::matches(query, t))
            .cloned()
            .collect();
        let end = (start + first as usize).min(matching.len());
        let has_next_page = end < matching.len();

        Ok(TicketPage {
            tickets: matching[start.min(end)..end].to_vec(),
            has_next_page,
            end_cursor: has_next_page.then(|| end.to_string()),
        })
    }
}
