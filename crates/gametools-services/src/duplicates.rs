//! Duplicate ticket detection
//!
//! Open tickets are grouped by their clean base title. A ticket is flagged
//! when another open ticket (different id) lands on the same or a similar key.

use std::collections::BTreeMap;

use gametools_core::{AppError, Config, DuplicateMatchSetting, Ticket, TicketRef};
use serde::Serialize;
use tracing::{debug, warn};

use crate::traits::{IssueTracker, TicketQuery};

/// Text before the first ` - `, trimmed
pub fn base_title(title: &str) -> &str {
    title
        .split_once(" - ")
        .map_or(title, |(base, _)| base)
        .trim()
}

/// Base title lowercased with everything but letters and digits removed
pub fn clean_title(title: &str) -> String {
    base_title(title)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Workflow states treated as closed, matched as lowercase substrings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedStates {
    keywords: Vec<String>,
}

impl Default for ClosedStates {
    fn default() -> Self {
        Self::new(["done", "closed", "canceled", "cancelled", "archived", "duplicate"])
    }
}

impl ClosedStates {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.closed_state_keywords)
    }

    pub fn is_closed(&self, state: &str) -> bool {
        let state = state.to_lowercase();
        self.keywords.iter().any(|k| state.contains(k.as_str()))
    }

    pub fn is_open(&self, ticket: &Ticket) -> bool {
        !self.is_closed(&ticket.state)
    }
}

/// How clean titles are compared
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMode {
    /// Same clean title
    Exact,
    /// One clean title contains the other
    Substring,
    /// Normalised Levenshtein similarity at or above `threshold`
    Fuzzy { threshold: f64 },
}

impl MatchMode {
    pub fn from_setting(setting: DuplicateMatchSetting, threshold: f64) -> Self {
        match setting {
            DuplicateMatchSetting::Exact => MatchMode::Exact,
            DuplicateMatchSetting::Substring => MatchMode::Substring,
            DuplicateMatchSetting::Fuzzy => MatchMode::Fuzzy { threshold },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_setting(
            config.duplicate_match_mode,
            config.duplicate_similarity_threshold,
        )
    }

    fn matches(self, candidate: &str, key: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == key,
            MatchMode::Substring => candidate.contains(key) || key.contains(candidate),
            MatchMode::Fuzzy { threshold } => {
                strsim::normalized_levenshtein(candidate, key) >= threshold
            }
        }
    }
}

/// Whether every page of tickets made it into the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IndexStatus {
    Complete,
    Incomplete { reason: String },
}

/// Pagination stopped early. Holds what was fetched before the failure.
#[derive(Debug, thiserror::Error)]
#[error("ticket fetch stopped after {pages_fetched} page(s): {cause}")]
pub struct IncompleteFetch {
    #[source]
    pub cause: AppError,
    pub partial: Vec<Ticket>,
    pub pages_fetched: usize,
}

/// Follow the tracker's cursor until `has_next_page` is false.
pub async fn collect_all_pages(
    tracker: &dyn IssueTracker,
    api_key: &str,
    query: &TicketQuery,
    page_size: u32,
) -> Result<Vec<Ticket>, IncompleteFetch> {
    let mut tickets = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0;

    loop {
        let page = match tracker
            .fetch_page(api_key, query, page_size, cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(cause) => {
                warn!(pages_fetched, error = %cause, "Ticket pagination failed");
                return Err(IncompleteFetch {
                    cause,
                    partial: tickets,
                    pages_fetched,
                });
            }
        };
        pages_fetched += 1;
        tickets.extend(page.tickets);
        debug!(page = pages_fetched, total = tickets.len(), "Fetched ticket page");

        if !page.has_next_page {
            return Ok(tickets);
        }

        match page.end_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => {
                return Err(IncompleteFetch {
                    cause: AppError::external(
                        "Issue tracker",
                        "page reported more results without a new cursor",
                    ),
                    partial: tickets,
                    pages_fetched,
                });
            }
        }
    }
}

/// Open tickets grouped by clean base title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIndex {
    buckets: BTreeMap<String, Vec<TicketRef>>,
    status: IndexStatus,
}

impl DuplicateIndex {
    pub fn build<F>(tickets: &[Ticket], is_open: F) -> Self
    where
        F: Fn(&Ticket) -> bool,
    {
        let mut buckets: BTreeMap<String, Vec<TicketRef>> = BTreeMap::new();
        for ticket in tickets.iter().filter(|t| is_open(t)) {
            let key = clean_title(&ticket.title);
            if key.is_empty() {
                continue;
            }
            let bucket = buckets.entry(key).or_default();
            if !bucket.iter().any(|r| r.id == ticket.id) {
                bucket.push(ticket.to_ref());
            }
        }

        Self {
            buckets,
            status: IndexStatus::Complete,
        }
    }

    /// Index whatever a paginated fetch returned, marking partial results
    pub fn from_fetch<F>(fetched: Result<Vec<Ticket>, IncompleteFetch>, is_open: F) -> Self
    where
        F: Fn(&Ticket) -> bool,
    {
        match fetched {
            Ok(tickets) => Self::build(&tickets, is_open),
            Err(incomplete) => {
                let mut index = Self::build(&incomplete.partial, is_open);
                index.status = IndexStatus::Incomplete {
                    reason: incomplete.to_string(),
                };
                index
            }
        }
    }

    pub fn status(&self) -> &IndexStatus {
        &self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == IndexStatus::Complete
    }

    pub fn bucket(&self, clean_key: &str) -> Option<&[TicketRef]> {
        self.buckets.get(clean_key).map(Vec::as_slice)
    }

    /// Buckets holding two or more tickets
    pub fn duplicate_groups(&self) -> impl Iterator<Item = (&str, &[TicketRef])> {
        self.buckets
            .iter()
            .filter(|(_, refs)| refs.len() > 1)
            .map(|(key, refs)| (key.as_str(), refs.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Other tickets that look like the same game, never the ticket itself
    pub fn duplicates_of(&self, ticket: &Ticket, mode: MatchMode) -> Vec<&TicketRef> {
        let key = clean_title(&ticket.title);
        if key.is_empty() {
            return Vec::new();
        }

        let mut found: Vec<&TicketRef> = Vec::new();
        let candidates: Vec<(&String, &Vec<TicketRef>)> = match mode {
            MatchMode::Exact => self.buckets.get_key_value(&key).into_iter().collect(),
            _ => self.buckets.iter().collect(),
        };

        for (candidate, refs) in candidates {
            if !mode.matches(candidate, &key) {
                continue;
            }
            for r in refs {
                if r.id != ticket.id && !found.iter().any(|f| f.id == r.id) {
                    found.push(r);
                }
            }
        }
        found
    }
}
