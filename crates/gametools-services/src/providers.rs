//! Provider directory
//!
//! Loads distribution-platform login details from spreadsheet rows and
//! matches the provider tags at the end of a ticket title against them.

use std::collections::HashMap;

use gametools_core::{AppError, AppResult, ProviderMatchPolicy, ProviderRecord};
use serde::Serialize;
use tracing::{debug, warn};

const COL_NAME: &str = "provider name";
const COL_URL: &str = "url";
const COL_USERNAME: &str = "username";
const COL_PASSWORD: &str = "password";
const COL_ALIASES: &str = "aliases";

/// Separator between game name and provider tags in a ticket title
const TITLE_SEPARATOR: &str = " - ";
const TAG_SEPARATOR: char = '/';

#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    records: Vec<ProviderRecord>,
    policy: ProviderMatchPolicy,
}

/// Result of matching every tag of one title
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderLookup {
    /// Matched providers, most specific tag first, each at most once
    pub matches: Vec<ProviderRecord>,
    /// Tags in title order
    pub tags: Vec<String>,
    pub unmatched_tags: Vec<String>,
}

impl ProviderLookup {
    /// Warning shown when no tag matched; lookups degrade rather than fail
    pub fn notice(&self) -> Option<String> {
        if !self.matches.is_empty() {
            return None;
        }
        Some(format!(
            "No provider info found for: {}",
            self.unmatched_tags.join(", ")
        ))
    }

    /// The notice as a non-fatal [`AppError::NotFound`]
    pub fn not_found(&self) -> Option<AppError> {
        self.notice().map(AppError::NotFound)
    }
}

fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| row.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// `needle` occurs in `haystack` with no alphanumeric character on either side
fn contains_at_boundary(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl ProviderDirectory {
    pub fn new(records: Vec<ProviderRecord>) -> Self {
        let mut directory = Self::default();
        for record in records {
            directory.upsert(record);
        }
        directory
    }

    pub fn with_policy(mut self, policy: ProviderMatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Last write wins; a replaced record keeps its original position
    fn upsert(&mut self, record: ProviderRecord) {
        match self.records.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => {
                debug!(provider = %record.key, "Duplicate provider row, keeping the later one");
                *existing = record;
            }
            None => self.records.push(record),
        }
    }

    /// Parse sheet rows; the first row is the header.
    pub fn from_rows(rows: &[Vec<String>]) -> AppResult<Self> {
        let Some((header, data)) = rows.split_first() else {
            warn!("Provider sheet is empty");
            return Ok(Self::default());
        };

        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let required = |name: &str| {
            columns.get(name).copied().ok_or_else(|| {
                AppError::InvalidSheet(format!("Provider sheet has no '{}' column", name))
            })
        };

        let i_name = required(COL_NAME)?;
        let i_url = required(COL_URL)?;
        let i_user = required(COL_USERNAME)?;
        let i_pass = required(COL_PASSWORD)?;
        let i_aliases = columns.get(COL_ALIASES).copied();

        let mut directory = Self::default();
        for row in data {
            let name = cell(row, Some(i_name));
            if name.is_empty() {
                continue;
            }

            let mut record = ProviderRecord::new(name)
                .with_aliases(cell(row, i_aliases).split(','));
            record.url = cell(row, Some(i_url)).to_string();
            record.username = cell(row, Some(i_user)).to_string();
            record.password = cell(row, Some(i_pass)).to_string();
            directory.upsert(record);
        }

        debug!(providers = directory.len(), "Loaded provider directory");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ProviderRecord] {
        &self.records
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        match self.policy {
            ProviderMatchPolicy::Anywhere => haystack.contains(needle),
            ProviderMatchPolicy::WordBoundary => contains_at_boundary(haystack, needle),
        }
    }

    /// Match one provider tag: exact key, then alias, then substring.
    pub fn find(&self, fragment: &str) -> Option<&ProviderRecord> {
        let fragment = fragment.trim().to_lowercase();
        if fragment.is_empty() {
            return None;
        }

        if let Some(record) = self.records.iter().find(|r| r.key == fragment) {
            return Some(record);
        }
        if let Some(record) = self.records.iter().find(|r| r.aliases.contains(&fragment)) {
            return Some(record);
        }

        // Longest contained term wins; ties keep directory order.
        let mut best: Option<(&ProviderRecord, usize)> = None;
        for record in &self.records {
            for name in record.names() {
                let matched = if self.contains(name, &fragment) {
                    fragment.len()
                } else if self.contains(&fragment, name) {
                    name.len()
                } else {
                    continue;
                };
                if best.map_or(true, |(_, len)| matched > len) {
                    best = Some((record, matched));
                }
            }
        }

        best.map(|(record, _)| record)
    }

    /// Match every `/`-separated tag after the last ` - ` of a title,
    /// rightmost (most specific) first.
    pub fn lookup_title(&self, title: &str) -> ProviderLookup {
        let tag_part = title
            .rsplit_once(TITLE_SEPARATOR)
            .map_or(title, |(_, tags)| tags);
        let tags: Vec<String> = tag_part
            .split(TAG_SEPARATOR)
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut lookup = ProviderLookup {
            tags: tags.clone(),
            ..ProviderLookup::default()
        };
        for tag in tags.iter().rev() {
            match self.find(tag) {
                Some(record) => {
                    if !lookup.matches.iter().any(|m| m.key == record.key) {
                        lookup.matches.push(record.clone());
                    }
                }
                None => lookup.unmatched_tags.insert(0, tag.clone()),
            }
        }

        if lookup.matches.is_empty() {
            warn!(title = %title, tags = ?lookup.tags, "No provider matched");
        }
        lookup
    }
}

/// First provider matching any tag of `title`
pub fn find_provider(providers: &[ProviderRecord], title: &str) -> Option<ProviderRecord> {
    ProviderDirectory::new(providers.to_vec())
        .lookup_title(title)
        .matches
        .into_iter()
        .next()
}
