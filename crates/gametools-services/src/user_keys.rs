//! Per-designer settings rows (`designer | tracker key | state`)

use std::collections::BTreeMap;
use std::sync::Arc;

use gametools_core::{AppError, AppResult, Config, UserKey};
use tracing::info;

use crate::traits::SpreadsheetStore;

const HEADER: [&str; 3] = ["designer", "linear_key", "column"];

pub struct UserKeyStore {
    store: Arc<dyn SpreadsheetStore>,
    range: String,
}

impl UserKeyStore {
    /// `range` covers the three columns, e.g. `user_keys!A:C`
    pub fn new(store: Arc<dyn SpreadsheetStore>, range: impl Into<String>) -> Self {
        Self {
            store,
            range: range.into(),
        }
    }

    pub fn from_config(store: Arc<dyn SpreadsheetStore>, config: &Config) -> Self {
        Self::new(store, config.user_key_range.clone())
    }

    fn sheet_name(&self) -> &str {
        self.range
            .split_once('!')
            .map_or(self.range.as_str(), |(sheet, _)| sheet)
    }

    /// A1 range of the n-th data row (0-based, below the header)
    fn row_range(&self, index: usize) -> String {
        let row = index + 2;
        format!("{}!A{}:C{}", self.sheet_name(), row, row)
    }

    fn parse_row(row: &[String]) -> Option<UserKey> {
        let designer = row.first().map(|s| s.trim()).unwrap_or("");
        if designer.is_empty() {
            return None;
        }
        let field = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
        Some(UserKey::new(designer, field(1), field(2)))
    }

    /// Every saved designer, keyed by lowercased handle
    pub async fn load(&self) -> AppResult<BTreeMap<String, UserKey>> {
        let rows = self.store.read_rows(&self.range).await?;
        Ok(rows
            .iter()
            .skip(1)
            .filter_map(|row| Self::parse_row(row))
            .map(|user| (user.designer.clone(), user))
            .collect())
    }

    pub async fn get(&self, designer: &str) -> AppResult<Option<UserKey>> {
        let designer = designer.trim().to_lowercase();
        Ok(self.load().await?.remove(&designer))
    }

    /// Like [`get`](Self::get) but a missing designer is `NotFound`
    pub async fn require(&self, designer: &str) -> AppResult<UserKey> {
        self.get(designer).await?.ok_or_else(|| {
            AppError::NotFound(format!(
                "No saved settings for designer '{}'; run `account save` first",
                designer.trim()
            ))
        })
    }

    /// Insert or overwrite the designer's row. Read-modify-write, last write wins.
    pub async fn save(
        &self,
        designer: &str,
        tracker_key: &str,
        state_name: &str,
    ) -> AppResult<UserKey> {
        let user = UserKey::new(designer, tracker_key, state_name);
        if user.designer.is_empty() {
            return Err(AppError::MissingField("designer".to_string()));
        }
        if user.tracker_key.is_empty() {
            return Err(AppError::MissingField("tracker API key".to_string()));
        }
        if user.state_name.is_empty() {
            return Err(AppError::MissingField("tracker column / state".to_string()));
        }

        let rows = self.store.read_rows(&self.range).await?;
        if rows.is_empty() {
            self.store
                .append_row(&self.range, HEADER.iter().map(|h| h.to_string()).collect())
                .await?;
        }

        let existing = rows.iter().skip(1).position(|row| {
            row.first()
                .is_some_and(|name| name.trim().to_lowercase() == user.designer)
        });

        match existing {
            Some(index) => {
                let range = self.row_range(index);
                self.store.update_row(&range, user.to_row()).await?;
                info!(designer = %user.designer, range = %range, "Updated designer settings");
            }
            None => {
                self.store.append_row(&self.range, user.to_row()).await?;
                info!(designer = %user.designer, "Added designer settings");
            }
        }

        Ok(user)
    }
}
