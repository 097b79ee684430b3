//! Per-session context
//!
//! Holds the current designer's tracker credentials and the issue map from the
//! most recent fetch. It is created when a session starts (from the designer's
//! saved settings row), updated by save and fetch actions, and passed
//! explicitly into every operation that needs it.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::AppError;
use crate::models::{Ticket, TicketRef, UserKey};

#[derive(Clone, Default)]
pub struct SessionContext {
    designer: String,
    tracker_key: String,
    state_name: String,
    issues: BTreeMap<String, TicketRef>,
}

impl SessionContext {
    /// Start a session from a saved settings row
    pub fn start(user: UserKey) -> Result<Self, AppError> {
        let mut session = SessionContext::default();
        session.apply(user)?;
        Ok(session)
    }

    /// Replace the credentials after a save action
    pub fn apply(&mut self, user: UserKey) -> Result<(), AppError> {
        if user.designer.is_empty() {
            return Err(AppError::MissingField("designer".to_string()));
        }
        if user.tracker_key.is_empty() {
            return Err(AppError::MissingField("tracker API key".to_string()));
        }
        if user.state_name.is_empty() {
            return Err(AppError::MissingField("tracker column / state".to_string()));
        }

        self.designer = user.designer;
        self.tracker_key = user.tracker_key;
        self.state_name = user.state_name;
        Ok(())
    }

    pub fn designer(&self) -> &str {
        &self.designer
    }

    pub fn tracker_key(&self) -> &str {
        &self.tracker_key
    }

    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    /// Replace the issue map with the tickets of the latest fetch
    pub fn replace_issues(&mut self, tickets: &[Ticket]) {
        self.issues = tickets
            .iter()
            .map(|t| (t.title.clone(), t.to_ref()))
            .collect();
    }

    pub fn issue(&self, title: &str) -> Option<&TicketRef> {
        self.issues.get(title)
    }

    pub fn issue_titles(&self) -> impl Iterator<Item = &str> {
        self.issues.keys().map(String::as_str)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("designer", &self.designer)
            .field("tracker_key", &"<redacted>")
            .field("state_name", &self.state_name)
            .field("issues", &self.issues.len())
            .finish()
    }
}
