use std::fmt;

/// One row of the per-user settings table: `designer | tracker key | state`
#[derive(Clone, PartialEq, Eq)]
pub struct UserKey {
    /// Lowercased designer handle
    pub designer: String,
    pub tracker_key: String,
    /// Tracker column / workflow state the designer works from
    pub state_name: String,
}

impl UserKey {
    pub fn new(designer: &str, tracker_key: &str, state_name: &str) -> Self {
        Self {
            designer: designer.trim().to_lowercase(),
            tracker_key: tracker_key.trim().to_string(),
            state_name: state_name.trim().to_string(),
        }
    }

    /// Row layout written back to the sheet
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.designer.clone(),
            self.tracker_key.clone(),
            self.state_name.clone(),
        ]
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKey")
            .field("designer", &self.designer)
            .field("tracker_key", &"<redacted>")
            .field("state_name", &self.state_name)
            .finish()
    }
}
