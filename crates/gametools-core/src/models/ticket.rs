use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tracker issue. Titles follow `<game name> - <provider tag(s)>` with tags
/// separated by `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    /// Human-readable key such as `GL-123`
    pub identifier: String,
    pub title: String,
    pub url: String,
    pub due_date: Option<NaiveDate>,
    pub state: String,
}

impl Ticket {
    pub fn to_ref(&self) -> TicketRef {
        TicketRef {
            id: self.id.clone(),
            identifier: self.identifier.clone(),
            url: self.url.clone(),
        }
    }
}

/// Minimal pointer to a ticket, used in duplicate buckets and the session issue map
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketRef {
    pub id: String,
    pub identifier: String,
    pub url: String,
}
