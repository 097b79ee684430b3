//! Domain models
//!
//! All entities are request-scoped: built on each user action and dropped when
//! the action completes. Durable data lives in the spreadsheet and tracker.

pub mod asset;
pub mod provider;
pub mod ticket;
pub mod user_key;

pub use asset::{AssetRole, BundleProfile, RoleSpec, UploadedFile};
pub use provider::ProviderRecord;
pub use ticket::{Ticket, TicketRef};
pub use user_key::UserKey;
