//! Game Tools Services
//!
//! Clients for the compression, spreadsheet and issue-tracker services, the
//! provider and duplicate matchers that work on their data, and the
//! user-facing workflows (fetch launches, save settings, build bundles).

pub mod clients;
pub mod duplicates;
pub mod providers;
pub mod traits;
pub mod user_keys;
pub mod workflows;

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used types
pub use clients::{LinearClient, SheetsClient, TinifyClient};
pub use duplicates::{
    base_title, clean_title, collect_all_pages, ClosedStates, DuplicateIndex, IncompleteFetch,
    IndexStatus, MatchMode,
};
pub use providers::{find_provider, ProviderDirectory, ProviderLookup};
pub use traits::{IssueTracker, SpreadsheetStore, TicketPage, TicketQuery};
pub use user_keys::UserKeyStore;
pub use workflows::{
    BundleOutput, BundleTarget, FetchOutcome, FetchPhase, FetchSettings, FetchStateMachine,
    LaunchFetcher, LaunchReport, ThumbnailBundler,
};
