pub mod bundle;
pub mod fetch;

pub use bundle::{BundleOutput, BundleTarget, ThumbnailBundler};
pub use fetch::{
    FetchOutcome, FetchPhase, FetchSettings, FetchStateMachine, LaunchFetcher, LaunchReport,
};
