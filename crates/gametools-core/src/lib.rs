//! Game Tools Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! session context shared by the processing, services and CLI crates.

pub mod config;
pub mod error;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use config::{Config, DuplicateMatchSetting, ProviderMatchPolicy, SheetsCredentials};
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use models::{
    AssetRole, BundleProfile, ProviderRecord, RoleSpec, Ticket, TicketRef, UploadedFile, UserKey,
};
pub use session::SessionContext;
