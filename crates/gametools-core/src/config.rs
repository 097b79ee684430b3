//! Configuration module
//!
//! Settings for the external collaborators (compression service, spreadsheet
//! service, issue tracker) and for the matching and bundling rules. Values are
//! read from the environment after loading an optional `.env` file.

use std::env;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::BundleProfile;

// Common constants
const HTTP_TIMEOUT_SECS: u64 = 30;
const TRACKER_PAGE_SIZE: u32 = 50;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const DUPLICATE_SIMILARITY_THRESHOLD: f64 = 0.80;

const TINIFY_API_URL: &str = "https://api.tinify.com";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
const LINEAR_API_URL: &str = "https://api.linear.app/graphql";
const LINEAR_ISSUE_URL_BASE: &str = "https://linear.app/issue";

/// How duplicate tickets are recognised from their clean base titles
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DuplicateMatchSetting {
    Exact,
    Substring,
    Fuzzy,
}

impl FromStr for DuplicateMatchSetting {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(DuplicateMatchSetting::Exact),
            "substring" => Ok(DuplicateMatchSetting::Substring),
            "fuzzy" => Ok(DuplicateMatchSetting::Fuzzy),
            other => Err(AppError::Config(format!(
                "Unsupported duplicate match mode: {}",
                other
            ))),
        }
    }
}

/// Substring matching rule for provider tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderMatchPolicy {
    /// Contained text must start and end on a non-alphanumeric boundary
    #[default]
    WordBoundary,
    /// Raw containment in either direction
    Anywhere,
}

impl FromStr for ProviderMatchPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "word-boundary" | "word_boundary" | "boundary" => Ok(ProviderMatchPolicy::WordBoundary),
            "anywhere" => Ok(ProviderMatchPolicy::Anywhere),
            other => Err(AppError::Config(format!(
                "Unsupported provider match policy: {}",
                other
            ))),
        }
    }
}

/// Credentials for the spreadsheet service
#[derive(Clone)]
pub enum SheetsCredentials {
    /// Base64-encoded service account JSON
    ServiceAccountB64(String),
    /// Pre-issued OAuth access token
    AccessToken(String),
}

impl std::fmt::Debug for SheetsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsCredentials::ServiceAccountB64(_) => f.write_str("ServiceAccountB64(<redacted>)"),
            SheetsCredentials::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub http_timeout_secs: u64,
    // Image compression service
    pub tinify_api_key: Option<String>,
    pub tinify_api_url: String,
    // Spreadsheet service
    pub sheets_credentials: Option<SheetsCredentials>,
    pub sheets_api_url: String,
    pub sheet_id: String,
    pub provider_range: String,
    pub user_key_range: String,
    pub provider_match_policy: ProviderMatchPolicy,
    // Issue tracker
    pub linear_api_url: String,
    pub linear_issue_url_base: String,
    pub launch_label: String,
    pub closed_state_keywords: Vec<String>,
    pub tracker_page_size: u32,
    pub duplicate_match_mode: DuplicateMatchSetting,
    pub duplicate_similarity_threshold: f64,
    // Uploads and bundling
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub bundle_profile: BundleProfile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            tinify_api_key: None,
            tinify_api_url: TINIFY_API_URL.to_string(),
            sheets_credentials: None,
            sheets_api_url: SHEETS_API_URL.to_string(),
            sheet_id: String::new(),
            provider_range: "Sheet1!A:Z".to_string(),
            user_key_range: "user_keys!A:C".to_string(),
            provider_match_policy: ProviderMatchPolicy::default(),
            linear_api_url: LINEAR_API_URL.to_string(),
            linear_issue_url_base: LINEAR_ISSUE_URL_BASE.to_string(),
            launch_label: "Game Launch".to_string(),
            closed_state_keywords: default_closed_state_keywords(),
            tracker_page_size: TRACKER_PAGE_SIZE,
            duplicate_match_mode: DuplicateMatchSetting::Exact,
            duplicate_similarity_threshold: DUPLICATE_SIMILARITY_THRESHOLD,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            allowed_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            bundle_profile: BundleProfile::standard(),
        }
    }
}

fn default_closed_state_keywords() -> Vec<String> {
    ["done", "closed", "canceled", "cancelled", "archived", "duplicate"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let sheets_credentials = non_empty_var("GC_SERVICE_KEY_B64")
            .map(SheetsCredentials::ServiceAccountB64)
            .or_else(|| non_empty_var("GOOGLE_ACCESS_TOKEN").map(SheetsCredentials::AccessToken));

        let bundle_profile = match non_empty_var("BUNDLE_PROFILE") {
            Some(name) => name.parse()?,
            None => defaults.bundle_profile.clone(),
        };

        let config = Config {
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(HTTP_TIMEOUT_SECS),
            tinify_api_key: non_empty_var("TINIFY_API_KEY"),
            tinify_api_url: env::var("TINIFY_API_URL").unwrap_or(defaults.tinify_api_url),
            sheets_credentials,
            sheets_api_url: env::var("SHEETS_API_URL").unwrap_or(defaults.sheets_api_url),
            sheet_id: env::var("SHEET_ID").unwrap_or_default(),
            provider_range: env::var("PROVIDER_RANGE").unwrap_or(defaults.provider_range),
            user_key_range: env::var("USER_KEY_RANGE").unwrap_or(defaults.user_key_range),
            provider_match_policy: match non_empty_var("PROVIDER_MATCH_POLICY") {
                Some(policy) => policy.parse()?,
                None => defaults.provider_match_policy,
            },
            linear_api_url: env::var("LINEAR_API_URL").unwrap_or(defaults.linear_api_url),
            linear_issue_url_base: env::var("LINEAR_ISSUE_URL_BASE")
                .unwrap_or(defaults.linear_issue_url_base),
            launch_label: env::var("LAUNCH_LABEL").unwrap_or(defaults.launch_label),
            closed_state_keywords: non_empty_var("CLOSED_STATE_KEYWORDS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.closed_state_keywords),
            tracker_page_size: env::var("TRACKER_PAGE_SIZE")
                .unwrap_or_else(|_| TRACKER_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(TRACKER_PAGE_SIZE),
            duplicate_match_mode: match non_empty_var("DUPLICATE_MATCH_MODE") {
                Some(mode) => mode.parse()?,
                None => defaults.duplicate_match_mode,
            },
            duplicate_similarity_threshold: env::var("DUPLICATE_SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| DUPLICATE_SIMILARITY_THRESHOLD.to_string())
                .parse()
                .unwrap_or(DUPLICATE_SIMILARITY_THRESHOLD),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_UPLOAD_SIZE_MB)
                * 1024
                * 1024,
            allowed_extensions: non_empty_var("ALLOWED_EXTENSIONS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_extensions),
            bundle_profile,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.http_timeout_secs == 0 {
            return Err(AppError::Config(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.duplicate_similarity_threshold) {
            return Err(AppError::Config(
                "DUPLICATE_SIMILARITY_THRESHOLD must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.tracker_page_size == 0 || self.tracker_page_size > 250 {
            return Err(AppError::Config(
                "TRACKER_PAGE_SIZE must be between 1 and 250".to_string(),
            ));
        }

        if self.allowed_extensions.is_empty() {
            return Err(AppError::Config(
                "ALLOWED_EXTENSIONS must list at least one extension".to_string(),
            ));
        }

        if self.sheets_credentials.is_some() && self.sheet_id.trim().is_empty() {
            return Err(AppError::Config(
                "SHEET_ID must be set when spreadsheet credentials are configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Compression is only available when an API key is configured
    pub fn require_tinify_key(&self) -> Result<&str, AppError> {
        self.tinify_api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("TINIFY_API_KEY must be set".to_string()))
    }

    pub fn require_sheets_credentials(&self) -> Result<&SheetsCredentials, AppError> {
        self.sheets_credentials.as_ref().ok_or_else(|| {
            AppError::Config(
                "GC_SERVICE_KEY_B64 or GOOGLE_ACCESS_TOKEN must be set".to_string(),
            )
        })
    }
}
