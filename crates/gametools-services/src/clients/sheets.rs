//! Google Sheets v4 client
//!
//! Implements [`SpreadsheetStore`] over the `values` REST endpoints. Access
//! is either a pre-issued bearer token or a service account, in which case a
//! signed JWT is exchanged for an access token that is cached until shortly
//! before it expires.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use gametools_core::{AppError, AppResult, Config, SheetsCredentials};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::http::{Auth, HttpClient};
use crate::traits::SpreadsheetStore;

const SERVICE: &str = "Google Sheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Tokens are refreshed this long before their stated expiry
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The parts of a service-account key file we use
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Decode the base64-encoded JSON key file
    pub fn from_base64(encoded: &str) -> AppResult<Self> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Config(format!("Service account key is not base64: {}", e)))?;
        serde_json::from_slice(&raw)
            .map_err(|e| AppError::Config(format!("Service account key is not valid JSON: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

enum TokenSource {
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct SheetsClient {
    http: HttpClient,
    base_url: String,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = match &self.tokens {
            TokenSource::Static(_) => "static-token",
            TokenSource::ServiceAccount { .. } => "service-account",
        };
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("auth", &auth)
            .finish()
    }
}

impl SheetsClient {
    pub fn new(
        base_url: &str,
        spreadsheet_id: &str,
        credentials: &SheetsCredentials,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let tokens = match credentials {
            SheetsCredentials::AccessToken(token) => TokenSource::Static(token.clone()),
            SheetsCredentials::ServiceAccountB64(encoded) => TokenSource::ServiceAccount {
                key: ServiceAccountKey::from_base64(encoded)?,
                cached: Mutex::new(None),
            },
        };

        Ok(Self {
            http: HttpClient::new(SERVICE, timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        if config.sheet_id.trim().is_empty() {
            return Err(AppError::Config("SHEET_ID must be set".to_string()));
        }
        Self::new(
            &config.sheets_api_url,
            &config.sheet_id,
            config.require_sheets_credentials()?,
            config.http_timeout_secs,
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    async fn auth(&self) -> AppResult<Auth> {
        match &self.tokens {
            TokenSource::Static(token) => Ok(Auth::Bearer(token.clone())),
            TokenSource::ServiceAccount { key, cached } => {
                let mut cached = cached.lock().await;
                if let Some(token) = cached.as_ref() {
                    if token.expires_at > Utc::now() {
                        return Ok(Auth::Bearer(token.token.clone()));
                    }
                }

                let fresh = self.exchange_assertion(key).await?;
                let bearer = Auth::Bearer(fresh.token.clone());
                *cached = Some(fresh);
                Ok(bearer)
            }
        }
    }

    /// Sign an RS256 assertion and trade it for an access token
    async fn exchange_assertion(&self, key: &ServiceAccountKey) -> AppResult<CachedToken> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::Config(format!("Invalid service account private key: {}", e)))?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token assertion: {}", e)))?;

        let request = self
            .http
            .inner()
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_GRANT_TYPE), ("assertion", assertion.as_str())]);
        let response = self.http.send(request, &Auth::None).await?;
        let token: TokenResponse = self.http.parse_json(response).await?;

        info!(
            client_email = %key.client_email,
            expires_in = token.expires_in,
            "Obtained spreadsheet access token"
        );
        let lifetime = (token.expires_in - TOKEN_REFRESH_MARGIN_SECS).max(0);
        Ok(CachedToken {
            token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl SpreadsheetStore for SheetsClient {
    async fn read_rows(&self, range: &str) -> AppResult<Vec<Vec<String>>> {
        let auth = self.auth().await?;
        let body: ValueRange = self
            .http
            .get_json(&self.values_url(range), &auth, &[])
            .await?;

        debug!(range = %range, rows = body.values.len(), "Read sheet rows");
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> AppResult<()> {
        let auth = self.auth().await?;
        let url = format!("{}:append", self.values_url(range));
        let _: Value = self
            .http
            .post_json(
                &url,
                &auth,
                &[("valueInputOption", "RAW".to_string())],
                &json!({ "values": [row] }),
            )
            .await?;

        debug!(range = %range, "Appended sheet row");
        Ok(())
    }

    async fn update_row(&self, range: &str, row: Vec<String>) -> AppResult<()> {
        let auth = self.auth().await?;
        let _: Value = self
            .http
            .put_json(
                &self.values_url(range),
                &auth,
                &[("valueInputOption", "RAW".to_string())],
                &json!({ "range": range, "values": [row] }),
            )
            .await?;

        debug!(range = %range, "Updated sheet row");
        Ok(())
    }
}
