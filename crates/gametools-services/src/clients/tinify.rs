//! Tinify (TinyPNG / TinyJPG) compression client

use async_trait::async_trait;
use bytes::Bytes;
use gametools_core::{AppError, AppResult, Config};
use gametools_processing::ImageCompressor;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};

use super::http::{Auth, HttpClient};

const SERVICE: &str = "Tinify";

#[derive(Debug, Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Debug, Deserialize)]
struct ShrinkOutput {
    size: Option<u64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TinifyErrorBody {
    error: String,
    message: String,
}

pub struct TinifyClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for TinifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TinifyClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl TinifyClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> AppResult<Self> {
        Ok(Self {
            http: HttpClient::new(SERVICE, timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            &config.tinify_api_url,
            config.require_tinify_key()?,
            config.http_timeout_secs,
        )
    }

    fn auth(&self) -> Auth {
        Auth::Basic {
            username: "api".to_string(),
            password: self.api_key.clone(),
        }
    }

    /// Turn an error response into `CompressionFailed` with the provider message
    async fn failure(response: reqwest::Response) -> AppError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<TinifyErrorBody>(&text) {
            Ok(body) => format!("{} ({})", body.message, body.error),
            Err(_) if text.is_empty() => format!("status {}", status),
            Err(_) => format!("status {}: {}", status, text),
        };
        warn!(status = %status, message = %message, "Compression request rejected");
        AppError::CompressionFailed(message)
    }
}

#[async_trait]
impl ImageCompressor for TinifyClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn compress(&self, data: Bytes) -> AppResult<Bytes> {
        let input_size = data.len();
        let auth = self.auth();
        let request = self
            .http
            .inner()
            .post(format!("{}/shrink", self.base_url))
            .body(data);

        let response = self.http.execute(request, &auth).await?;
        if response.status() != StatusCode::CREATED {
            return Err(Self::failure(response).await);
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body: ShrinkResponse = self.http.parse_json(response).await?;

        let output_url = location.or(body.output.url).ok_or_else(|| {
            AppError::CompressionFailed("Response carried no output location".to_string())
        })?;
        debug!(
            input_size,
            output_size = body.output.size,
            "Image shrunk, downloading output"
        );

        let download = self.http.inner().get(&output_url);
        let response = self.http.execute(download, &auth).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::CompressionFailed(format!("Failed to read output: {}", e)))
    }
}
