//! Shared HTTP plumbing for the external service clients.
//!
//! One `reqwest` client per service with a bounded timeout, pluggable auth, and
//! a single place where transport failures and non-2xx responses are mapped
//! onto [`AppError`].

use std::fmt;
use std::time::Duration;

use gametools_core::{AppError, AppResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Authentication strategy for a single request.
#[derive(Clone)]
pub enum Auth {
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `Authorization: {key}` (personal API keys sent as-is)
    Raw(String),
    /// HTTP basic auth
    Basic { username: String, password: String },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => f.write_str("None"),
            Auth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Auth::Raw(_) => f.write_str("Raw(<redacted>)"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    service: &'static str,
}

impl HttpClient {
    pub fn new(service: &'static str, timeout_secs: u64) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create HTTP client for {}: {}", service, e))
            })?;

        Ok(Self { client, service })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn apply_auth(request: RequestBuilder, auth: &Auth) -> RequestBuilder {
        match auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Raw(key) => request.header(reqwest::header::AUTHORIZATION, key.as_str()),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    /// Map a transport failure: timeouts become [`AppError::Timeout`].
    pub fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::Timeout {
                service: self.service.to_string(),
            }
        } else {
            AppError::external(self.service, format!("Request failed: {}", err))
        }
    }

    /// Send with auth applied. Only transport failures are errors here;
    /// the status is left to the caller.
    pub async fn execute(&self, request: RequestBuilder, auth: &Auth) -> AppResult<Response> {
        Self::apply_auth(request, auth)
            .send()
            .await
            .map_err(|e| self.transport_error(e))
    }

    /// Send and fail on any non-2xx status, carrying the upstream body.
    pub async fn send(&self, request: RequestBuilder, auth: &Auth) -> AppResult<Response> {
        let response = self.execute(request, auth).await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::external(
                self.service,
                format!("request failed with status {}: {}", status, error_text),
            ));
        }

        Ok(response)
    }

    pub async fn parse_json<T: DeserializeOwned>(&self, response: Response) -> AppResult<T> {
        response.json().await.map_err(|e| {
            AppError::external(self.service, format!("Failed to parse response as JSON: {}", e))
        })
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        auth: &Auth,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.send(request, auth).await?;
        self.parse_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: &Auth,
        query: &[(&str, String)],
        body: &B,
    ) -> AppResult<T> {
        let request = self.client.post(url).query(query).json(body);
        let response = self.send(request, auth).await?;
        self.parse_json(response).await
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: &Auth,
        query: &[(&str, String)],
        body: &B,
    ) -> AppResult<T> {
        let request = self.client.put(url).query(query).json(body);
        let response = self.send(request, auth).await?;
        self.parse_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let auth = Auth::Basic {
            username: "api".to_string(),
            password: "secret-key".to_string(),
        };
        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("api"));
        assert!(!rendered.contains("secret-key"));
        assert!(!format!("{:?}", Auth::Raw("lin_api_123".into())).contains("lin_api_123"));
    }

    #[tokio::test]
    async fn test_raw_auth_header_is_sent_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "lin_api_123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = HttpClient::new("Tracker", 5).unwrap();
        let body: Value = client
            .get_json(
                &format!("{}/ping", server.url()),
                &Auth::Raw("lin_api_123".into()),
                &[],
            )
            .await
            .unwrap();

        assert_eq!(body["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_carries_upstream_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ping")
            .with_status(403)
            .with_body("The caller does not have permission")
            .create_async()
            .await;

        let client = HttpClient::new("Spreadsheet", 5).unwrap();
        let err = client
            .get_json::<Value>(&format!("{}/ping", server.url()), &Auth::None, &[])
            .await
            .unwrap_err();

        match err {
            AppError::ExternalService { service, message } => {
                assert_eq!(service, "Spreadsheet");
                assert!(message.contains("403"));
                assert!(message.contains("does not have permission"));
            }
            other => panic!("expected ExternalService, got {:?}", other),
        }
    }
}
