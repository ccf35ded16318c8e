//! HTTP access to the Canvas REST API.
//!
//! The aggregator only needs one primitive, "GET this URL and give me the
//! JSON body plus the `link` header", which is the [`Transport`] trait.
//! [`HttpTransport`] implements it with reqwest.

use crate::error::{redact_token, CanvasError, Result};
use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A decoded API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub body: Value,
    /// Raw `link` response header, used for pagination.
    pub link: Option<String>,
}

impl ApiResponse {
    pub fn new(body: Value) -> Self {
        Self { body, link: None }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Decode the body into `T`, reporting shape mismatches as parse errors.
    pub fn decode<T: DeserializeOwned>(&self, resource: &'static str, url: &str) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|e| CanvasError::parse(resource, url, e.to_string()))
    }
}

/// The HTTP request primitive the aggregator depends on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request against a fully built URL.
    ///
    /// Errors are reported with a generic resource label; callers re-label
    /// them with [`CanvasError::with_resource`].
    async fn get(&self, url: &str) -> Result<ApiResponse>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("canvas-tasks/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CanvasError::transport("client setup", "", None, e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<ApiResponse> {
        debug!("GET {}", redact_token(url));

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CanvasError::transport("request", url, None, e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CanvasError::transport(
                "request",
                url,
                Some(status.as_u16()),
                format!("server returned {}", status),
            ));
        }

        let link = resp
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let text = resp
            .text()
            .await
            .map_err(|e| CanvasError::transport("request", url, None, e.without_url().to_string()))?;

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| CanvasError::parse("request", url, format!("invalid JSON: {}", e)))?;

        let response = ApiResponse::new(body);
        Ok(match link {
            Some(link) => response.with_link(link),
            None => response,
        })
    }
}
