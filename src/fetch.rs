//! fetch.rs — HTTP calls bounded by a hard wall-clock deadline.
//!
//! The deadline covers the whole exchange (connect, headers and body). When it
//! elapses the in-flight request future is dropped, which aborts the underlying
//! connection. No retries happen here; callers decide what a failure means.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Deadline applied when a request does not set its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub json_body: Option<Value>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            json_body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// POST with a JSON body (`Content-Type: application/json`).
    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            json_body: Some(body),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Successful (2xx) response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {} ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("HTTP error {code}{}", detail_suffix(.detail))]
    HttpStatus { code: u16, detail: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response payload: {0}")]
    Decode(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

/// Transport seam used by the widgets.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// Failure body returned by the bot backend: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed [`HttpFetch`] enforcing the per-request deadline.
#[derive(Clone, Default)]
pub struct TimeBoundedFetch {
    client: reqwest::Client,
}

impl TimeBoundedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, req: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let builder = match req.method {
            Method::Get => self.client.get(&req.url),
            Method::Post => self.client.post(&req.url),
        };
        let builder = match &req.json_body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|e| !e.trim().is_empty());
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
                detail,
            });
        }

        Ok(FetchResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl HttpFetch for TimeBoundedFetch {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, FetchError> {
        let t0 = Instant::now();
        match tokio::time::timeout(req.timeout, self.send(&req)).await {
            Ok(res) => {
                debug!(
                    target: "fetch",
                    url = %req.url,
                    ok = res.is_ok(),
                    ms = t0.elapsed().as_millis() as u64,
                    "request finished"
                );
                res
            }
            Err(_elapsed) => {
                counter!("fetch_timeouts_total").increment(1);
                warn!(
                    target: "fetch",
                    url = %req.url,
                    timeout_ms = req.timeout.as_millis() as u64,
                    "request aborted by deadline"
                );
                Err(FetchError::Timeout { after: req.timeout })
            }
        }
    }
}
