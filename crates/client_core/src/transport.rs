//! Outbound HTTP calls to the movie backend.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use shared::error::ApiError;
use tracing::debug;
use url::Url;

/// Seam between the stores and the network. Successful calls yield the
/// decoded JSON body (`Value::Null` when the body is empty).
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Value, ApiError>;
    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid api base url '{base_url}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn execute(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(|err| {
            debug!(method, path, error = %err, "transport: request failed");
            ApiError::Transport(err.to_string())
        })?;
        let status = response.status();
        debug!(method, path, status = status.as_u16(), "transport: response");
        let body = read_body(response).await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Value, ApiError> {
        let mut request = self.http.get(self.url(path));
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        self.execute("GET", path, request).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let request = self.http.post(self.url(path)).json(body);
        self.execute("POST", path, request).await
    }
}

async fn read_body(response: Response) -> Result<Value, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ApiError::Transport(err.to_string()))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    // non-JSON bodies are kept as text, the same way a browser client sees them
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}
