use crate::config::ConnectionConfig;
use crate::error::{ClientError, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Longest body excerpt carried inside an error.
const BODY_SNIPPET_LEN: usize = 512;

/// Header some server versions use instead of `Authorization`.
const ACCESS_TOKEN_HEADER: &str = "access_token";

/// A request that can be sent again after a token renewal.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP plumbing against one base URL. Holds no credentials; the session
/// passes its headers in on every call.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: String,
}

impl Transport {
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("jinjamator-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn send(&self, request: &ApiRequest, headers: HeaderMap) -> Result<Response> {
        let url = self.url(&request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        debug!("{} {} -> {}", request.method, url, response.status());
        Ok(response)
    }
}

/// Token handed back in a response header, if any.
pub(crate) fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    [AUTHORIZATION.as_str(), ACCESS_TOKEN_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

pub(crate) fn snippet(text: &str) -> String {
    if text.chars().count() <= BODY_SNIPPET_LEN {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(BODY_SNIPPET_LEN).collect();
        cut.push_str("...");
        cut
    }
}

/// Consume a response body into an error-sized excerpt.
pub(crate) async fn body_snippet(response: Response) -> String {
    match response.text().await {
        Ok(text) => snippet(&text),
        Err(e) => format!("<unreadable body: {}>", e),
    }
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse {
        url,
        reason: format!("{} in body '{}'", e, snippet(&text)),
    })
}

/// Turn any non-2xx response into [`ClientError::Http`].
pub(crate) async fn expect_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let status = response.status().as_u16();
    Err(ClientError::Http {
        url,
        status,
        body: body_snippet(response).await,
    })
}
