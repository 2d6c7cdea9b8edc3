//! HTTP Transport
//!
//! Request/response layer between the token service client and the network.
//! Redirects are never followed: the token endpoints answer directly, and a
//! 3xx almost always means the session lapsed and a login page is waiting.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{ApiKeysError, ConfigurationError, NetworkError, ProtocolError};
use crate::types::DEFAULT_TIMEOUT_MS;

/// Largest response body accepted.
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Outgoing request to the token service.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    /// Overrides the transport's default timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::from([("accept".to_string(), "application/json".to_string())]),
            body: None,
            timeout: None,
        }
    }

    /// Add headers; names are lower-cased, later values win.
    pub fn with_headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value.clone());
        }
        self
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        self.body = Some(body.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Response as read off the wire.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiKeysError>;
}

/// reqwest-backed transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    pub fn new() -> Result<Self, ApiKeysError> {
        Self::with_options(
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            DEFAULT_MAX_RESPONSE_SIZE,
        )
    }

    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, ApiKeysError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ApiKeysError::Configuration(ConfigurationError::InvalidConfig {
                    message: format!("Failed to create HTTP client: {}", e),
                })
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }

    fn ensure_within_limit(&self, size: usize) -> Result<(), ApiKeysError> {
        if size > self.max_response_size {
            return Err(ProtocolError::ResponseTooLarge { size }.into());
        }
        Ok(())
    }
}

fn send_error(error: reqwest::Error, timeout: Duration) -> ApiKeysError {
    if error.is_timeout() {
        NetworkError::Timeout { timeout }.into()
    } else {
        NetworkError::ConnectionFailed {
            message: error.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiKeysError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| send_error(e, timeout))?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        if status.is_redirection() {
            return Err(ProtocolError::UnexpectedRedirect {
                location: headers.get("location").cloned().unwrap_or_default(),
            }
            .into());
        }

        if let Some(len) = response.content_length() {
            self.ensure_within_limit(len as usize)?;
        }

        let body = response.text().await.map_err(|e| ProtocolError::InvalidResponse {
            message: e.to_string(),
        })?;
        self.ensure_within_limit(body.len())?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Scripted transport for tests. Responses are served in queue order and
/// every request is recorded.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queue a JSON body with the given status.
    pub fn queue_json_response(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.queue_response(HttpResponse {
            status,
            status_text: String::new(),
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: body.to_string(),
        })
    }

    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn get_last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiKeysError> {
        lock(&self.requests).push(request);

        let next = lock(&self.responses).pop_front();
        next.ok_or_else(|| {
            NetworkError::ConnectionFailed {
                message: "no scripted response left".to_string(),
            }
            .into()
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Create production HTTP transport.
pub fn create_transport(timeout: Option<Duration>) -> Result<ReqwestHttpTransport, ApiKeysError> {
    match timeout {
        Some(t) => ReqwestHttpTransport::with_options(t, DEFAULT_MAX_RESPONSE_SIZE),
        None => ReqwestHttpTransport::new(),
    }
}

/// Create mock HTTP transport for testing.
pub fn create_mock_transport() -> MockHttpTransport {
    MockHttpTransport::new()
}
