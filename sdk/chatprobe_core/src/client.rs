//! HTTP transport for the chatprobe test client.
//!
//! [`ApiClient`] owns one connection pool and an immutable default-header
//! snapshot taken at construction. Requests are issued through
//! [`RequestSpec`], which can replace the header set wholesale, attach a
//! structured or pre-serialized body, and enforce an expected status code
//! before the response is handed back.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chatprobe_core::auth::Credential;
//! use chatprobe_core::client::ApiClient;
//!
//! # async fn example() -> chatprobe_core::ClientResult<()> {
//! let client = ApiClient::builder()
//!     .base_url("https://qa.example.com")
//!     .credential(Credential::bearer("token"))
//!     .build()?;
//!
//! let response = client
//!     .post("/stream/v1/chat/completions")
//!     .json(serde_json::json!({"model": "gpt-4-0125-preview", "messages": []}))
//!     .expect_status(200)
//!     .send()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::Credential;
use crate::config::BASE_URL_ENV;
use crate::error::{ClientError, ClientResult, Diagnostic};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use std::time::Duration;

/// Total wall-clock bound for one request, including body transfer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for driving test requests against one API deployment.
///
/// Owns a single connection pool (HTTP/2 where the server negotiates it via
/// ALPN, HTTP/1.1 otherwise) and a default header set: JSON content type,
/// compression advertisement, and a bearer `Authorization` header when a
/// credential was supplied. The header set is a snapshot — per-request
/// overrides replace it entirely rather than merging into it, and two
/// clients never share headers or connections.
///
/// Dropping the client releases the pool on every exit path;
/// [`ApiClient::close`] does the same eagerly and may be called repeatedly.
#[derive(Debug)]
pub struct ApiClient {
    http: Option<HttpClient>,
    base_url: String,
    default_headers: HeaderMap,
}

/// Builder for constructing an [`ApiClient`].
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    credential: Option<Credential>,
    timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a new builder for configuring an `ApiClient`.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// The base address requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The header snapshot taken at construction.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    /// Release the connection pool.
    ///
    /// Safe to call repeatedly; requests issued after the first call fail
    /// with [`ClientError::Closed`].
    pub fn close(&mut self) {
        self.http = None;
    }

    /// Begin a request with an explicit method.
    pub fn request(&self, method: Method, path: impl Into<String>) -> RequestSpec<'_> {
        RequestSpec {
            client: self,
            method,
            path: path.into(),
            headers: None,
            payload: None,
            expected_status: None,
        }
    }

    pub fn get(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::PATCH, path)
    }

    pub fn delete(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::DELETE, path)
    }

    pub fn head(&self, path: impl Into<String>) -> RequestSpec<'_> {
        self.request(Method::HEAD, path)
    }
}

impl ApiClientBuilder {
    /// Set the base address of the deployment under test.
    ///
    /// If not set, the builder falls back to the `CHATPROBE_BASE_URL`
    /// environment variable.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Attach a bearer credential to the default header set.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Override the request timeout.
    ///
    /// Defaults to [`DEFAULT_REQUEST_TIMEOUT`] (30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the `ApiClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is available, the base URL does not
    /// parse, or the credential cannot form a header value.
    pub fn build(self) -> ClientResult<ApiClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .ok_or_else(|| {
                ClientError::MissingConfig(format!(
                    "base URL is required. Set it via the builder or the {BASE_URL_ENV} env var."
                ))
            })?;

        Url::parse(&base_url)
            .map_err(|err| ClientError::InvalidBaseUrl(format!("{base_url}: {err}")))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
        if let Some(credential) = &self.credential {
            default_headers.insert(reqwest::header::AUTHORIZATION, credential.header_value()?);
        }

        // The pool itself carries no default headers: every request attaches
        // either the snapshot above or the caller's full replacement map, so
        // an override is truly verbatim.
        let http = HttpClient::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()?;

        Ok(ApiClient {
            http: Some(http),
            base_url,
            default_headers,
        })
    }
}

/// Body attached to a request.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A structured value, serialized to JSON exactly once at send time.
    Json(serde_json::Value),
    /// A pre-serialized body, passed through unmodified.
    Raw(String),
}

/// POST, PUT, and PATCH carry bodies; payloads on other verbs are ignored.
fn is_body_bearing(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH")
}

/// One request under construction against an [`ApiClient`].
#[derive(Debug)]
pub struct RequestSpec<'a> {
    client: &'a ApiClient,
    method: Method,
    path: String,
    headers: Option<HeaderMap>,
    payload: Option<Payload>,
    expected_status: Option<u16>,
}

impl RequestSpec<'_> {
    /// Replace the default header set for this request.
    ///
    /// No merging happens: headers absent from `headers` are not sent, so a
    /// scenario can drop `Content-Type` or `Authorization` outright.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Attach a structured JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.payload = Some(Payload::Json(body));
        self
    }

    /// Attach a pre-serialized body verbatim.
    pub fn raw(mut self, body: impl Into<String>) -> Self {
        self.payload = Some(Payload::Raw(body.into()));
        self
    }

    /// Check the response status before handing the response back; a
    /// mismatch fails the call with [`ClientError::ContractViolation`].
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    /// Issue the request and wait for the response.
    ///
    /// The target address is the client's base address with the request path
    /// appended. The call suspends until the response arrives or the
    /// request timeout elapses ([`ClientError::Timeout`]).
    pub async fn send(self) -> ClientResult<ApiResponse> {
        let http = self.client.http.as_ref().ok_or(ClientError::Closed)?;
        let url = format!("{}{}", self.client.base_url, self.path);
        let headers = self
            .headers
            .unwrap_or_else(|| self.client.default_headers.clone());

        let body_bearing = is_body_bearing(&self.method);
        let mut request = http.request(self.method, url).headers(headers);
        if body_bearing {
            request = match self.payload {
                Some(Payload::Json(value)) => request.body(serde_json::to_string(&value)?),
                Some(Payload::Raw(body)) => request.body(body),
                None => request,
            };
        }

        let response = ApiResponse {
            inner: request.send().await?,
        };

        match self.expected_status {
            Some(expected) => response.expect_status(expected).await,
            None => Ok(response),
        }
    }
}

/// A server response: status, headers, and a body that may be consumed as
/// raw bytes, text, parsed JSON, or an incremental byte stream.
#[derive(Debug)]
pub struct ApiResponse {
    inner: reqwest::Response,
}

impl ApiResponse {
    #[cfg(test)]
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Consume the response into its raw body bytes.
    pub async fn bytes(self) -> ClientResult<Bytes> {
        Ok(self.inner.bytes().await?)
    }

    /// Consume the response into its body text.
    pub async fn text(self) -> ClientResult<String> {
        Ok(self.inner.text().await?)
    }

    /// Parse the body as JSON into `T`.
    pub async fn json<T: DeserializeOwned>(self) -> ClientResult<T> {
        let body = self.inner.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Succeed iff the status equals `expected`, handing the response back
    /// untouched.
    ///
    /// On mismatch the body is read for a best-effort diagnostic: a 200
    /// carries no error payload to extract, any other status is parsed as
    /// JSON, and a body that fails to parse is reported with a fixed
    /// placeholder. The diagnostic never replaces the violation itself.
    pub async fn expect_status(self, expected: u16) -> ClientResult<Self> {
        let actual = self.status().as_u16();
        if actual == expected {
            return Ok(self);
        }

        let diagnostic = if actual == 200 {
            Diagnostic::None
        } else {
            match self.text().await {
                Ok(body) => match serde_json::from_str::<serde_json::Value>(&body) {
                    Ok(value) => Diagnostic::Payload(value),
                    Err(_) => Diagnostic::Unparseable,
                },
                Err(_) => Diagnostic::Unparseable,
            }
        };

        Err(ClientError::ContractViolation {
            expected,
            actual,
            diagnostic,
        })
    }

    /// Succeed iff the status is in the 2xx range.
    pub async fn expect_success(self) -> ClientResult<Self> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        let reason = status.canonical_reason().unwrap_or("").to_string();
        let body = self.text().await.unwrap_or_default();
        Err(ClientError::FailureStatus {
            status: status.as_u16(),
            reason,
            body,
        })
    }

    /// Incremental body bytes, consumed once, for the stream decoder.
    pub fn into_byte_stream(self) -> BoxStream<'static, ClientResult<Bytes>> {
        self.inner
            .bytes_stream()
            .map_err(ClientError::from)
            .boxed()
    }
}
