//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! `HttpRequest` and `HttpResponse` describe an exchange as plain data. The
//! request builders in [`crate::client`] never touch the network; a
//! [`Transport`] executes the request and hands back the response for
//! parsing. `UreqTransport` is the production transport. Tests plug in
//! closures that act as scripted request handlers.
//!
//! Response bodies are raw bytes: the API does not promise UTF-8 on error
//! paths and the error decoder keeps the original bytes for diagnostics.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An HTTP request described as plain data.
///
/// `path` is absolute (scheme, host and versioned prefix included). Query
/// pairs are kept unencoded and in insertion order; [`HttpRequest::url`]
/// renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// First value of the query parameter `key`, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value of the header `name` (case-insensitive), if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Full URL with the percent-encoded query string appended.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `[200, 400)` counts as success; everything else carries an error body.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Failure to complete the HTTP exchange at all. Raised before any status
/// classification happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("i/o failure: {0}")]
    Io(String),
}

/// Executes a single `HttpRequest`. Implementations must return 4xx/5xx
/// responses as data rather than as errors.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Blocking transport backed by a shared `ureq` agent.
///
/// Cheap to clone: the agent is reference counted internally.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` is the default for requests that do not carry their own.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    fn prepare<B>(
        &self,
        mut builder: ureq::RequestBuilder<B>,
        request: &HttpRequest,
    ) -> ureq::RequestBuilder<B> {
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.config().timeout_global(Some(timeout)).build();
        }
        builder
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => self.prepare(self.agent.get(&url), request).call(),
            (HttpMethod::Delete, _) => self.prepare(self.agent.delete(&url), request).call(),
            (HttpMethod::Post, Some(body)) => self
                .prepare(self.agent.post(&url), request)
                .send(body.as_bytes()),
            (HttpMethod::Post, None) => self.prepare(self.agent.post(&url), request).send_empty(),
        };

        let mut response = result.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::Io(e) => TransportError::Io(e.to_string()),
        other => TransportError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_query_is_path() {
        let req = HttpRequest::new(HttpMethod::Get, "http://localhost/v3/contacts");
        assert_eq!(req.url(), "http://localhost/v3/contacts");
    }

    #[test]
    fn url_encodes_brackets_and_commas() {
        let req = HttpRequest::new(HttpMethod::Get, "http://localhost/v3/contacts")
            .with_query("filter[email]", "a+b@example.com")
            .with_query("fields", "name,email");
        assert_eq!(
            req.url(),
            "http://localhost/v3/contacts?filter%5Bemail%5D=a%2Bb%40example.com&fields=name%2Cemail"
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest::new(HttpMethod::Get, "/").with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-auth-token"), None);
    }

    #[test]
    fn success_range_is_200_to_399() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(202, "").is_success());
        assert!(HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(400, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn closures_act_as_transports() {
        let transport = |req: &HttpRequest| -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse::new(200, req.path.clone()))
        };
        let resp = transport
            .execute(&HttpRequest::new(HttpMethod::Get, "/ping"))
            .unwrap();
        assert_eq!(resp.body, b"/ping");
    }

    #[test]
    fn method_display_matches_wire_names() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
