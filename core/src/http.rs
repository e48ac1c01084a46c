//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `AdminClient` builds an
//! `HttpRequest`, hands it to a `Transport`, and interprets the returned
//! `HttpResponse`. A non-2xx status is a response, not a transport failure;
//! only network-level problems surface as `TransportError`.

use thiserror::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a JSON body is sent for this method.
    pub fn carries_body(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

/// Whether cookies travel with requests (the browser `withCredentials` flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    #[default]
    Include,
    Omit,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub credentials: CredentialsMode,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Network Error".to_string()
        } else {
            message
        };
        Self { message }
    }
}

/// Executes one HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by `ureq`.
///
/// Status codes are returned as data. `CredentialsMode::Include` requests go
/// through an agent whose cookie store follows RFC 6265 (expiry, deletion,
/// domain and path scoping). `Omit` requests use a second agent whose store
/// is emptied before every call, so they never carry cookies.
pub struct UreqTransport {
    with_cookies: ureq::Agent,
    without_cookies: ureq::Agent,
}

fn status_as_data_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            with_cookies: status_as_data_agent(),
            without_cookies: status_as_data_agent(),
        }
    }

    fn agent(&self, credentials: CredentialsMode) -> &ureq::Agent {
        match credentials {
            CredentialsMode::Include => &self.with_cookies,
            CredentialsMode::Omit => {
                self.without_cookies.cookie_jar_lock().clear();
                &self.without_cookies
            }
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent(request.credentials);

        macro_rules! prepare {
            ($builder:expr) => {{
                let mut builder = $builder;
                for (k, v) in &request.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &request.headers {
                    builder = builder.header(k.as_str(), v.as_str());
                }
                builder
            }};
        }

        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => prepare!(agent.get(url)).call(),
            HttpMethod::Delete => match &request.body {
                Some(body) => prepare!(agent.delete(url))
                    .force_send_body()
                    .send(body.as_bytes()),
                None => prepare!(agent.delete(url)).call(),
            },
            HttpMethod::Post => send(prepare!(agent.post(url)), request.body.as_deref()),
            HttpMethod::Put => send(prepare!(agent.put(url)), request.body.as_deref()),
            HttpMethod::Patch => send(prepare!(agent.patch(url)), request.body.as_deref()),
        };
        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
