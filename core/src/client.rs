//! Session-aware HTTP client for the coding-platform admin API.
//!
//! # Design
//! `AdminClient` is the single choke point for backend calls. It builds an
//! `HttpRequest` (base URL, JSON body, query, bearer token), executes it on
//! the injected `Transport`, and either returns the parsed body verbatim or
//! converts the failure into one `ApiError`. Envelope unwrapping is left to
//! the caller (see `envelope`).
//!
//! Authentication failures are the only errors with a side effect: the
//! session is cleared and the navigator is sent to `LOGIN_ROUTE` before the
//! error is returned.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::{ClientConfig, ConfigError};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::http::{
    CredentialsMode, HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport,
};
use crate::navigation::{Navigator, LOGIN_ROUTE};
use crate::session::{Identity, Session, SessionManager, SessionState, SessionStore};
use crate::types::LoginRequest;

pub const LOGIN_PATH: &str = "/api/admin/login";

/// Flat string-keyed query parameters.
pub type Query = BTreeMap<String, String>;

/// Per-call options for `AdminClient::request`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub query: Query,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::with_method(HttpMethod::Post).body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::with_method(HttpMethod::Put).body(body)
    }

    pub fn patch() -> Self {
        Self::with_method(HttpMethod::Patch)
    }

    pub fn delete() -> Self {
        Self::with_method(HttpMethod::Delete)
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, query: &Query) -> Self {
        self.query = query.clone();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Serialize a request payload for `RequestOptions::body`.
pub fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

pub struct AdminClient<T, S> {
    base_url: String,
    credentials: CredentialsMode,
    transport: T,
    session: SessionManager<S>,
    navigator: Box<dyn Navigator>,
}

impl<T: Transport, S: SessionStore> AdminClient<T, S> {
    /// Build the process-wide client and restore any stored session.
    pub fn configure(
        config: &ClientConfig,
        transport: T,
        store: S,
        navigator: impl Navigator + 'static,
    ) -> Self {
        let mut session = SessionManager::new(store);
        let state = session.restore();
        tracing::debug!(base_url = %config.base_url, ?state, "admin client configured");
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            transport,
            session,
            navigator: Box::new(navigator),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read-only view; only login, logout, and auth teardown change it.
    pub fn session(&self) -> &SessionManager<S> {
        &self.session
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Describe the HTTP call `request` would make, without executing it.
    pub fn build_request(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = options.headers.clone();
        let explicit_auth = headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("authorization"));
        if let (false, Some(token)) = (explicit_auth, self.session.token()) {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match (&options.body, options.method.carries_body()) {
            (Some(body), true) => Some(
                serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?,
            ),
            _ => None,
        };
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method: options.method,
            url: format!("{}{}", self.base_url, path),
            query: options
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            headers,
            body,
            credentials: self.credentials,
        })
    }

    /// Issue exactly one HTTP call and return the parsed body verbatim.
    pub fn request(&mut self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let request = self.build_request(path, &options)?;
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            has_auth = request.header("authorization").is_some(),
            query = ?request.query,
            body = ?options.body.as_ref().map(redacted),
            "api request"
        );

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    method = request.method.as_str(),
                    url = %request.url,
                    message = %err.message,
                    "api transport error"
                );
                return Err(err.into());
            }
        };

        self.handle_response(&request, response)
    }

    fn handle_response(
        &mut self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Value, ApiError> {
        if response.is_success() {
            tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                status = response.status,
                body = %redacted_text(&response.body),
                "api response"
            );
            if response.body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&response.body)
                .map_err(|e| ApiError::Deserialization(e.to_string()));
        }

        let err = ApiError::from_response(&response);
        tracing::error!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            message = %err,
            body = %redacted_text(&response.body),
            "api error"
        );
        if err.is_unauthorized() {
            self.teardown_session();
        }
        Err(err)
    }

    fn teardown_session(&mut self) {
        tracing::warn!("clearing session and redirecting to login");
        if let Err(error) = self.session.clear() {
            tracing::warn!(%error, "failed to clear stored session");
        }
        self.navigator.redirect(LOGIN_ROUTE);
    }

    /// Exchange credentials for a bearer token and start the session.
    pub fn login(&mut self, username: &str, password: &str) -> Result<Session, ApiError> {
        tracing::info!(username, "admin login attempt");
        let body = to_body(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self.request(LOGIN_PATH, RequestOptions::post(body))?;

        let payload = Envelope::of_data(&response).payload();
        let token = payload
            .get("accessToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingField("accessToken"))?;
        let identity = payload
            .get("user")
            .cloned()
            .and_then(Identity::from_value)
            .ok_or(ApiError::MissingField("user"))?;

        self.session.set(token, identity)?;
        self.session
            .session()
            .cloned()
            .ok_or(ApiError::MissingField("accessToken"))
    }

    /// Drop the local session. The backend is not contacted.
    pub fn logout(&mut self) {
        tracing::info!(admin = ?self.session.identity().and_then(Identity::name), "logging out");
        if let Err(error) = self.session.clear() {
            tracing::warn!(%error, "failed to clear stored session");
        }
    }
}

/// Fields whose values never reach the log sink.
const REDACTED_FIELDS: [&str; 3] = ["password", "accessToken", "token"];

/// `value` with every `REDACTED_FIELDS` entry replaced, at any depth.
fn redacted(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if REDACTED_FIELDS.contains(&k.as_str()) {
                        Value::String("[redacted]".to_string())
                    } else {
                        redacted(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redacted).collect()),
        other => other.clone(),
    }
}

/// Raw response body for logging; JSON bodies are redacted.
fn redacted_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => redacted(&value).to_string(),
        Err(_) => body.to_string(),
    }
}

/// Network client whose session store is chosen by `ClientConfig`.
pub type NetworkClient = AdminClient<UreqTransport, Box<dyn SessionStore>>;

impl NetworkClient {
    /// `UreqTransport` plus `ClientConfig::session_store`, with any stored
    /// session restored.
    pub fn from_config(config: &ClientConfig, navigator: impl Navigator + 'static) -> Self {
        Self::configure(config, UreqTransport::new(), config.session_store(), navigator)
    }

    pub fn from_env(navigator: impl Navigator + 'static) -> Result<Self, ConfigError> {
        Ok(Self::from_config(&ClientConfig::from_env()?, navigator))
    }
}
