//! Error types for the admin API client.
//!
//! # Design
//! Every failure leaves the client as one `ApiError` whose `message()` is a
//! non-empty, human-readable string. Callers match on the variant only when
//! they need the kind (auth teardown already happened for `Unauthorized`);
//! otherwise they show the message.

use serde_json::Value;
use thiserror::Error;

use crate::http::{HttpResponse, TransportError};
use crate::session::SessionError;

/// Substrings that mark a 400 response as an authentication failure.
pub const AUTH_FAILURE_MARKERS: [&str; 2] = ["Not Authorized", "Session Expired"];

/// Errors returned by `AdminClient`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Network unreachable, timeout, or another failure below HTTP.
    #[error("{message}")]
    Transport { message: String },

    /// The backend rejected the session. The stored session has been cleared.
    #[error("{message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-2xx response (validation and business errors).
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A success response lacked a field the caller requires.
    #[error("response missing required field `{0}`")]
    MissingField(&'static str),

    /// The session could not be written to durable storage.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Classify a non-2xx response into `Unauthorized` or `Http`.
    ///
    /// Auth markers are looked for in the top-level `message` only; a marker
    /// nested under `error.message` is an ordinary failure.
    pub fn from_response(response: &HttpResponse) -> Self {
        let message = failure_message(response);
        let top_level = top_level_message(response).unwrap_or_default();
        if is_auth_failure(response.status, &top_level) {
            ApiError::Unauthorized {
                status: response.status,
                message,
            }
        } else {
            ApiError::Http {
                status: response.status,
                message,
            }
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Transport {
            message: err.message,
        }
    }
}

/// 401 always; 400 only when the message carries an auth marker.
pub fn is_auth_failure(status: u16, message: &str) -> bool {
    status == 401
        || (status == 400 && AUTH_FAILURE_MARKERS.iter().any(|m| message.contains(m)))
}

fn top_level_message(response: &HttpResponse) -> Option<String> {
    let body: Value = serde_json::from_str(&response.body).ok()?;
    non_empty_str(body.get("message")).map(str::to_string)
}

/// Backend `message`, then nested `error.message`, then a status line.
pub fn failure_message(response: &HttpResponse) -> String {
    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    body.as_ref()
        .and_then(|b| non_empty_str(b.get("message")))
        .or_else(|| {
            body.as_ref()
                .and_then(|b| b.get("error"))
                .and_then(|e| non_empty_str(e.get("message")))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status code {}", response.status))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
