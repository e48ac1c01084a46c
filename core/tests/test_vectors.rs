//! Replay the JSON vectors stored in `test-vectors/`.
//!
//! Each vector file lists inputs and the expected outcome. Payloads are
//! compared as parsed JSON, so field order in the files does not matter.

use labadmin_core::error::{failure_message, is_auth_failure};
use labadmin_core::{
    AdminClient, ApiError, ClientConfig, Envelope, HttpRequest, HttpResponse, MemoryStore,
    RecordingNavigator, RequestOptions, SessionState, Transport, TransportError,
};
use serde_json::Value;

/// Answers every request with the same response.
struct CannedTransport(HttpResponse);

impl Transport for CannedTransport {
    fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.0.clone())
    }
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn shape(envelope: &Envelope<'_>) -> &'static str {
    match envelope {
        Envelope::Keyed(_) => "keyed",
        Envelope::Data(_) => "data",
        Envelope::Bare(_) => "bare",
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[test]
fn envelope_test_vectors() {
    for case in load(include_str!("../../test-vectors/envelope.json")) {
        let name = case["name"].as_str().unwrap();
        let body = &case["body"];
        let key = case["key"].as_str().unwrap_or_default();

        let envelope = match case["kind"].as_str().unwrap() {
            "list" => Envelope::of_list(body, key),
            "entity" => Envelope::of_entity(body, key),
            "data" => Envelope::of_data(body),
            other => panic!("{name}: unknown kind {other}"),
        };

        assert_eq!(shape(&envelope), case["expected_shape"], "{name}: shape");
        assert_eq!(envelope.payload(), &case["expected_payload"], "{name}: payload");
    }
}

// ---------------------------------------------------------------------------
// Error normalization
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    for case in load(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let expected_message = case["expected_message"].as_str().unwrap();
        let response = HttpResponse {
            status,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };

        assert_eq!(failure_message(&response), expected_message, "{name}: message");

        let expected = match case["expected_kind"].as_str().unwrap() {
            "unauthorized" => ApiError::Unauthorized {
                status,
                message: expected_message.to_string(),
            },
            "http" => ApiError::Http {
                status,
                message: expected_message.to_string(),
            },
            other => panic!("{name}: unknown kind {other}"),
        };
        assert_eq!(ApiError::from_response(&response), expected, "{name}: classification");
    }
}

#[test]
fn error_test_vectors_through_the_client() {
    for case in load(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let unauthorized = case["expected_kind"] == "unauthorized";
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };

        let store = MemoryStore::with_entries([
            ("adminAccessToken", "T1"),
            ("adminData", r#"{"id":"1","name":"A"}"#),
        ]);
        let navigator = RecordingNavigator::new();
        let mut client = AdminClient::configure(
            &ClientConfig::new("http://localhost:5000"),
            CannedTransport(response),
            store,
            navigator.clone(),
        );

        let err = client
            .request("/api/coding-platform/tag/getall", RequestOptions::get())
            .unwrap_err();
        assert_eq!(err.message(), case["expected_message"].as_str().unwrap(), "{name}");
        assert_eq!(err.is_unauthorized(), unauthorized, "{name}: kind");

        let expected_state = if unauthorized {
            SessionState::Anonymous
        } else {
            SessionState::Authenticated
        };
        assert_eq!(client.session_state(), expected_state, "{name}: session");
        assert_eq!(navigator.routes().len(), usize::from(unauthorized), "{name}: redirect");
    }
}

// ---------------------------------------------------------------------------
// Auth classification
// ---------------------------------------------------------------------------

#[test]
fn auth_test_vectors() {
    for case in load(include_str!("../../test-vectors/auth.json")) {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let message = case["message"].as_str().unwrap();
        let expected = case["expected"].as_bool().unwrap();

        assert_eq!(is_auth_failure(status, message), expected, "{name}");
    }
}
