//! Response envelope unwrapping.
//!
//! The backend wraps payloads as `{ "data": { "<plural>": [...] } }`,
//! `{ "data": ... }`, or sends them bare. `Envelope` names the shape that was
//! found so every caller unwraps the same way.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

static EMPTY_LIST: Value = Value::Array(Vec::new());

/// Where the payload was found inside a response body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    /// `{ "data": { "<key>": payload } }`
    Keyed(&'a Value),
    /// `{ "data": payload }`
    Data(&'a Value),
    /// The body itself is the payload.
    Bare(&'a Value),
}

impl<'a> Envelope<'a> {
    /// Locate a list payload, preferring `data.<key>`, then `data`, then the
    /// body. When none of them is an array the payload is an empty list.
    pub fn of_list(body: &'a Value, key: &str) -> Self {
        let data = body.get("data");
        if let Some(keyed) = data.and_then(|d| d.get(key)).filter(|v| v.is_array()) {
            return Envelope::Keyed(keyed);
        }
        if let Some(data) = data.filter(|v| v.is_array()) {
            return Envelope::Data(data);
        }
        if body.is_array() {
            return Envelope::Bare(body);
        }
        Envelope::Bare(&EMPTY_LIST)
    }

    /// Locate a single-entity payload, preferring `data.<key>`, then `data`,
    /// then the body.
    pub fn of_entity(body: &'a Value, key: &str) -> Self {
        let data = body.get("data");
        if let Some(keyed) = data.and_then(|d| d.get(key)).filter(|v| v.is_object()) {
            return Envelope::Keyed(keyed);
        }
        if let Some(data) = data.filter(|v| v.is_object()) {
            return Envelope::Data(data);
        }
        Envelope::Bare(body)
    }

    /// `data` when the body has a non-null one, otherwise the body.
    pub fn of_data(body: &'a Value) -> Self {
        match body.get("data") {
            Some(data) if !data.is_null() => Envelope::Data(data),
            _ => Envelope::Bare(body),
        }
    }

    pub fn payload(&self) -> &'a Value {
        match *self {
            Envelope::Keyed(v) | Envelope::Data(v) | Envelope::Bare(v) => v,
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        T::deserialize(self.payload()).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Deserialize the list payload of `body`; see `Envelope::of_list`.
pub fn parse_list<T: DeserializeOwned>(body: &Value, key: &str) -> Result<Vec<T>, ApiError> {
    Envelope::of_list(body, key).decode()
}

/// Deserialize the entity payload of `body`; see `Envelope::of_entity`.
pub fn parse_entity<T: DeserializeOwned>(body: &Value, key: &str) -> Result<T, ApiError> {
    Envelope::of_entity(body, key).decode()
}
