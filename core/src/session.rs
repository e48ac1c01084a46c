//! Admin session lifecycle and its durable storage.
//!
//! # Design
//! `SessionManager` is an explicit object owned by `AdminClient`; nothing
//! reads the store behind its back. The token and the identity are written,
//! restored, and cleared together, so a half-present session never exists in
//! memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;

/// Storage key holding the opaque bearer token.
pub const TOKEN_KEY: &str = "adminAccessToken";
/// Storage key holding the identity serialized as JSON.
pub const IDENTITY_KEY: &str = "adminData";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session storage error: {0}")]
    Storage(String),
}

/// Durable client-side key/value storage.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        (**self).remove(key)
    }
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// and inspect what the client wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.entries.lock() {
            map.extend(entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        }
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.entries
            .lock()
            .map_err(|e| SessionError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}

/// One file per key under a directory, readable only by the owner on Unix.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key))
            .ok()
            .filter(|s| !s.trim().is_empty())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SessionError::Storage(format!("mkdir {}: {e}", self.dir.display())))?;
        let path = self.path(key);
        fs::write(&path, value)
            .map_err(|e| SessionError::Storage(format!("write {}: {e}", path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| SessionError::Storage(format!("chmod {}: {e}", path.display())))?;
        }

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| SessionError::Storage(format!("delete {}: {e}", path.display())))?;
        }
        Ok(())
    }
}

/// Free-form admin identity as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identity(Map<String, Value>);

impl Identity {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Accepts only JSON objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

/// Bearer token plus the identity it was issued to.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

pub struct SessionManager<S> {
    store: S,
    current: Option<Session>,
}

impl<S: SessionStore> SessionManager<S> {
    /// Starts anonymous; call `restore` to pick up a stored session.
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Load the stored session. A stored identity that is not a JSON object
    /// is treated as corrupt and both keys are removed.
    pub fn restore(&mut self) -> SessionState {
        self.current = None;
        let (Some(token), Some(raw_identity)) =
            (self.store.get(TOKEN_KEY), self.store.get(IDENTITY_KEY))
        else {
            tracing::debug!("no stored credentials found");
            return SessionState::Anonymous;
        };

        let identity = serde_json::from_str::<Value>(&raw_identity)
            .ok()
            .and_then(Identity::from_value);
        match identity {
            Some(identity) => {
                tracing::info!(admin = ?identity.name(), "session restored");
                self.current = Some(Session { token, identity });
                SessionState::Authenticated
            }
            None => {
                tracing::warn!("stored admin identity is corrupt; clearing session");
                self.wipe_store();
                SessionState::Anonymous
            }
        }
    }

    pub fn set(&mut self, token: &str, identity: Identity) -> Result<(), SessionError> {
        self.store.set(TOKEN_KEY, token)?;
        if let Err(e) = self.store.set(IDENTITY_KEY, &identity.to_json()) {
            self.wipe_store();
            return Err(e);
        }
        tracing::info!(admin = ?identity.name().or(identity.email()), "session started");
        self.current = Some(Session {
            token: token.to_string(),
            identity,
        });
        Ok(())
    }

    /// Always leaves memory anonymous, even if the store refuses the removal.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        self.current = None;
        let token = self.store.remove(TOKEN_KEY);
        let identity = self.store.remove(IDENTITY_KEY);
        token.and(identity)
    }

    pub fn state(&self) -> SessionState {
        if self.current.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.current.as_ref().map(|s| &s.identity)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn wipe_store(&self) {
        for key in [TOKEN_KEY, IDENTITY_KEY] {
            if let Err(error) = self.store.remove(key) {
                tracing::warn!(%error, key, "failed to remove stored session key");
            }
        }
    }
}
