//! Client core for the coding-platform admin console.
//!
//! # Overview
//! `AdminClient` is the one place backend calls go through: it attaches the
//! bearer token, returns response bodies verbatim, normalizes failures into
//! `ApiError`, and tears the session down on authentication failures.
//! `ReorderController` implements drag-to-reorder for modules and contest
//! problems on top of it, with optimistic local state and rollback.
//!
//! # Design
//! - Host-does-IO: requests and responses are plain data (`http`), executed
//!   by a `Transport`. `UreqTransport` is the blocking network transport;
//!   tests script responses in memory.
//! - The session is an explicit `SessionManager` over a `SessionStore`
//!   owned by the client, never ambient global state.
//! - Envelope shapes are named by `Envelope` and unwrapped in one place.

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod navigation;
pub mod reorder;
pub mod session;
pub mod types;

pub use client::{AdminClient, NetworkClient, Query, RequestOptions, LOGIN_PATH};
pub use config::{ClientConfig, ConfigError};
pub use envelope::{parse_entity, parse_list, Envelope};
pub use error::ApiError;
pub use http::{
    CredentialsMode, HttpMethod, HttpRequest, HttpResponse, Transport, TransportError,
    UreqTransport,
};
pub use navigation::{Navigator, NoopNavigator, RecordingNavigator, LOGIN_ROUTE};
pub use reorder::{
    ContestProblemCollection, ModuleCollection, OrderAssignment, Orderable, OrderedCollection,
    Phase, ReorderController, ReorderError,
};
pub use session::{
    FileStore, Identity, MemoryStore, Session, SessionError, SessionManager, SessionState,
    SessionStore,
};
pub use types::{
    Contest, ContestProblem, ContestProblemAssignment, ContestStatus, LoginRequest, Module,
    ModuleOrder, ModuleUpdate, NewModule, NewTag, ProblemOrder,
};
