//! A client for the SkillChecker skill-tracking platform.
//!
//! The interesting parts are the [`SessionStore`] (who is logged in, kept
//! across restarts), the [`ApiClient`] (which attaches credentials and ends
//! the session when the backend rejects them) and the route guard in
//! [`routes`]. The [`endpoints`] module has typed bindings for the backend's
//! REST API.

#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod claims;
mod client;
pub mod config;
pub mod endpoints;
mod identity;
mod navigator;
pub mod routes;
mod session;
mod storage;
pub mod types;
mod user;
pub mod validation;

pub use claims::{decode_claims, Claims};
pub use client::{ApiClient, ApiError};
pub use config::{Config, ConfigError};
pub use identity::{resolve_identity, LoginResponse, MissingToken, PartialUser};
pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use session::{PersistedSession, Session, SessionStore, SESSION_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use user::{Role, UnknownRole, User, UserPatch};

/// The default user agent to use when communicating with the backend.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
