//! # coach-daemon
//!
//! HTTP front end for the shared coaching collections.
//!
//! ```text
//! GET  {base_path}/data   → everything the caller may read
//! POST {base_path}/data   → merge the pushed snapshots, answer {"status":"success"}
//! ```
//!
//! Callers authenticate with a bearer token mapped to an account in
//! `coach.toml`. All merge rules live in `coach-sync`; this crate only
//! resolves the caller and moves JSON.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{router, AppState, DaemonState};
pub use auth::{Authenticated, Sessions};
pub use config::{AccountConfig, DaemonConfig, LogFormat, ServerConfig, StoreConfig};
