//! # coach-client
//!
//! The client side of the coaching API.
//!
//! A [`ClientSession`] holds the caller's loaded collections and exposes each
//! lifecycle operation as a method. Every mutation updates local state at
//! once and asks the [`PushScheduler`] for a push; bursts of mutations within
//! the debounce window collapse into a single push of the full snapshot.
//!
//! - [`DataClient`] — `GET/POST {base}/data` over HTTP
//! - [`SnapshotPusher`] — the seam between the scheduler and the network
//! - [`SnapshotFetcher`] — reloads the view when a session refreshes
//! - [`SyncState`] — observable idle / pending / syncing status

pub mod config;
pub mod error;
pub mod http;
pub mod scheduler;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{DataClient, SnapshotFetcher, SnapshotPusher};
pub use scheduler::{PushScheduler, SnapshotFn, SyncState, SyncStatus};
pub use session::ClientSession;
