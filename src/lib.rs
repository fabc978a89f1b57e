//! sshtop — remote fleet procfs monitoring engine.
//!
//! Concurrently samples a fleet of remote Linux hosts over a secure
//! file-transfer channel and publishes consistent snapshots for a terminal
//! view. Provides:
//! - `procfs` — pure parsers for the remote `/proc` pseudo-files
//! - `gateway` — remote filesystem access over a transport subchannel
//! - `transport` — the consumed secure-shell transport interface
//! - `session` — per-host connection lifecycle
//! - `series` / `rates` — bounded sample history and counter derivations
//! - `sampler` — periodic raw-counter pulls and read-through facts
//! - `fleet` — the supervisor: sampler tasks, reconnect sweep, snapshots
//! - `graph` — sparkline and braille encoders for the view
//! - `snapshot` — the read-only view types
//! - `mock` — an in-memory transport for tests and demos

pub mod config;
pub mod fleet;
pub mod fmt;
pub mod gateway;
pub mod graph;
pub mod mock;
pub mod procfs;
pub mod rates;
pub mod sampler;
pub mod series;
pub mod session;
pub mod snapshot;
pub mod transport;

pub use config::Config;
pub use fleet::{Fleet, FleetError, View};
pub use snapshot::{FleetSnapshot, HostSnapshot};
