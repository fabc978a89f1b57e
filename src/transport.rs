//! Consumed transport interface.
//!
//! Secure-shell establishment lives outside this crate; implementations of
//! these traits hand the engine a session with a keepalive knob and a
//! file-transfer subchannel. All trait objects must be shareable across the
//! sampler tasks.

use std::time::Duration;

use async_trait::async_trait;

/// Failure establishing a transport or its subchannel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    AuthFailed(String),
    Unreachable(String),
    SubchannelFailed(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthFailed(msg) => write!(f, "authentication failed: {msg}"),
            Self::Unreachable(msg) => write!(f, "host unreachable: {msg}"),
            Self::SubchannelFailed(msg) => write!(f, "file-transfer subchannel failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Failure of an operation on an established file-transfer subchannel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The subchannel (or its session) is no longer usable.
    NotAlive,
    /// The remote path does not exist.
    NotFound(String),
    /// Transient I/O failure on a live subchannel.
    Io(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAlive => write!(f, "subchannel is not alive"),
            Self::NotFound(path) => write!(f, "remote path not found: {path}"),
            Self::Io(msg) => write!(f, "remote i/o error: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Filesystem usage of one mountpoint, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Opens sessions towards remote hosts by identifier.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, id: &str) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// One established secure-shell session.
#[async_trait]
pub trait TransportSession: Send + Sync {
    /// Opens the file-transfer subchannel used for all remote reads.
    async fn open_file_transfer(&self) -> Result<Box<dyn FileChannel>, TransportError>;

    /// Enables periodic keepalives on the session.
    fn start_keepalive(&self, interval: Duration);

    async fn close(&self);
}

/// A file-transfer subchannel: the only surface the engine reads through.
#[async_trait]
pub trait FileChannel: Send + Sync {
    /// Opens `path`, reads it to the end, closes it.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, ChannelError>;

    /// Entry names directly under `path`.
    async fn list_dir(&self, path: &str) -> Result<Vec<String>, ChannelError>;

    /// `statvfs`-style usage of the filesystem holding `path`.
    async fn statfs(&self, path: &str) -> Result<FsUsage, ChannelError>;

    /// Cheap, non-blocking liveness probe.
    fn is_alive(&self) -> bool;

    async fn close(&self);
}
