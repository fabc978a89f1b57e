//! Remote filesystem access for the samplers.
//!
//! The [`RemoteFs`] trait is the seam between the sampling engine and a
//! host's file-transfer subchannel. The channel-backed implementation is the
//! sole serialization point for the transport; samplers and fact readers may
//! call it concurrently.

mod channel;

pub use channel::ChannelGateway;

use async_trait::async_trait;

use crate::procfs::ParseError;
use crate::transport::{ChannelError, FsUsage};

/// Failure of a gateway operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No usable transport behind the gateway.
    NotAlive,
    /// The remote path does not exist.
    NotFound(String),
    /// Transient read failure on a live transport (including deadline
    /// overruns).
    Io(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAlive => write!(f, "transport is not alive"),
            Self::NotFound(path) => write!(f, "remote path not found: {path}"),
            Self::Io(msg) => write!(f, "remote read failed: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<ChannelError> for GatewayError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::NotAlive => Self::NotAlive,
            ChannelError::NotFound(path) => Self::NotFound(path),
            ChannelError::Io(msg) => Self::Io(msg),
        }
    }
}

/// A read failure below one snapshot field: either the remote read or the
/// decode of its content.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    Gateway(GatewayError),
    Parse(ParseError),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway(e) => e.fmt(f),
            Self::Parse(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<GatewayError> for ReadError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

impl From<ParseError> for ReadError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl ReadError {
    /// Short label for the log-once throttle buckets.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gateway(GatewayError::NotAlive) => "not-alive",
            Self::Gateway(GatewayError::NotFound(_)) => "not-found",
            Self::Gateway(GatewayError::Io(_)) => "io",
            Self::Parse(_) => "parse",
        }
    }
}

/// Read access to a remote host's filesystem.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Reads the entire contents of a remote file.
    async fn read_all(&self, path: &str) -> Result<Vec<u8>, GatewayError>;

    /// Directory entries under `proc_root` whose names are all digits.
    async fn list_pid_dirs(&self, proc_root: &str) -> Result<Vec<String>, GatewayError>;

    /// Filesystem usage of the mountpoint holding `path`.
    async fn stat_mount_point(&self, path: &str) -> Result<FsUsage, GatewayError>;

    /// Non-blocking liveness check of the underlying subchannel.
    fn is_alive(&self) -> bool;
}

/// Reads a remote file as UTF-8 text.
pub async fn read_string(fs: &dyn RemoteFs, path: &str) -> Result<String, GatewayError> {
    let bytes = fs.read_all(path).await?;
    String::from_utf8(bytes).map_err(|_| GatewayError::Io(format!("{path}: invalid utf-8")))
}

/// Keeps only directory names consisting of digits, i.e. PIDs.
pub(crate) fn filter_pid_names(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_name_filter() {
        let entries = vec![
            "1".to_string(),
            "4281".to_string(),
            "cpuinfo".to_string(),
            "irq".to_string(),
            "".to_string(),
            "12a".to_string(),
        ];
        assert_eq!(filter_pid_names(entries), vec!["1", "4281"]);
    }

    #[test]
    fn read_error_kinds() {
        assert_eq!(ReadError::from(GatewayError::NotAlive).kind(), "not-alive");
        assert_eq!(
            ReadError::from(GatewayError::Io("x".into())).kind(),
            "io"
        );
        let parse = ParseError::new("/proc/stat", 1, "bad");
        assert_eq!(ReadError::from(parse).kind(), "parse");
    }
}
