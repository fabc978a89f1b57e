//! Gateway over a transport file channel.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::transport::{ChannelError, FileChannel, FsUsage};

use super::{GatewayError, RemoteFs, filter_pid_names};

/// [`RemoteFs`] backed by one host's file-transfer subchannel.
///
/// The mutex makes this the single serialization point for the channel:
/// samplers and fact readers issue operations concurrently, the channel sees
/// them one at a time. Every operation is bounded by `deadline` so a stuck
/// host cannot hold its sampler past the tick.
pub struct ChannelGateway {
    channel: Mutex<Box<dyn FileChannel>>,
    deadline: Duration,
}

impl ChannelGateway {
    pub fn new(channel: Box<dyn FileChannel>, deadline: Duration) -> Self {
        Self {
            channel: Mutex::new(channel),
            deadline,
        }
    }

    fn deadline_error(&self) -> GatewayError {
        GatewayError::Io(format!("deadline of {:?} exceeded", self.deadline))
    }

    fn lift<T>(
        &self,
        result: Result<Result<T, ChannelError>, tokio::time::error::Elapsed>,
    ) -> Result<T, GatewayError> {
        match result {
            Ok(inner) => inner.map_err(GatewayError::from),
            Err(_) => Err(self.deadline_error()),
        }
    }

    /// Closes the underlying channel.
    pub async fn close(&self) {
        let channel = self.channel.lock().await;
        channel.close().await;
    }
}

#[async_trait]
impl RemoteFs for ChannelGateway {
    async fn read_all(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        let channel = self.channel.lock().await;
        self.lift(timeout(self.deadline, channel.read_file(path)).await)
    }

    async fn list_pid_dirs(&self, proc_root: &str) -> Result<Vec<String>, GatewayError> {
        let channel = self.channel.lock().await;
        let entries = self.lift(timeout(self.deadline, channel.list_dir(proc_root)).await)?;
        Ok(filter_pid_names(entries))
    }

    async fn stat_mount_point(&self, path: &str) -> Result<FsUsage, GatewayError> {
        let channel = self.channel.lock().await;
        self.lift(timeout(self.deadline, channel.statfs(path)).await)
    }

    fn is_alive(&self) -> bool {
        // Non-blocking probe. A held lock means a read is in flight on the
        // channel, which is as alive as a probe can prove.
        match self.channel.try_lock() {
            Ok(channel) => channel.is_alive(),
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFleet, fixtures};

    #[tokio::test]
    async fn reads_and_lists_through_the_channel() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let gateway = ChannelGateway::new(fleet.open_channel("a"), Duration::from_secs(2));

        let bytes = gateway.read_all("/proc/loadavg").await.unwrap();
        assert!(!bytes.is_empty());

        let pids = gateway.list_pid_dirs("/proc").await.unwrap();
        assert!(!pids.is_empty());
        assert!(pids.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())));

        assert!(gateway.is_alive());
    }

    #[tokio::test]
    async fn missing_path_maps_to_not_found() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let gateway = ChannelGateway::new(fleet.open_channel("a"), Duration::from_secs(2));

        match gateway.read_all("/proc/nope").await {
            Err(GatewayError::NotFound(path)) => assert_eq!(path, "/proc/nope"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dead_channel_maps_to_not_alive() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let gateway = ChannelGateway::new(fleet.open_channel("a"), Duration::from_secs(2));

        fleet.set_channel_alive("a", false);
        assert!(!gateway.is_alive());
        assert_eq!(
            gateway.read_all("/proc/loadavg").await,
            Err(GatewayError::NotAlive)
        );
    }
}
