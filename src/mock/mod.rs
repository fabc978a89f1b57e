//! In-memory transport for tests and demos.
//!
//! [`MockFleet`] simulates a fleet of remote hosts behind the [`Transport`]
//! traits: every host is a scriptable bundle of procfs file contents,
//! directory listings and statvfs answers. Tests flip reachability and
//! channel liveness to exercise reconnect and clear-on-disconnect paths
//! without a network.

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{
    ChannelError, FileChannel, FsUsage, Transport, TransportError, TransportSession,
};

/// Scriptable content of one mock host.
#[derive(Debug, Clone, Default)]
pub struct HostFixture {
    /// Path → file content.
    pub files: HashMap<String, String>,
    /// Directory path → entry names.
    pub dirs: HashMap<String, Vec<String>>,
    /// Mountpoint → statvfs answer.
    pub statfs: HashMap<String, FsUsage>,
}

impl HostFixture {
    pub fn file(mut self, path: &str, content: impl Into<String>) -> Self {
        self.files.insert(path.to_string(), content.into());
        self
    }

    pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        self.dirs
            .insert(path.to_string(), entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn mount_usage(mut self, path: &str, total: u64, used: u64, free: u64) -> Self {
        self.statfs
            .insert(path.to_string(), FsUsage { total, used, free });
        self
    }
}

#[derive(Debug)]
struct HostState {
    fixture: HostFixture,
    reachable: bool,
    auth_ok: bool,
    subchannel_ok: bool,
    channel_alive: bool,
    keepalive: Option<Duration>,
    connect_count: u64,
}

impl HostState {
    fn new(fixture: HostFixture) -> Self {
        Self {
            fixture,
            reachable: true,
            auth_ok: true,
            subchannel_ok: true,
            channel_alive: false,
            keepalive: None,
            connect_count: 0,
        }
    }
}

type SharedHosts = Arc<Mutex<HashMap<String, HostState>>>;

/// A scriptable fleet of mock hosts. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MockFleet {
    hosts: SharedHosts,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host(&self, id: &str, fixture: HostFixture) {
        self.hosts
            .lock()
            .unwrap()
            .insert(id.to_string(), HostState::new(fixture));
    }

    /// The fleet as a transport handle for the supervisor.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(MockTransport {
            hosts: self.hosts.clone(),
        })
    }

    /// Opens a channel directly, bypassing the session handshake. Test
    /// helper for gateway-level cases.
    pub fn open_channel(&self, id: &str) -> Box<dyn FileChannel> {
        self.with_host(id, |h| h.channel_alive = true);
        Box::new(MockChannel {
            id: id.to_string(),
            hosts: self.hosts.clone(),
        })
    }

    pub fn set_file(&self, id: &str, path: &str, content: impl Into<String>) {
        let content = content.into();
        self.with_host(id, move |h| {
            h.fixture.files.insert(path.to_string(), content);
        });
    }

    pub fn remove_file(&self, id: &str, path: &str) {
        self.with_host(id, |h| {
            h.fixture.files.remove(path);
        });
    }

    /// Whether new connection attempts succeed.
    pub fn set_reachable(&self, id: &str, reachable: bool) {
        self.with_host(id, |h| h.reachable = reachable);
    }

    pub fn set_auth_ok(&self, id: &str, ok: bool) {
        self.with_host(id, |h| h.auth_ok = ok);
    }

    pub fn set_subchannel_ok(&self, id: &str, ok: bool) {
        self.with_host(id, |h| h.subchannel_ok = ok);
    }

    /// Whether the currently open channel still answers the liveness probe.
    pub fn set_channel_alive(&self, id: &str, alive: bool) {
        self.with_host(id, |h| h.channel_alive = alive);
    }

    /// Drops the host's transport: the open channel dies and reconnects
    /// fail until `set_reachable(id, true)`.
    pub fn kill_host(&self, id: &str) {
        self.with_host(id, |h| {
            h.channel_alive = false;
            h.reachable = false;
        });
    }

    pub fn keepalive_interval(&self, id: &str) -> Option<Duration> {
        self.hosts.lock().unwrap().get(id).and_then(|h| h.keepalive)
    }

    pub fn connect_count(&self, id: &str) -> u64 {
        self.hosts
            .lock()
            .unwrap()
            .get(id)
            .map(|h| h.connect_count)
            .unwrap_or(0)
    }

    fn with_host(&self, id: &str, f: impl FnOnce(&mut HostState)) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(host) = hosts.get_mut(id) {
            f(host);
        }
    }
}

struct MockTransport {
    hosts: SharedHosts,
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, id: &str) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut hosts = self.hosts.lock().unwrap();
        let Some(host) = hosts.get_mut(id) else {
            return Err(TransportError::Unreachable(format!("unknown host {id}")));
        };
        if !host.reachable {
            return Err(TransportError::Unreachable(format!("{id} is down")));
        }
        if !host.auth_ok {
            return Err(TransportError::AuthFailed(format!("{id} rejected key")));
        }
        host.connect_count += 1;

        Ok(Box::new(MockSession {
            id: id.to_string(),
            hosts: self.hosts.clone(),
        }))
    }
}

struct MockSession {
    id: String,
    hosts: SharedHosts,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn open_file_transfer(&self) -> Result<Box<dyn FileChannel>, TransportError> {
        let mut hosts = self.hosts.lock().unwrap();
        let Some(host) = hosts.get_mut(&self.id) else {
            return Err(TransportError::SubchannelFailed("host vanished".into()));
        };
        if !host.subchannel_ok {
            return Err(TransportError::SubchannelFailed(format!(
                "{} refused subsystem",
                self.id
            )));
        }
        host.channel_alive = true;

        Ok(Box::new(MockChannel {
            id: self.id.clone(),
            hosts: self.hosts.clone(),
        }))
    }

    fn start_keepalive(&self, interval: Duration) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(host) = hosts.get_mut(&self.id) {
            host.keepalive = Some(interval);
        }
    }

    async fn close(&self) {}
}

struct MockChannel {
    id: String,
    hosts: SharedHosts,
}

impl MockChannel {
    fn with_live_host<T>(
        &self,
        f: impl FnOnce(&HostState) -> Result<T, ChannelError>,
    ) -> Result<T, ChannelError> {
        let hosts = self.hosts.lock().unwrap();
        let host = hosts.get(&self.id).ok_or(ChannelError::NotAlive)?;
        if !host.channel_alive {
            return Err(ChannelError::NotAlive);
        }
        f(host)
    }
}

#[async_trait]
impl FileChannel for MockChannel {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, ChannelError> {
        self.with_live_host(|host| {
            host.fixture
                .files
                .get(path)
                .map(|content| content.clone().into_bytes())
                .ok_or_else(|| ChannelError::NotFound(path.to_string()))
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>, ChannelError> {
        self.with_live_host(|host| {
            host.fixture
                .dirs
                .get(path)
                .cloned()
                .ok_or_else(|| ChannelError::NotFound(path.to_string()))
        })
    }

    async fn statfs(&self, path: &str) -> Result<FsUsage, ChannelError> {
        self.with_live_host(|host| {
            host.fixture
                .statfs
                .get(path)
                .copied()
                .ok_or_else(|| ChannelError::NotFound(path.to_string()))
        })
    }

    fn is_alive(&self) -> bool {
        let hosts = self.hosts.lock().unwrap();
        hosts
            .get(&self.id)
            .map(|h| h.channel_alive)
            .unwrap_or(false)
    }

    async fn close(&self) {
        let mut hosts = self.hosts.lock().unwrap();
        if let Some(host) = hosts.get_mut(&self.id) {
            host.channel_alive = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_and_read() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());

        let transport = fleet.transport();
        let session = transport.connect("a").await.unwrap();
        session.start_keepalive(Duration::from_secs(1));
        let channel = session.open_file_transfer().await.unwrap();

        assert!(channel.is_alive());
        assert!(channel.read_file("/proc/stat").await.is_ok());
        assert_eq!(fleet.keepalive_interval("a"), Some(Duration::from_secs(1)));
        assert_eq!(fleet.connect_count("a"), 1);
    }

    #[tokio::test]
    async fn unreachable_and_auth_failures() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());

        fleet.set_reachable("a", false);
        let transport = fleet.transport();
        assert!(matches!(
            transport.connect("a").await.err(),
            Some(TransportError::Unreachable(_))
        ));

        fleet.set_reachable("a", true);
        fleet.set_auth_ok("a", false);
        assert!(matches!(
            transport.connect("a").await.err(),
            Some(TransportError::AuthFailed(_))
        ));

        assert!(matches!(
            transport.connect("ghost").await.err(),
            Some(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn killed_channel_reports_not_alive() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        let channel = fleet.open_channel("a");

        fleet.kill_host("a");
        assert!(!channel.is_alive());
        assert_eq!(
            channel.read_file("/proc/stat").await,
            Err(ChannelError::NotAlive)
        );
    }
}
