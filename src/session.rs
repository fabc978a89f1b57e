//! Per-host transport lifecycle.
//!
//! A [`NodeSession`] is the connected half of the C3 state machine: holding
//! one is the `Connected` state, `None` in the owner is `Disconnect`. The
//! reconnect sweep rebuilds sessions outside the host lock and installs
//! them with a short write-lock swap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gateway::{ChannelGateway, RemoteFs};
use crate::transport::{Transport, TransportError, TransportSession};

/// An established session plus its file-transfer gateway.
pub struct NodeSession {
    id: String,
    session: Box<dyn TransportSession>,
    gateway: Arc<ChannelGateway>,
}

impl std::fmt::Debug for NodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSession")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl NodeSession {
    /// Opens a transport session towards `id`, enables the keepalive and
    /// opens the file-transfer subchannel.
    ///
    /// On any failure the partially built session is torn down and the
    /// caller stays in `Disconnect`; the next reconnect sweep retries.
    pub async fn connect(
        transport: &dyn Transport,
        id: &str,
        config: &Config,
    ) -> Result<Self, TransportError> {
        let session = match timeout(config.connect_timeout(), transport.connect(id)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TransportError::Unreachable(format!(
                    "{id}: connect timed out after {:?}",
                    config.connect_timeout()
                )));
            }
        };

        session.start_keepalive(config.keep_alive_interval());

        let channel = match session.open_file_transfer().await {
            Ok(channel) => channel,
            Err(err) => {
                warn!(host = id, error = %err, "subchannel open failed, closing session");
                session.close().await;
                return Err(err);
            }
        };

        info!(host = id, "session established");
        Ok(Self {
            id: id.to_string(),
            session,
            gateway: Arc::new(ChannelGateway::new(channel, config.read_deadline())),
        })
    }

    /// Verifies the file-transfer subchannel is still usable.
    pub fn is_alive(&self) -> bool {
        self.gateway.is_alive()
    }

    /// The gateway handle shared with samplers and fact readers.
    pub fn gateway(&self) -> Arc<ChannelGateway> {
        Arc::clone(&self.gateway)
    }

    /// Tears down the subchannel, then the session. Idempotent at the
    /// transport's discretion; safe to call on a dead session.
    pub async fn close(self) {
        debug!(host = %self.id, "closing session");
        self.gateway.close().await;
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFleet, fixtures};

    #[tokio::test]
    async fn connect_enables_keepalive_and_subchannel() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());

        let cfg = Config::default();
        let session = NodeSession::connect(fleet.transport().as_ref(), "a", &cfg)
            .await
            .unwrap();

        assert!(session.is_alive());
        assert_eq!(fleet.keepalive_interval("a"), Some(Duration::from_secs(1)));
        session.close().await;
    }

    #[tokio::test]
    async fn unreachable_host_stays_disconnected() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        fleet.set_reachable("a", false);

        let cfg = Config::default();
        let err = NodeSession::connect(fleet.transport().as_ref(), "a", &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }

    #[tokio::test]
    async fn subchannel_failure_closes_the_session() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());
        fleet.set_subchannel_ok("a", false);

        let cfg = Config::default();
        let err = NodeSession::connect(fleet.transport().as_ref(), "a", &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SubchannelFailed(_)));
    }

    #[tokio::test]
    async fn liveness_follows_the_channel() {
        let fleet = MockFleet::new();
        fleet.add_host("a", fixtures::typical_host());

        let cfg = Config::default();
        let session = NodeSession::connect(fleet.transport().as_ref(), "a", &cfg)
            .await
            .unwrap();
        assert!(session.is_alive());

        fleet.set_channel_alive("a", false);
        assert!(!session.is_alive());
    }
}
