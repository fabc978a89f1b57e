//! Fleet supervision.
//!
//! The supervisor owns the host set, spawns one sampler task per host plus
//! one global reconnect sweep, and hands consistent snapshots to the view.
//! Hosts are resolved by identifier; nothing holds a reference back into
//! the supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::Config;
use crate::sampler::{self, Host};
use crate::snapshot::{self, FleetSnapshot};
use crate::transport::Transport;

/// Render sink of the external view collaborator.
pub trait View: Send + Sync {
    /// Called after a full sample sweep, at most once per sample period.
    fn redraw(&self);
}

/// Process-level bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    /// The host set was empty: nothing to monitor.
    NoHosts,
}

impl std::fmt::Display for FleetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHosts => write!(f, "no hosts to monitor"),
        }
    }
}

impl std::error::Error for FleetError {}

#[derive(Debug, Default)]
struct UiState {
    top_panel: bool,
    selected: Option<String>,
}

struct FleetInner {
    config: Config,
    hosts: RwLock<Vec<Arc<Host>>>,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    view: Mutex<Option<Arc<dyn View>>>,
    ui: Mutex<UiState>,
}

/// Supervisor over the monitored host set.
#[derive(Clone)]
pub struct Fleet {
    inner: Arc<FleetInner>,
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet").finish_non_exhaustive()
    }
}

impl Fleet {
    /// Builds the fleet. An empty host set is a startup error.
    pub fn new(
        transport: Arc<dyn Transport>,
        host_ids: &[String],
        config: Config,
    ) -> Result<Self, FleetError> {
        if host_ids.is_empty() {
            return Err(FleetError::NoHosts);
        }

        let hosts = host_ids
            .iter()
            .map(|id| Arc::new(Host::new(id.trim(), Arc::clone(&transport), config.clone())))
            .collect();

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(FleetInner {
                config,
                hosts: RwLock::new(hosts),
                started: AtomicBool::new(false),
                shutdown,
                tasks: Mutex::new(Vec::new()),
                view: Mutex::new(None),
                ui: Mutex::new(UiState::default()),
            }),
        })
    }

    /// Registers the view whose `redraw` fires after sample sweeps.
    pub fn set_view(&self, view: Arc<dyn View>) {
        *self.inner.view.lock().unwrap() = Some(view);
    }

    /// Spawns the background tasks: one sampler per host, the reconnect
    /// sweep, and the redraw ticker. Idempotent; later calls are no-ops.
    pub async fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("fleet already started");
            return;
        }

        let hosts = self.inner.hosts.read().await.clone();
        info!(hosts = hosts.len(), "starting fleet supervision");

        let mut tasks = Vec::with_capacity(hosts.len() + 2);
        for host in &hosts {
            tasks.push(spawn_sampler(Arc::clone(&self.inner), Arc::clone(host)));
        }
        tasks.push(spawn_reconnect(Arc::clone(&self.inner)));
        tasks.push(spawn_redraw(Arc::clone(&self.inner)));

        self.inner.tasks.lock().unwrap().extend(tasks);
    }

    /// Consistent per-host view of the fleet. Values are copies.
    pub async fn snapshot(&self) -> FleetSnapshot {
        let hosts = self.inner.hosts.read().await.clone();

        let mut snapshot = FleetSnapshot::default();
        for host in &hosts {
            snapshot.hosts.push(snapshot::host_snapshot(host).await);
        }
        snapshot
    }

    /// Resolves a host by identifier.
    pub async fn get(&self, id: &str) -> Option<Arc<Host>> {
        let id = id.trim();
        let hosts = self.inner.hosts.read().await;
        hosts.iter().find(|h| h.id() == id).cloned()
    }

    /// Runs one sampling pass over every host in parallel, then triggers a
    /// redraw. The background sampler tasks drive the same path; this is
    /// the manual handle for embedders and tests.
    pub async fn sample_now(&self) {
        let hosts = self.inner.hosts.read().await.clone();

        let mut sweep = JoinSet::new();
        for host in hosts {
            sweep.spawn(async move { sampler::sample_host(&host).await });
        }
        while sweep.join_next().await.is_some() {}

        redraw(&self.inner);
    }

    /// Attempts to reconnect every host whose probe fails, in parallel.
    pub async fn reconnect_now(&self) {
        reconnect_sweep(&self.inner).await;
    }

    // -- input sink ---------------------------------------------------------

    pub fn toggle_top_panel(&self) {
        let mut ui = self.inner.ui.lock().unwrap();
        ui.top_panel = !ui.top_panel;
    }

    pub fn top_panel_enabled(&self) -> bool {
        self.inner.ui.lock().unwrap().top_panel
    }

    pub fn select_host(&self, id: &str) {
        let mut ui = self.inner.ui.lock().unwrap();
        ui.selected = Some(id.trim().to_string());
    }

    pub fn selected_host(&self) -> Option<String> {
        self.inner.ui.lock().unwrap().selected.clone()
    }

    // -- teardown -----------------------------------------------------------

    /// Signals every task, waits for them to exit, then tears down all
    /// sessions. Late reconnect results are discarded with the sessions.
    pub async fn shutdown(&self) {
        info!("fleet shutdown");
        let _ = self.inner.shutdown.send(true);

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.tasks.lock().unwrap());
        for task in tasks {
            let _ = task.await;
        }

        let hosts = self.inner.hosts.read().await.clone();
        for host in hosts {
            host.disconnect().await;
        }
        self.inner.started.store(false, Ordering::SeqCst);
    }
}

fn redraw(inner: &FleetInner) {
    let view = inner.view.lock().unwrap().clone();
    if let Some(view) = view {
        view.redraw();
    }
}

async fn reconnect_sweep(inner: &FleetInner) {
    let hosts = inner.hosts.read().await.clone();

    let mut sweep = JoinSet::new();
    for host in hosts {
        sweep.spawn(async move {
            if !host.is_alive().await {
                host.reconnect().await;
            }
        });
    }
    while sweep.join_next().await.is_some() {}
}

fn spawn_sampler(inner: Arc<FleetInner>, host: Arc<Host>) -> JoinHandle<()> {
    let mut shutdown = inner.shutdown.subscribe();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(inner.config.sample_period());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => sampler::sample_host(&host).await,
            }
        }
        debug!(host = host.id(), "sampler task exited");
    })
}

fn spawn_reconnect(inner: Arc<FleetInner>) -> JoinHandle<()> {
    let mut shutdown = inner.shutdown.subscribe();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(inner.config.reconnect_period());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => reconnect_sweep(&inner).await,
            }
        }
        debug!("reconnect task exited");
    })
}

fn spawn_redraw(inner: Arc<FleetInner>) -> JoinHandle<()> {
    let mut shutdown = inner.shutdown.subscribe();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(inner.config.sample_period());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => redraw(&inner),
            }
        }
    })
}
