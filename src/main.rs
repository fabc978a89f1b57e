//! Demo binary: drives the sampling engine against the in-memory mock
//! transport and prints per-host snapshot lines. A real deployment embeds
//! [`sshtop::Fleet`] with a secure-shell transport and a terminal view.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sshtop::mock::{MockFleet, fixtures};
use sshtop::{Config, Fleet, FleetError};

#[derive(Debug, Parser)]
#[command(name = "sshtop", about = "Remote fleet procfs monitor (mock demo)")]
struct Cli {
    /// Host identifiers to monitor.
    hosts: Vec<String>,

    /// Sampling period in milliseconds.
    #[arg(long)]
    sample_period_ms: Option<u64>,

    /// Reconnect sweep period in milliseconds.
    #[arg(long)]
    reconnect_period_ms: Option<u64>,

    /// Number of sample sweeps to run before exiting.
    #[arg(long, default_value_t = 5)]
    sweeps: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(period) = cli.sample_period_ms {
        config.sample_period_ms = period;
    }
    if let Some(period) = cli.reconnect_period_ms {
        config.reconnect_period_ms = period;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<(), FleetError> {
    let mocks = MockFleet::new();
    for id in &cli.hosts {
        mocks.add_host(id, fixtures::typical_host());
    }

    let fleet = Fleet::new(mocks.transport(), &cli.hosts, config)?;
    info!(hosts = cli.hosts.len(), "demo fleet ready");

    fleet.reconnect_now().await;
    for sweep in 0..cli.sweeps {
        // nudge the fixtures so the derived figures move
        for id in &cli.hosts {
            mocks.set_file(
                id,
                "/proc/stat",
                fixtures::stat_content(10_000 + 30 * sweep as u64, 80_000 + 70 * sweep as u64),
            );
        }
        fleet.sample_now().await;
        print_snapshot(&fleet).await;
    }

    fleet.shutdown().await;
    Ok(())
}

async fn print_snapshot(fleet: &Fleet) {
    let snapshot = fleet.snapshot().await;
    for host in &snapshot.hosts {
        let state = if host.alive { "OK" } else { "NG" };
        let cpu = host
            .cpu_pct
            .map(|p| format!("{p:5.1}%"))
            .unwrap_or_else(|| "    -".to_string());
        let spark = host.cpu_spark.clone().unwrap_or_default();
        let mem = host
            .mem
            .map(|m| format!("{}/{}", sshtop::fmt::format_bytes(m.used), sshtop::fmt::format_bytes(m.total)))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<12} {:<2} cpu {cpu} {spark:<12} mem {mem}", host.id, state);
    }
}
