#![doc = include_str!("../README.md")]

mod client;
mod config;
mod profile;
mod runner;
mod stats;

use clap::Parser;
use config::{CliArgs, LoadTestConfig};
use std::time::Instant;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = LoadTestConfig::try_from(args)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_target(false)
        .init();

    tracing::info!(
        host = %config.endpoint.uri(),
        users = config.users,
        spawn_interval = ?config.spawn_interval,
        run_time = ?config.run_time,
        "Starting load test"
    );

    let cancel = CancellationToken::new();
    let stopper = tokio::spawn(stop_after(config.run_time, cancel.clone()));

    let (sink, collector) = stats::spawn_collector(EVENT_BUFFER);
    let started = Instant::now();
    runner::run_users(&config, sink, cancel.clone()).await;
    cancel.cancel();
    stopper.abort();

    let stats = collector.await?;
    tracing::info!(elapsed = ?started.elapsed(), "Load test finished");
    println!("{stats}");
    Ok(())
}

async fn stop_after(run_time: std::time::Duration, cancel: CancellationToken) {
    tokio::select! {
        () = tokio::time::sleep(run_time) => {
            tracing::info!("Run time elapsed, stopping users");
        }
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            tracing::info!("Received Ctrl+C signal, stopping users");
        }
    }
    cancel.cancel();
}
