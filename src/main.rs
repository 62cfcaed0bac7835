use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use probewatch::client::ApiClient;
use probewatch::config::{self, Config};
use probewatch::probe::{ProbeCache, ProbeResolver};
use probewatch::protocols;
use probewatch::server::{self, AppState};
use probewatch::strategy::{RequestStrategy, Strategy, StreamingStrategy};
use probewatch::telemetry;

#[derive(Parser)]
#[command(
    name = "probewatch",
    version,
    about = "Metrics exporter for a distributed network-measurement probe mesh"
)]
struct Cli {
    /// Address on which to expose metrics and the web interface.
    #[arg(long, default_value = "127.0.0.1:9400")]
    listen_address: SocketAddr,

    /// Base URL of the probe-mesh API.
    #[arg(long)]
    api_base_url: String,

    /// Path to the configuration file.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Probe cache entry lifetime in seconds.
    #[arg(long, default_value_t = 3600)]
    cache_ttl: u64,

    /// Interval between cache cleanup runs in seconds.
    #[arg(long, default_value_t = 300)]
    cache_cleanup: u64,

    /// Number of concurrent probe metadata requests.
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Use the streaming API instead of on-demand requests.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    streaming: bool,

    /// Default idle timeout for streaming subscriptions in seconds.
    #[arg(long, default_value_t = 300)]
    stream_timeout: u64,

    /// Timeout for one scrape in seconds.
    #[arg(long, default_value_t = 60)]
    scrape_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing();

    let cfg = match &cli.config_file {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    let cfg = Arc::new(cfg);

    let client = Arc::new(ApiClient::new(&cli.api_base_url)?);
    let cache = Arc::new(ProbeCache::new(Duration::from_secs(cli.cache_ttl)));
    let resolver = Arc::new(ProbeResolver::new(
        cache.clone(),
        client.clone(),
        cli.workers,
    ));
    let registry = Arc::new(protocols::default_registry());

    let cancel = CancellationToken::new();
    spawn_cache_sweeper(cache, Duration::from_secs(cli.cache_cleanup), cancel.clone());

    let strategy: Arc<dyn Strategy> = if cli.streaming {
        Arc::new(StreamingStrategy::new(
            &cancel,
            cfg.clone(),
            client,
            resolver,
            registry,
            Duration::from_secs(cli.stream_timeout),
        ))
    } else {
        Arc::new(RequestStrategy::new(client, resolver, registry, cfg.clone()))
    };

    let state = AppState {
        strategy,
        cfg,
        scrape_timeout: Duration::from_secs(cli.scrape_timeout),
    };

    let listener = TcpListener::bind(cli.listen_address)
        .await
        .with_context(|| format!("could not bind {}", cli.listen_address))?;
    info!(addr = %cli.listen_address, "listening for scrapes on /metrics");

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    Ok(())
}

fn spawn_cache_sweeper(cache: Arc<ProbeCache>, interval: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately, skip it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    let removed = cache.sweep();
                    info!(removed, "cleaned up probe cache");
                }
            }
        }
    });
}

async fn shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("could not install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutting down");
    cancel.cancel();
}
