//! Crawler entry point: wires configuration, proxy pool, HTTP client,
//! identifier frontier, record assembler, and worker dispatcher together,
//! then runs until a shutdown signal is received.

use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod assembler;
mod config;
mod dispatcher;
mod error;
mod http;
mod idpool;
mod models;
mod proxy;
mod sink;

use assembler::RecordAssembler;
use config::Config;
use dispatcher::Dispatcher;
use http::HttpClient;
use idpool::{IdPool, IdPoolScavengerHandle};
use proxy::{ProxyPoolHandle, ProxySource};
use sink::Sink;

#[tokio::main]
async fn main() -> error::Result<()> {
    let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "production".into());
    let config = Config::load(&environment)?;

    init_tracing(&config.log);
    info!("starting crawler");

    let id_pool = Arc::new(IdPool::new());
    if let Err(err) = id_pool.load(&config.spider_config.mid_pool_snapshot_path) {
        info!(error = %err, "no existing id pool snapshot loaded, starting fresh");
    }

    let seeds: Vec<i64> = std::env::args().skip(1).filter_map(|arg| arg.parse().ok()).collect();
    if !seeds.is_empty() {
        info!(count = seeds.len(), "offering seed identifiers");
        id_pool.offer(seeds);
    }

    let http_client = Arc::new(HttpClient::new(&config.http_client)?);

    let proxy_handle = if config.proxy_pool.enable {
        let source = ProxySource::from_config(&config.proxy_pool)?;
        Some(ProxyPoolHandle::spawn(source))
    } else {
        None
    };
    let proxy_pool = proxy_handle.as_ref().map(|h| h.pool());

    let assembler = Arc::new(RecordAssembler::new(
        http_client.clone(),
        proxy_pool,
        &config.spider_filter,
    ));
    let sink = Arc::new(Sink::open(&config.spider_config.save_path)?);

    let dispatcher = Arc::new(Dispatcher::new(id_pool.clone(), assembler, sink));
    let workers = dispatcher.spawn_workers(config.spider_config.parallel_co_tasks);
    info!(workers = workers.len(), "dispatcher workers started");

    let scavenger = IdPoolScavengerHandle::spawn(id_pool.clone());

    shutdown_signal().await;
    info!("shutdown signal received");

    for worker in workers {
        worker.abort();
    }
    scavenger.stop();
    if let Some(handle) = proxy_handle {
        handle.stop();
    }

    id_pool.dump(&config.spider_config.mid_pool_snapshot_path)?;
    info!("id pool snapshot saved, crawler stopped");

    Ok(())
}

fn init_tracing(cfg: &config::LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("finch_crawl={}", cfg.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if cfg.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
