use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use shore::config::Config;
use shore::link;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Arc::new(Config::parse());

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("shore: cannot bind {}: {err}", config.listen);
            std::process::exit(1);
        }
    };

    info!(listen = %config.listen, "shore starting");

    let link = tokio::spawn(link::run(listener, Arc::clone(&config)));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight link");

    link.abort();
    let _ = link.await;

    info!("shore stopped");
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
