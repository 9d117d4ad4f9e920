use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use ship::config::Config;
use ship::link::Link;
use ship::{frontend, worker};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();

    if let Err(err) = validate_offshore(&config.offshore_addr()).await {
        eprintln!("ship: cannot resolve offshore host {}: {err}", config.offshore_addr());
        std::process::exit(1);
    }

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("ship: cannot bind {}: {err}", config.listen);
            std::process::exit(1);
        }
    };

    info!(listen = %config.listen, offshore = %config.offshore_addr(), "ship starting");

    let (link, _state_rx) = Link::new(
        config.offshore_addr(),
        config.max_frame_size,
        config.reconnect_backoff_cap,
    );

    let (queue_tx, queue_rx) = mpsc::unbounded_channel();

    let frontend = tokio::spawn(frontend::run(listener, queue_tx.clone()));
    let worker = tokio::spawn(worker::run(queue_rx, link));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight work");

    frontend.abort();
    drop(queue_tx);
    let _ = worker.await;

    info!("ship stopped");
}

async fn validate_offshore(addr: &str) -> std::io::Result<()> {
    // Resolve eagerly at startup so an unresolvable offshore host is a fatal
    // configuration error (spec §6), not a surprise on the first request.
    tokio::net::lookup_host(addr).await?.next();
    Ok(())
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
