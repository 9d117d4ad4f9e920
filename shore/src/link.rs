//! Accepts the ship's framed-link connection (spec §4.3). Only one ship is
//! ever active: a new accept preempts whatever dispatcher is currently
//! running, tearing down its in-flight tunnel state along with it.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatcher;

pub async fn run(listener: TcpListener, config: Arc<Config>) {
    let mut current: Option<tokio::task::JoinHandle<()>> = None;

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };

        if let Some(previous) = current.take() {
            info!(peer = %peer_addr, "new ship connected, replacing previous link");
            previous.abort();
        } else {
            info!(peer = %peer_addr, "ship connected");
        }

        let (writer, reader) = linkproto::from_stream(stream, config.max_frame_size);
        let config = Arc::clone(&config);
        current = Some(tokio::spawn(async move {
            dispatcher::run(writer, reader, config).await;
            info!(peer = %peer_addr, "dispatcher ended");
        }));
    }
}
