//! Accepts client connections and turns each into an [`Exchange`] on the
//! worker queue (spec §4.1).

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, instrument, warn};

use linkproto::head::{self, BodyLength};

use crate::exchange::{Exchange, ExchangeKind};

pub async fn run(listener: TcpListener, queue: mpsc::UnboundedSender<Exchange>) {
    loop {
        let (client, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };

        let queue = queue.clone();
        tokio::spawn(async move {
            handle_connection(client, peer_addr, queue).await;
        });
    }
}

#[instrument(skip(client, queue), fields(peer = %peer_addr))]
async fn handle_connection(
    mut client: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    queue: mpsc::UnboundedSender<Exchange>,
) {
    let mut buf = Vec::new();
    let head_len = match head::read_head(&mut client, &mut buf).await {
        Ok(len) => len,
        Err(_) => {
            // Malformed request line/headers: close with no enqueue, per spec §4.1.
            return;
        }
    };

    let parsed = match head::parse_request_head(&buf[..head_len]) {
        Ok(Some(head)) => head,
        _ => return,
    };

    let kind = if parsed.method.eq_ignore_ascii_case("CONNECT") {
        ExchangeKind::Tunnel {
            target: parsed.target.clone(),
        }
    } else {
        let length = match head::body_length(&parsed.headers) {
            Ok(length) => length,
            Err(_) => return,
        };
        if let BodyLength::Fixed(_) | BodyLength::Chunked = length {
            if head::read_body(&mut client, length, &mut buf).await.is_err() {
                return;
            }
        }
        ExchangeKind::Http { raw: buf }
    };

    let (done_tx, done_rx) = oneshot::channel();
    info!(method = %parsed.method, target = %parsed.target, "enqueuing exchange");
    let exchange = Exchange {
        client,
        peer_addr,
        kind,
        done: done_tx,
    };

    if queue.send(exchange).is_err() {
        // Worker is gone (shutting down); nothing left to do.
        return;
    }

    // Block until the worker has finished writing to this socket — we must
    // not read another request off it, since the worker owns it exclusively
    // for the duration (spec §4.1). We never recycle the socket afterward
    // (§9 keep-alive policy: always close).
    let _ = done_rx.await;
}
