//! The single worker that drains the queue and owns the shared link (spec
//! §4.2). Processes exactly one [`Exchange`] at a time.

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use linkproto::{Frame, FrameKind};

use crate::exchange::{Exchange, ExchangeKind};
use crate::link::Link;

const BAD_GATEWAY: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

pub async fn run(mut queue: mpsc::UnboundedReceiver<Exchange>, mut link: Link) {
    while let Some(exchange) = queue.recv().await {
        let done = exchange.done;
        let peer_addr = exchange.peer_addr;
        let mut client = exchange.client;

        let result = match exchange.kind {
            ExchangeKind::Http { raw } => handle_http(&mut client, raw, &mut link).await,
            ExchangeKind::Tunnel { target } => handle_tunnel(&mut client, &target, &mut link).await,
        };

        if let Err(err) = result {
            warn!(peer = %peer_addr, error = %err, "exchange failed");
        }
        let _ = client.shutdown().await;
        let _ = done.send(());
    }
}

#[instrument(skip(client, link))]
async fn handle_http(client: &mut tokio::net::TcpStream, raw: Vec<u8>, link: &mut Link) -> anyhow::Result<()> {
    let (writer, reader) = link.ensure_connected().await;

    if let Err(err) = writer.send(Frame::new(FrameKind::Request, Bytes::from(raw))).await {
        link.drop_current();
        client.write_all(BAD_GATEWAY).await?;
        return Err(err.into());
    }

    loop {
        match reader.recv().await {
            Ok(Some(Frame { kind: FrameKind::Response, payload })) => {
                client.write_all(&payload).await?;
                info!("response delivered");
                return Ok(());
            }
            Ok(Some(_)) => {
                // Protocol violation for this mode: close the link, the
                // queued exchange itself fails before anything was written.
                link.drop_current();
                client.write_all(BAD_GATEWAY).await?;
                return Err(anyhow::anyhow!("unexpected frame while awaiting response"));
            }
            Ok(None) | Err(_) => {
                link.drop_current();
                client.write_all(BAD_GATEWAY).await?;
                return Err(anyhow::anyhow!("link closed while awaiting response"));
            }
        }
    }
}

#[instrument(skip(client, link))]
async fn handle_tunnel(client: &mut tokio::net::TcpStream, target: &str, link: &mut Link) -> anyhow::Result<()> {
    let (writer, reader) = link.ensure_connected().await;

    if let Err(err) = writer.send(Frame::new(FrameKind::ConnectOpen, Bytes::copy_from_slice(target.as_bytes()))).await {
        link.drop_current();
        client.write_all(BAD_GATEWAY).await?;
        return Err(err.into());
    }

    match reader.recv().await {
        Ok(Some(Frame { kind: FrameKind::ConnectOk, .. })) => {
            client.write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n").await?;
        }
        Ok(Some(Frame { kind: FrameKind::ConnectFail, .. })) => {
            client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await?;
            return Ok(());
        }
        Ok(Some(_)) => {
            link.drop_current();
            client.write_all(BAD_GATEWAY).await?;
            return Err(anyhow::anyhow!("unexpected frame while awaiting CONNECT reply"));
        }
        Ok(None) | Err(_) => {
            link.drop_current();
            client.write_all(BAD_GATEWAY).await?;
            return Err(anyhow::anyhow!("link closed while awaiting CONNECT reply"));
        }
    }

    let (writer, reader) = link.ensure_connected().await;
    if let Err(err) = linkproto::pump::run(&mut *client, writer, reader).await {
        link.drop_current();
        error!(error = %err, "tunnel pump failed");
        return Err(err.into());
    }
    Ok(())
}
