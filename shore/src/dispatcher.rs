//! Reads frames off the link and executes them against the real Internet
//! (spec §4.4). A small state machine so "only one mode at a time" (§4.5) is
//! structural: `Idle` dispatches one frame at a time, `ConnectOpen` hands the
//! reader to the shared tunnel pump until the tunnel ends.

use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpStream;
use tracing::{error, info, instrument, warn};

use linkproto::{Frame, FrameKind, LinkReader, LinkWriter};

use crate::config::Config;
use crate::http_client::HttpExecutor;

const BAD_GATEWAY: &[u8] = b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

pub async fn run(writer: LinkWriter, mut reader: LinkReader, config: Arc<Config>) {
    let executor = HttpExecutor::new();

    loop {
        let frame = match reader.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("link closed by ship");
                return;
            }
            Err(err) => {
                warn!(error = %err, "link read error");
                return;
            }
        };

        match frame {
            Frame { kind: FrameKind::Request, payload } => {
                handle_request(&writer, &executor, &config, payload).await;
            }
            Frame { kind: FrameKind::ConnectOpen, payload } => {
                if let Some(mut target) = handle_connect_open(&writer, &config, &payload).await {
                    if let Err(err) = linkproto::pump::run(&mut target, &writer, &mut reader).await {
                        error!(error = %err, "tunnel pump failed");
                        return;
                    }
                }
            }
            _ => {
                warn!("unexpected frame in idle mode, closing link");
                return;
            }
        }
    }
}

#[instrument(skip(writer, executor, config, raw))]
async fn handle_request(writer: &LinkWriter, executor: &HttpExecutor, config: &Config, raw: Bytes) {
    let response = executor.execute(&raw, config.upstream_timeout).await;
    let payload = match response {
        Ok(bytes) if bytes.len() as u32 > config.max_frame_size => {
            warn!(len = bytes.len(), "response exceeds max frame size, synthesizing 502");
            Bytes::from_static(BAD_GATEWAY)
        }
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "upstream request failed");
            err.into_response_bytes()
        }
    };

    if let Err(err) = writer.send(Frame::new(FrameKind::Response, payload)).await {
        error!(error = %err, "failed to send response frame");
    }
}

#[instrument(skip(writer, config))]
async fn handle_connect_open(writer: &LinkWriter, config: &Config, target: &[u8]) -> Option<TcpStream> {
    let target = String::from_utf8_lossy(target).into_owned();
    let dialed = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&target)).await;

    match dialed {
        Ok(Ok(stream)) => {
            if writer.send(Frame::empty(FrameKind::ConnectOk)).await.is_err() {
                return None;
            }
            info!(target = %target, "tunnel established");
            Some(stream)
        }
        Ok(Err(err)) => {
            warn!(target = %target, error = %err, "tunnel dial failed");
            let _ = writer.send(Frame::empty(FrameKind::ConnectFail)).await;
            None
        }
        Err(_) => {
            warn!(target = %target, "tunnel dial timed out");
            let _ = writer.send(Frame::empty(FrameKind::ConnectFail)).await;
            None
        }
    }
}
