//! The bidirectional tunnel relay shared by both peers (spec §4.5),
//! generalized from the teacher's one-shot `tunnel()` helper in
//! `demos/http_proxy.rs` (a `try_join` of two directional copies) into a
//! reusable routine driven by `tokio::select!` against frames rather than a
//! second raw socket.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::Result;
use crate::frame::{Frame, FrameKind, TUNNEL_CHUNK_LEN};
use crate::link::{LinkReader, LinkWriter};

/// Runs the tunnel pump over `local` (the ship's client socket, or the
/// shore's dialed target socket) until local EOF/error or a `Close` frame is
/// observed from the link. Sends exactly one `Close` frame before returning,
/// even if one was already received.
pub async fn run<L>(mut local: L, writer: &LinkWriter, reader: &mut LinkReader) -> Result<()>
where
    L: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; TUNNEL_CHUNK_LEN];

    let result = loop {
        tokio::select! {
            read = local.read(&mut buf) => {
                match read {
                    Ok(0) => break Ok(()),
                    Ok(n) => {
                        if let Err(e) = writer.send(Frame::new(FrameKind::Data, Bytes::copy_from_slice(&buf[..n]))).await {
                            break Err(e);
                        }
                    }
                    Err(e) => break Err(e.into()),
                }
            }
            frame = reader.recv() => {
                match frame {
                    Ok(Some(Frame { kind: FrameKind::Data, payload })) => {
                        if let Err(e) = local.write_all(&payload).await {
                            break Err(e.into());
                        }
                    }
                    Ok(Some(Frame { kind: FrameKind::Close, .. })) | Ok(None) => break Ok(()),
                    Ok(Some(_)) => break Err(crate::error::Error::unexpected_frame()),
                    Err(e) => break Err(e),
                }
            }
        }
    };

    // Always signal close and release the local socket, even on error, so
    // the peer observes exactly one `Close` and doesn't wait on a half-open
    // tunnel forever.
    debug!(?result, "tunnel pump ending");
    let _ = writer.send(Frame::empty(FrameKind::Close)).await;
    let _ = local.shutdown().await;
    result
}
