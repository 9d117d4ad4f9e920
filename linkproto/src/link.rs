//! The low-level split of one connected TCP socket into a write side guarded
//! by a single mutex and a read side owned by whichever task currently has
//! read control, per spec §4.3/§5 ("The link's write side is serialized by
//! one mutex ... The link's read side is owned by one reader task").
//!
//! Reconnection policy differs between the two peers (ship retries with
//! backoff, shore accepts one connection at a time) and lives in each binary;
//! this module only wraps an already-connected socket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

use crate::frame::{Frame, FrameCodec};

type Sink = futures_util::stream::SplitSink<Framed<TcpStream, FrameCodec>, Frame>;
type Stream = futures_util::stream::SplitStream<Framed<TcpStream, FrameCodec>>;

/// The write half of a connected link. Cloneable; every clone shares the
/// same underlying mutex, so concurrent `send` calls are serialized rather
/// than interleaved mid-frame.
#[derive(Clone)]
pub struct LinkWriter {
    sink: Arc<Mutex<Sink>>,
}

impl LinkWriter {
    /// Writes one frame to the link, waiting for any concurrent writer first.
    pub async fn send(&self, frame: Frame) -> crate::error::Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(frame).await
    }
}

/// The read half of a connected link. Not cloneable: only one task may hold
/// read control at a time, enforcing the single-reader invariant structurally.
pub struct LinkReader {
    stream: Stream,
}

impl LinkReader {
    /// Reads the next frame, or `Ok(None)` if the peer closed the socket.
    pub async fn recv(&mut self) -> crate::error::Result<Option<Frame>> {
        match self.stream.next().await {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }
}

/// Splits a freshly connected socket into a write handle and a read handle.
pub fn from_stream(stream: TcpStream, max_frame_len: u32) -> (LinkWriter, LinkReader) {
    let framed = Framed::new(stream, FrameCodec::new(max_frame_len));
    let (sink, stream) = framed.split();
    (
        LinkWriter {
            sink: Arc::new(Mutex::new(sink)),
        },
        LinkReader { stream },
    )
}
