//! The ship's view of the shared link: a demand-driven connect loop with
//! exponential backoff, owned entirely by the worker task (spec §4.3/§9 —
//! "model it as a single owned resource with an explicit reconnect state
//! machine, not as a global variable").

use std::time::Duration;

use linkproto::backoff::Backoff;
use linkproto::{LinkReader, LinkWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{info, warn};

/// Connection state of the shared link, published for observability and
/// tests via a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct Link {
    offshore_addr: String,
    max_frame_len: u32,
    backoff: Backoff,
    current: Option<(LinkWriter, LinkReader)>,
    state_tx: watch::Sender<LinkState>,
}

impl Link {
    pub fn new(offshore_addr: String, max_frame_len: u32, backoff_cap: Duration) -> (Self, watch::Receiver<LinkState>) {
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let link = Link {
            offshore_addr,
            max_frame_len,
            backoff: Backoff::new(Duration::from_millis(500), backoff_cap),
            current: None,
            state_tx,
        };
        (link, state_rx)
    }

    /// Drops the current connection (e.g. after an I/O error mid-exchange),
    /// so the next call to `ensure_connected` redials.
    pub fn drop_current(&mut self) {
        if self.current.take().is_some() {
            let _ = self.state_tx.send(LinkState::Disconnected);
        }
    }

    /// Returns the current writer/reader pair, connecting (and retrying with
    /// backoff) if necessary. Blocks while backoff is active — the queue
    /// keeps accepting new exchanges during this time, it just doesn't drain.
    pub async fn ensure_connected(&mut self) -> (&LinkWriter, &mut LinkReader) {
        if self.current.is_none() {
            let _ = self.state_tx.send(LinkState::Connecting);
            loop {
                match TcpStream::connect(&self.offshore_addr).await {
                    Ok(stream) => {
                        info!(addr = %self.offshore_addr, "connected to shore");
                        self.current = Some(linkproto::from_stream(stream, self.max_frame_len));
                        self.backoff.reset();
                        let _ = self.state_tx.send(LinkState::Connected);
                        break;
                    }
                    Err(err) => {
                        let delay = self.backoff.next_delay();
                        warn!(addr = %self.offshore_addr, error = %err, delay_ms = delay.as_millis() as u64, "reconnect failed, backing off");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        let (writer, reader) = self.current.as_mut().expect("just connected");
        (writer, reader)
    }
}
