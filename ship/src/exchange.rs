use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::sync::oneshot;

/// One client request awaiting completion, per spec §3. Created by the front
/// end on accept+parse, destroyed after the worker writes the terminal bytes
/// to the client.
pub struct Exchange {
    pub client: TcpStream,
    pub peer_addr: SocketAddr,
    pub kind: ExchangeKind,
    /// Signalled once the worker has written terminal bytes (or closed the
    /// socket) for this exchange, so the front end's per-connection task can
    /// complete.
    pub done: oneshot::Sender<()>,
}

pub enum ExchangeKind {
    /// A plain HTTP request: the exact bytes read off the wire, request-line
    /// through end of body.
    Http { raw: Vec<u8> },
    /// A `CONNECT` tunnel request, carrying its `host:port` target.
    Tunnel { target: String },
}
