//! End-to-end tests driving the ship binary's internals against a stub shore
//! peer built directly from `linkproto`, the way the teacher's own
//! `tests/server.rs` drives a real client against a hand-rolled stub server
//! instead of a live host.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use linkproto::{Frame, FrameKind};
use ship::link::Link;

async fn spawn_ship(offshore_addr: String) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (link, _state_rx) = Link::new(offshore_addr, linkproto::DEFAULT_MAX_FRAME_LEN, Duration::from_secs(1));
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();

    tokio::spawn(ship::frontend::run(listener, queue_tx));
    tokio::spawn(ship::worker::run(queue_rx, link));

    addr
}

#[tokio::test]
async fn plain_get_round_trips_through_the_link() {
    let shore_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shore_addr = shore_listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = shore_listener.accept().await.unwrap();
        let (writer, mut reader) = linkproto::from_stream(stream, linkproto::DEFAULT_MAX_FRAME_LEN);
        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame.kind, FrameKind::Request);
        assert!(String::from_utf8_lossy(&frame.payload).starts_with("GET /hello"));

        let body = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        writer
            .send(Frame::new(FrameKind::Response, bytes::Bytes::from_static(body)))
            .await
            .unwrap();
    });

    let ship_addr = spawn_ship(shore_addr.to_string()).await;

    let mut client = TcpStream::connect(ship_addr).await.unwrap();
    client
        .write_all(b"GET /hello HTTP/1.1\r\nHost: example.invalid\r\n\r\n")
        .await
        .unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn sequential_requests_are_not_interleaved_on_the_link() {
    let shore_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shore_addr = shore_listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = shore_listener.accept().await.unwrap();
        let (writer, mut reader) = linkproto::from_stream(stream, linkproto::DEFAULT_MAX_FRAME_LEN);
        for _ in 0..2 {
            let frame = reader.recv().await.unwrap().unwrap();
            assert_eq!(frame.kind, FrameKind::Request);
            let body = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
            writer
                .send(Frame::new(FrameKind::Response, bytes::Bytes::from_static(body)))
                .await
                .unwrap();
        }
    });

    let ship_addr = spawn_ship(shore_addr.to_string()).await;

    for _ in 0..2 {
        let mut client = TcpStream::connect(ship_addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: example.invalid\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 200 OK"));
    }
}

#[tokio::test]
async fn connect_tunnel_echoes_bytes_through_the_link() {
    let shore_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shore_addr = shore_listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = shore_listener.accept().await.unwrap();
        let (writer, mut reader) = linkproto::from_stream(stream, linkproto::DEFAULT_MAX_FRAME_LEN);
        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame.kind, FrameKind::ConnectOpen);
        assert_eq!(&frame.payload[..], b"example.invalid:443");

        writer.send(Frame::empty(FrameKind::ConnectOk)).await.unwrap();

        // Echo whatever Data the ship sends back to it.
        loop {
            match reader.recv().await.unwrap() {
                Some(Frame { kind: FrameKind::Data, payload }) => {
                    writer.send(Frame::new(FrameKind::Data, payload)).await.unwrap();
                }
                Some(Frame { kind: FrameKind::Close, .. }) | None => break,
                _ => break,
            }
        }
    });

    let ship_addr = spawn_ship(shore_addr.to_string()).await;

    let mut client = TcpStream::connect(ship_addr).await.unwrap();
    client
        .write_all(b"CONNECT example.invalid:443 HTTP/1.1\r\nHost: example.invalid:443\r\n\r\n")
        .await
        .unwrap();

    let mut established = [0u8; 39];
    client.read_exact(&mut established).await.unwrap();
    assert_eq!(&established, b"HTTP/1.1 200 Connection Established\r\n\r\n");

    client.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping");
}

#[tokio::test]
async fn link_drop_forces_a_reconnect_on_the_next_exchange() {
    let shore_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let shore_addr = shore_listener.local_addr().unwrap();

    tokio::spawn(async move {
        // First connection: accept, read a Request, then drop without replying.
        let (stream, _) = shore_listener.accept().await.unwrap();
        let (_writer, mut reader) = linkproto::from_stream(stream, linkproto::DEFAULT_MAX_FRAME_LEN);
        let _ = reader.recv().await;
        drop(reader);

        // Second connection: the ship reconnects and retries.
        let (stream, _) = shore_listener.accept().await.unwrap();
        let (writer, mut reader) = linkproto::from_stream(stream, linkproto::DEFAULT_MAX_FRAME_LEN);
        let frame = reader.recv().await.unwrap().unwrap();
        assert_eq!(frame.kind, FrameKind::Request);
        let body = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        writer
            .send(Frame::new(FrameKind::Response, bytes::Bytes::from_static(body)))
            .await
            .unwrap();
    });

    let ship_addr = spawn_ship(shore_addr.to_string()).await;

    // First exchange fails because the stub never replies and then drops the
    // socket; the client just sees its connection close.
    let mut first = TcpStream::connect(ship_addr).await.unwrap();
    first.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
    let mut discard = Vec::new();
    let _ = first.read_to_end(&mut discard).await;

    // Second exchange should succeed once the worker redials.
    let mut second = TcpStream::connect(ship_addr).await.unwrap();
    second.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), second.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 200 OK"));
}
