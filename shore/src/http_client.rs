//! Executes one parsed client request against the real Internet and
//! re-serializes the response verbatim onto the wire (spec §4.4), using the
//! same `hyper_util::client::legacy::Client` + `hyper-rustls` stack the pack's
//! own reverse-proxy crate uses for exactly this role.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;

use linkproto::head::{self, BodyLength};

pub struct HttpExecutor {
    inner: LegacyClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl HttpExecutor {
    pub fn new() -> Self {
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            .expect("no native root CA certificates found")
            .https_or_http()
            .enable_http1()
            .build();
        Self {
            inner: LegacyClient::builder(TokioExecutor::new()).build(https),
        }
    }

    /// Parses `raw` (request line through end of body, exactly as read off the
    /// ship's client socket), executes it, and returns the serialized
    /// response (status line + headers + body) ready to ship back verbatim.
    /// `total_timeout` bounds the whole exchange, dial through last byte.
    pub async fn execute(&self, raw: &[u8], total_timeout: Duration) -> Result<Bytes, ExecError> {
        let parsed = head::parse_request_head(raw)
            .map_err(|_| ExecError::BadGateway)?
            .ok_or(ExecError::BadGateway)?;

        let body = extract_body(raw, &parsed)?;
        let uri = resolve_uri(&parsed)?;
        let request = build_request(&parsed, uri, body)?;

        let call = self.inner.request(request);
        let response = match tokio::time::timeout(total_timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ExecError::BadGateway),
            Err(_) => return Err(ExecError::GatewayTimeout),
        };

        serialize_response(response).await
    }
}

fn extract_body(raw: &[u8], parsed: &head::RequestHead) -> Result<Bytes, ExecError> {
    let length = head::body_length(&parsed.headers).map_err(|_| ExecError::BadGateway)?;
    let body_bytes = &raw[parsed.head_len..];
    match length {
        BodyLength::Empty => Ok(Bytes::new()),
        BodyLength::Fixed(_) => Ok(Bytes::copy_from_slice(body_bytes)),
        BodyLength::Chunked => {
            let decoded = head::decode_chunked(body_bytes).map_err(|_| ExecError::BadGateway)?;
            Ok(Bytes::from(decoded))
        }
    }
}

fn resolve_uri(parsed: &head::RequestHead) -> Result<Uri, ExecError> {
    if parsed.target.starts_with("http://") || parsed.target.starts_with("https://") {
        return parsed.target.parse().map_err(|_| ExecError::BadGateway);
    }
    let host = parsed.header("host").ok_or(ExecError::BadGateway)?;
    format!("http://{host}{}", parsed.target)
        .parse()
        .map_err(|_| ExecError::BadGateway)
}

fn build_request(parsed: &head::RequestHead, uri: Uri, body: Bytes) -> Result<Request<Full<Bytes>>, ExecError> {
    let mut builder = Request::builder().method(parsed.method.as_str()).uri(uri);
    for (name, value) in &parsed.headers {
        if head::is_hop_by_hop(name) {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Full::new(body)).map_err(|_| ExecError::BadGateway)
}

async fn serialize_response<B>(response: hyper::Response<B>) -> Result<Bytes, ExecError>
where
    B: hyper::body::Body<Data = Bytes>,
{
    let (parts, body) = response.into_parts();
    let collected = body.collect().await.map_err(|_| ExecError::BadGateway)?;
    let body_bytes = collected.to_bytes();

    let mut out = Vec::with_capacity(body_bytes.len() + 256);
    out.extend_from_slice(format!("HTTP/1.1 {}\r\n", parts.status).as_bytes());
    for (name, value) in parts.headers.iter() {
        // Content-Length and Transfer-Encoding are dropped here unconditionally,
        // not just when hop-by-hop: the body above is always fully collected,
        // so the only length header that can be correct is the one computed
        // from `body_bytes.len()` below.
        if head::is_hop_by_hop(name.as_str())
            || name.as_str().eq_ignore_ascii_case("content-length")
            || name.as_str().eq_ignore_ascii_case("transfer-encoding")
        {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n", body_bytes.len()).as_bytes());
    out.extend_from_slice(b"Connection: close\r\n\r\n");
    out.extend_from_slice(&body_bytes);
    Ok(Bytes::from(out))
}

#[derive(Debug)]
pub enum ExecError {
    BadGateway,
    GatewayTimeout,
}

impl ExecError {
    pub fn into_response_bytes(self) -> Bytes {
        match self {
            ExecError::BadGateway => Bytes::from_static(
                b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            ),
            ExecError::GatewayTimeout => Bytes::from_static(
                b"HTTP/1.1 504 Gateway Timeout\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            ),
        }
    }
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::BadGateway => write!(f, "bad gateway"),
            ExecError::GatewayTimeout => write!(f, "gateway timeout"),
        }
    }
}

impl std::error::Error for ExecError {}
