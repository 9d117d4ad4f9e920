//! Minimal HTTP/1.1 head parsing shared by the ship front end (which only
//! needs to know where a request ends) and the shore dispatcher (which
//! reconstructs a real request from the bytes a `Request` frame carried).
//!
//! This mirrors the teacher's own split in `proto/h1/parse.rs` (httparse over
//! a byte buffer, producing a head plus a separately-determined body length)
//! without pulling in the rest of hyper's h1 state machine — headers and
//! bodies here are opaque byte strings the caller reassembles verbatim, never
//! mutated beyond hop-by-hop stripping.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{Error, Result};

const MAX_HEADERS: usize = 64;
const MAX_HEAD_LEN: usize = 64 * 1024;

/// Headers that apply only to a single transport-layer hop and must not be
/// forwarded through a proxy (spec §4.4).
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "keep-alive",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
];

/// Whether a header name is hop-by-hop and should be stripped before
/// forwarding, per spec §4.4.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// A parsed request line plus headers, with the length of the head in bytes
/// (so the caller can split head from body in the original buffer).
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: u8,
    pub headers: Vec<(String, String)>,
    pub head_len: usize,
}

impl RequestHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed status line plus headers, mirroring [`RequestHead`] for responses.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: u8,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub head_len: usize,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// How a message body's length is determined, per RFC 7230 §3.3.3 as applied
/// by the teacher's `proto/h1/parse.rs` decoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    Fixed(u64),
    Chunked,
    Empty,
}

fn headers_to_owned(raw: &[httparse::Header<'_>]) -> Vec<(String, String)> {
    raw.iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect()
}

/// Parses a request line and headers out of `buf`. Returns `None` if the
/// buffer doesn't yet contain a complete head (caller should read more).
pub fn parse_request_head(buf: &[u8]) -> Result<Option<RequestHead>> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut header_storage);
    match req.parse(buf).map_err(|_| Error::malformed_head())? {
        httparse::Status::Complete(head_len) => {
            let method = req.method.ok_or_else(Error::malformed_head)?.to_string();
            let target = req.path.ok_or_else(Error::malformed_head)?.to_string();
            let version = req.version.ok_or_else(Error::malformed_head)?;
            Ok(Some(RequestHead {
                method,
                target,
                version,
                headers: headers_to_owned(req.headers),
                head_len,
            }))
        }
        httparse::Status::Partial => Ok(None),
    }
}

/// Parses a status line and headers out of `buf`. Returns `None` if the
/// buffer doesn't yet contain a complete head.
pub fn parse_response_head(buf: &[u8]) -> Result<Option<ResponseHead>> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut res = httparse::Response::new(&mut header_storage);
    match res.parse(buf).map_err(|_| Error::malformed_head())? {
        httparse::Status::Complete(head_len) => {
            let version = res.version.ok_or_else(Error::malformed_head)?;
            let status = res.code.ok_or_else(Error::malformed_head)?;
            let reason = res.reason.unwrap_or("").to_string();
            Ok(Some(ResponseHead {
                version,
                status,
                reason,
                headers: headers_to_owned(res.headers),
                head_len,
            }))
        }
        httparse::Status::Partial => Ok(None),
    }
}

/// Determines body length from `Content-Length` / `Transfer-Encoding`
/// headers, the same precedence the teacher's decoder uses: chunked wins
/// over content-length, a present and valid content-length sizes the body,
/// and the absence of either means no body for a request (the only place
/// this crate parses bodies without an EOF-terminated connection).
pub fn body_length(headers: &[(String, String)]) -> Result<BodyLength> {
    let transfer_encoding = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("transfer-encoding"))
        .map(|(_, v)| v.as_str());

    if let Some(te) = transfer_encoding {
        if te.rsplit(',').next().map(str::trim).map(str::to_ascii_lowercase).as_deref() == Some("chunked") {
            return Ok(BodyLength::Chunked);
        }
    }

    let mut content_length: Option<u64> = None;
    for (k, v) in headers {
        if k.eq_ignore_ascii_case("content-length") {
            let n: u64 = v.trim().parse().map_err(|_| Error::malformed_head())?;
            if let Some(existing) = content_length {
                if existing != n {
                    // RFC 7230 §3.3.3 case 4: conflicting Content-Length headers.
                    return Err(Error::malformed_head());
                }
            }
            content_length = Some(n);
        }
    }

    Ok(match content_length {
        Some(0) | None => BodyLength::Empty,
        Some(n) => BodyLength::Fixed(n),
    })
}

/// Reads bytes from `reader` into `buf` until a full head (terminated by
/// `\r\n\r\n`) is present, bounded by `MAX_HEAD_LEN`. Returns the number of
/// head bytes (including the terminator) once complete.
pub async fn read_head<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
    let mut scanned = 0;
    loop {
        if let Some(pos) = find_head_end(buf, scanned) {
            return Ok(pos);
        }

        if buf.len() >= MAX_HEAD_LEN {
            return Err(Error::malformed_head());
        }

        scanned = buf.len().saturating_sub(3);

        let mut chunk = [0u8; 4096];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::malformed_head());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find_head_end(buf: &[u8], from: usize) -> Option<usize> {
    if buf.len() < 4 {
        return None;
    }
    let window = &buf[from..];
    window
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| from + i + 4)
}

/// Reads a body of the given length from `reader`, appending it to `buf`.
/// For `Chunked`, the exact wire bytes (chunk-size lines, CRLFs and the
/// terminating `0\r\n\r\n`) are read verbatim — per spec §4.1 the front end
/// transmits body bytes as-is and does not re-encode them.
pub async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    length: BodyLength,
    buf: &mut Vec<u8>,
) -> Result<()> {
    match length {
        BodyLength::Empty => Ok(()),
        BodyLength::Fixed(n) => {
            let start = buf.len();
            buf.resize(start + n as usize, 0);
            reader.read_exact(&mut buf[start..]).await?;
            Ok(())
        }
        BodyLength::Chunked => read_chunked_verbatim(reader, buf).await,
    }
}

async fn read_chunked_verbatim<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<()> {
    loop {
        let line_start = buf.len();
        read_line(reader, buf).await?;
        let size_line = std::str::from_utf8(&buf[line_start..buf.len() - 2])
            .map_err(|_| Error::malformed_head())?;
        let size_str = size_line.split(';').next().unwrap_or("").trim();
        let size = u64::from_str_radix(size_str, 16).map_err(|_| Error::malformed_head())?;

        if size == 0 {
            // Trailing headers, terminated by an empty line.
            loop {
                let trailer_start = buf.len();
                read_line(reader, buf).await?;
                if &buf[trailer_start..] == b"\r\n" {
                    break;
                }
            }
            return Ok(());
        }

        let start = buf.len();
        buf.resize(start + size as usize, 0);
        reader.read_exact(&mut buf[start..]).await?;
        // Each chunk's data is followed by a bare CRLF.
        read_line(reader, buf).await?;
    }
}

async fn read_line<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Result<()> {
    loop {
        let mut byte = [0u8; 1];
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return Err(Error::malformed_head());
        }
        buf.push(byte[0]);
        if buf.ends_with(b"\r\n") {
            return Ok(());
        }
    }
}

/// Decodes a verbatim chunked body (as produced by [`read_body`]) into its
/// content bytes, for the shore side to hand to a real HTTP client that
/// expects a plain body rather than a chunk-framed one.
pub fn decode_chunked(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut pos = 0;
    loop {
        let line_end = find_crlf(raw, pos).ok_or_else(Error::malformed_head)?;
        let size_line = std::str::from_utf8(&raw[pos..line_end]).map_err(|_| Error::malformed_head())?;
        let size_str = size_line.split(';').next().unwrap_or("").trim();
        let size = u64::from_str_radix(size_str, 16).map_err(|_| Error::malformed_head())? as usize;
        pos = line_end + 2;

        if size == 0 {
            return Ok(out);
        }

        let chunk_end = pos + size;
        if chunk_end > raw.len() {
            return Err(Error::malformed_head());
        }
        out.extend_from_slice(&raw[pos..chunk_end]);
        pos = chunk_end + 2; // skip the chunk's trailing CRLF
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..].windows(2).position(|w| w == b"\r\n").map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_get_request() {
        let head = parse_request_head(b"GET /hello HTTP/1.1\r\nHost: example.invalid\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(head.method, "GET");
        assert_eq!(head.target, "/hello");
        assert_eq!(head.header("host"), Some("example.invalid"));
    }

    #[test]
    fn incomplete_head_returns_none() {
        assert!(parse_request_head(b"GET /hello HTTP/1.1\r\nHost: ex").unwrap().is_none());
    }

    #[test]
    fn body_length_prefers_chunked_over_content_length() {
        let headers = vec![
            ("Transfer-Encoding".to_string(), "chunked".to_string()),
            ("Content-Length".to_string(), "5".to_string()),
        ];
        assert_eq!(body_length(&headers).unwrap(), BodyLength::Chunked);
    }

    #[test]
    fn body_length_defaults_to_empty() {
        assert_eq!(body_length(&[]).unwrap(), BodyLength::Empty);
    }

    #[test]
    fn conflicting_content_length_is_rejected() {
        let headers = vec![
            ("Content-Length".to_string(), "5".to_string()),
            ("Content-Length".to_string(), "6".to_string()),
        ];
        assert!(body_length(&headers).is_err());
    }

    #[test]
    fn hop_by_hop_is_case_insensitive() {
        assert!(is_hop_by_hop("Proxy-Connection"));
        assert!(is_hop_by_hop("TE"));
        assert!(!is_hop_by_hop("Content-Type"));
    }

    #[test]
    fn decodes_a_chunked_body() {
        let raw = b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let decoded = decode_chunked(raw).unwrap();
        assert_eq!(decoded, b"hello world");
    }

    #[tokio::test]
    async fn reads_a_fixed_length_body() {
        let mut data: &[u8] = b"hello";
        let mut buf = Vec::new();
        read_body(&mut data, BodyLength::Fixed(5), &mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn reads_a_chunked_body_verbatim() {
        let mut data: &[u8] = b"5\r\nhello\r\n0\r\n\r\n";
        let mut buf = Vec::new();
        read_body(&mut data, BodyLength::Chunked, &mut buf).await.unwrap();
        assert_eq!(buf, b"5\r\nhello\r\n0\r\n\r\n");
        assert_eq!(decode_chunked(&buf).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn read_head_finds_the_terminator() {
        let mut data: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody-follows";
        let mut buf = Vec::new();
        let head_len = read_head(&mut data, &mut buf).await.unwrap();
        assert_eq!(&buf[..head_len], b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }
}
