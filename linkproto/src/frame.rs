//! The on-wire frame: a 4-byte big-endian length, a 1-byte type tag, and
//! `length` bytes of opaque payload. No magic, no version — the link is
//! point-to-point and both peers ship together.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// Default cap on a frame's `payload` length (1 MiB), per spec §4.3.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Size of a `Data` chunk the tunnel pump reads before framing it, per §4.5.
pub const TUNNEL_CHUNK_LEN: usize = 16 * 1024;

const HEADER_LEN: usize = 5;

/// The frame type tags defined in spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// ship → shore: serialized HTTP request.
    Request = 1,
    /// shore → ship: serialized HTTP response.
    Response = 2,
    /// ship → shore: ASCII `host:port` to dial.
    ConnectOpen = 3,
    /// shore → ship: tunnel target reachable.
    ConnectOk = 4,
    /// shore → ship: tunnel target unreachable; payload is an optional reason.
    ConnectFail = 5,
    /// both directions: opaque tunnel bytes.
    Data = 6,
    /// both directions: end of tunnel.
    Close = 7,
}

impl FrameKind {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => FrameKind::Request,
            2 => FrameKind::Response,
            3 => FrameKind::ConnectOpen,
            4 => FrameKind::ConnectOk,
            5 => FrameKind::ConnectFail,
            6 => FrameKind::Data,
            7 => FrameKind::Close,
            _ => return None,
        })
    }
}

/// One frame: a type tag and its opaque payload.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Frame {
            kind,
            payload: payload.into(),
        }
    }

    pub fn empty(kind: FrameKind) -> Self {
        Frame::new(kind, Bytes::new())
    }
}

/// `tokio_util::codec::{Encoder, Decoder}` over [`Frame`], so the shared link
/// is driven the same way the teacher drives an HTTP/1 connection: wrap the
/// socket in `Framed` and poll it as a `Stream`/`Sink`, instead of hand-rolling
/// a read-then-parse loop over raw bytes.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_len: u32,
}

impl FrameCodec {
    pub fn new(max_len: u32) -> Self {
        FrameCodec { max_len }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        FrameCodec::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, Error> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if len > self.max_len {
            return Err(Error::frame_too_large());
        }
        let tag = src[4];
        let total = HEADER_LEN + len as usize;

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let kind = FrameKind::from_tag(tag).ok_or_else(|| Error::unknown_frame_type(tag))?;

        src.advance(HEADER_LEN);
        let payload = src.split_to(len as usize).freeze();
        Ok(Some(Frame { kind, payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Error> {
        let len = item.payload.len();
        if len as u64 > self.max_len as u64 {
            return Err(Error::frame_too_large());
        }
        dst.reserve(HEADER_LEN + len);
        dst.put_u32(len as u32);
        dst.put_u8(item.kind as u8);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
