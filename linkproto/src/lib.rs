//! Shared wire protocol and HTTP head parsing for the ship/shore proxy pair.
//!
//! This crate is the only thing both peer binaries depend on: the frame
//! codec (§3), the split write/read handles over a connected socket (§4.3),
//! the tunnel pump shared by both sides (§4.5), minimal HTTP/1.1 head
//! parsing (§4.1/§4.4), and a reconnect backoff helper (§4.3).

pub mod backoff;
pub mod error;
pub mod frame;
pub mod head;
pub mod link;
pub mod pump;

pub use error::{Error, Result};
pub use frame::{Frame, FrameCodec, FrameKind, DEFAULT_MAX_FRAME_LEN, TUNNEL_CHUNK_LEN};
pub use link::{from_stream, LinkReader, LinkWriter};
