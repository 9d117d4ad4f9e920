//! Error and Result types shared by both peers.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Result type returned from most `linkproto` operations.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// Errors that can occur while framing, parsing or relaying on the shared link.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

/// The kind of failure that occurred.
#[derive(Debug)]
pub enum Kind {
    /// The frame header declared a length beyond `MAX_FRAME_LEN`.
    FrameTooLarge,
    /// A frame carried a type tag this peer doesn't recognize.
    UnknownFrameType(u8),
    /// A frame arrived that is not valid for the current mode (e.g. `Data`
    /// while no tunnel is open).
    UnexpectedFrame,
    /// The HTTP request or response head could not be parsed.
    MalformedHead,
    /// The link socket was closed or reset.
    LinkClosed,
    /// An `io::Error` occurred reading or writing a socket.
    Io,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Self {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    pub(crate) fn with_cause<C: Into<Cause>>(kind: Kind, cause: C) -> Self {
        Error {
            inner: Box::new(ErrorImpl {
                kind,
                cause: Some(cause.into()),
            }),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &Kind {
        &self.inner.kind
    }

    pub(crate) fn frame_too_large() -> Self {
        Error::new(Kind::FrameTooLarge)
    }

    pub(crate) fn unknown_frame_type(tag: u8) -> Self {
        Error::new(Kind::UnknownFrameType(tag))
    }

    /// A frame was received that the current protocol mode does not expect.
    pub fn unexpected_frame() -> Self {
        Error::new(Kind::UnexpectedFrame)
    }

    /// The request or response head could not be parsed.
    pub fn malformed_head() -> Self {
        Error::new(Kind::MalformedHead)
    }

    /// The link was closed, locally or remotely.
    pub fn link_closed() -> Self {
        Error::new(Kind::LinkClosed)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("linkproto::Error");
        builder.field("kind", &self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            builder.field("cause", cause);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::FrameTooLarge => f.write_str("frame length exceeds the configured maximum"),
            Kind::UnknownFrameType(tag) => write!(f, "unknown frame type {tag}"),
            Kind::UnexpectedFrame => f.write_str("frame not valid for the current link mode"),
            Kind::MalformedHead => f.write_str("malformed HTTP request or response head"),
            Kind::LinkClosed => f.write_str("shared link is closed"),
            Kind::Io => f.write_str("I/O error on the shared link"),
        }?;
        if let Some(ref cause) = self.inner.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.cause.as_ref().map(|c| &**c as &(dyn StdError + 'static))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::with_cause(Kind::Io, err)
    }
}
