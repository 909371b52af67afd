//! Error types for the ingest library.

use std::fmt;

/// Errors that can occur across the ingest stack.
///
/// Variants map to specific failure modes:
///
/// - **Framing**: [`ShortPacket`](Self::ShortPacket),
///   [`BadVersion`](Self::BadVersion), [`WrongType`](Self::WrongType) —
///   a byte slice does not match its declared RTP/RTCP framing.
/// - **Depacketization**: [`Unsupported`](Self::Unsupported),
///   [`BadFragment`](Self::BadFragment),
///   [`UnexpectedEnd`](Self::UnexpectedEnd).
/// - **Transport**: [`Io`](Self::Io), [`Timeout`](Self::Timeout) —
///   socket/network failures. A timeout is not fatal to the owning
///   component; the caller decides whether to retry.
/// - **RTSP**: [`RtspStatus`](Self::RtspStatus),
///   [`InvalidResponse`](Self::InvalidResponse), [`BadUrl`](Self::BadUrl).
///
/// No variant carries an implicit retry.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte slice too small for its declared framing.
    #[error("short packet: {len} bytes, need at least {need}")]
    ShortPacket { len: usize, need: usize },

    /// RTP/RTCP version field is not 2 (RFC 3550 §5.1, §6.4).
    #[error("bad protocol version: {0}")]
    BadVersion(u8),

    /// RTCP packet type did not match the expected one.
    #[error("wrong RTCP packet type: {0}")]
    WrongType(u8),

    /// Packetization mode the depacketizer does not handle
    /// (STAP-B, MTAP, FU-B, PACI, reserved NAL types).
    #[error("unsupported packetization: {0}")]
    Unsupported(&'static str),

    /// Fragmentation unit with both start and end bits set.
    #[error("fragment with both start and end bits set")]
    BadFragment,

    /// Byte stream ended in the middle of an access unit. Carries the
    /// number of bytes left unflushed in the lexer's buffer.
    #[error("byte stream ended mid access unit ({0} bytes buffered)")]
    UnexpectedEnd(usize),

    /// A socket read or write hit its deadline.
    #[error("socket operation timed out")]
    Timeout,

    /// The server answered an RTSP request with a non-200 status.
    /// The client does not interpret the code; the caller decides.
    #[error("RTSP request failed: {code} {reason}")]
    RtspStatus { code: u16, reason: String },

    /// Failed to parse an RTSP response (RFC 2326 §7). The connection
    /// is no longer usable.
    #[error("invalid RTSP response: {kind}")]
    InvalidResponse { kind: ResponseErrorKind },

    /// The RTSP URL could not be parsed.
    #[error("invalid RTSP URL: {0}")]
    BadUrl(#[from] url::ParseError),
}

/// Specific kind of RTSP response parse failure.
#[derive(Debug)]
pub enum ResponseErrorKind {
    /// The connection closed before a status line arrived.
    EmptyResponse,
    /// Status line did not have the expected `RTSP/major.minor code reason` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// `Content-Length` was present but not a valid integer.
    InvalidContentLength,
}

impl fmt::Display for ResponseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResponse => write!(f, "empty response"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidContentLength => write!(f, "invalid Content-Length"),
        }
    }
}

impl IngestError {
    /// Map an I/O error to [`Timeout`](Self::Timeout) when it is a read or
    /// write deadline, leaving every other kind as [`Io`](Self::Io).
    pub(crate) fn from_socket(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

/// Convenience alias for `Result<T, IngestError>`.
pub type Result<T> = std::result::Result<T, IngestError>;
