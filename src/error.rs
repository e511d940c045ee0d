//! Error handling

use std::{io, str::Utf8Error};

use thiserror::Error;

/// Generic result type
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible WebSocket errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Input-output error. These are generally errors with the underlying connection and
    /// you should probably consider them fatal: the stream may have died mid-frame and no
    /// resynchronization is attempted.
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    /// Opening handshake failed. The connection was never upgraded and nothing has been
    /// written to the stream.
    #[error("Handshake Error: {0}")]
    #[cfg(feature = "handshake")]
    Handshake(#[from] HandshakeError),

    /// Protocol violation.
    #[error("Protocol Error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Your message is bigger than a single unextended frame can carry. Nothing has been
    /// written; the connection remains usable.
    #[error("Capacity Error: {0}")]
    Capacity(#[from] CapacityError),

    /// UTF-8 coding error.
    #[error("UTF-8 Error: {0}")]
    Utf8(String),

    /// HTTP format error.
    #[error("HTTP format error: {0}")]
    #[cfg(feature = "handshake")]
    HttpFormat(#[from] http::Error),
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::Utf8(value.to_string())
    }
}

#[cfg(feature = "handshake")]
impl From<http::header::InvalidHeaderName> for Error {
    fn from(value: http::header::InvalidHeaderName) -> Self {
        Error::HttpFormat(value.into())
    }
}

#[cfg(feature = "handshake")]
impl From<http::header::InvalidHeaderValue> for Error {
    fn from(value: http::header::InvalidHeaderValue) -> Self {
        Error::HttpFormat(value.into())
    }
}

#[cfg(feature = "handshake")]
impl From<http::uri::InvalidUri> for Error {
    fn from(value: http::uri::InvalidUri) -> Self {
        Error::HttpFormat(value.into())
    }
}

#[cfg(feature = "handshake")]
impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::TooManyHeaders => Error::Capacity(CapacityError::TooManyHeaders),
            e => Error::Handshake(HandshakeError::HttparseError(e))
        }
    }
}

/// Indicates the specific type/cause of an opening handshake failure.
///
/// All of these are terminal for the upgrade attempt. The stream is untouched (no error
/// response is written) and must not be treated as a WebSocket; dropping it closes it.
#[cfg(feature = "handshake")]
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum HandshakeError {
    /// The request used a method other than GET.
    #[error("Invalid HTTP method (must be GET)")]
    InvalidHttpMethod,

    /// The request predates HTTP/1.1.
    #[error("Unsupported HTTP version (must be at least HTTP/1.1)")]
    InvalidHttpVersion,

    /// Missing or incorrect `Upgrade: websocket` HTTP header.
    #[error("Missing 'Upgrade: websocket' header")]
    MissingUpgradeHeader,

    /// Missing or incorrect `Connection: Upgrade` HTTP header.
    #[error("Missing 'Connection: Upgrade' header")]
    MissingConnectionUpgradeHeader,

    /// The `Sec-WebSocket-Version` header is missing or names a version other than 13.
    #[error("Missing 'Sec-WebSocket-Version: 13' header")]
    MissingVersionHeader,

    /// The request carries no `Sec-WebSocket-Key` to derive an accept key from.
    #[error("Missing 'Sec-WebSocket-Key' header")]
    MissingKeyHeader,

    /// The peer closed the stream before the request head was complete.
    #[error("Handshake incomplete")]
    IncompleteHandshake,

    /// The request head ran past the read limit without completing.
    #[error("Oversized handshake request")]
    OversizedRequest,

    /// Bytes followed the request head before the upgrade response was sent.
    #[error("Junk after client request")]
    JunkAfterRequest,

    /// Malformed HTTP, carried up from [`httparse`].
    #[error("httparse error: {0}")]
    HttparseError(#[from] httparse::Error),
}

/// Indicates the specific type/cause of a protocol error.
///
/// A failed frame decode leaves the stream position unknown, so these are terminal for
/// the connection.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    /// An RSV bit was set without a negotiated extension to give it meaning.
    #[error("Encountered frame with non-zero reserved bits")]
    NonZeroReservedBits,

    /// Encountered an opcode from one of the reserved ranges.
    #[error("Received reserved opcode: {0}")]
    ReservedOpCode(u8),

    /// Peer used the 16-bit or 64-bit extended payload length encoding.
    #[error("Extended payload length marker {0} not supported")]
    UnsupportedExtendedLength(u8),
}

/// Indicates the specific type/cause of a capacity error.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// The request head carries more headers than the parser will track.
    #[error("Too many headers received")]
    TooManyHeaders,

    /// Payload is bigger than the maximum a single unextended frame can carry.
    #[error("Payload too large: {size} > {max}")]
    PayloadTooLarge {
        /// The size of the payload.
        size: usize,
        /// The maximum allowed payload size.
        max: usize
    }
}
