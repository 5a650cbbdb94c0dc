use std::fmt;
use std::io;

/// Errors that can occur while decoding an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The status line does not match `HTTP/1.x <code> <reason>`.
    MalformedStatusLine(String),
    /// A header line is missing its colon, its single space, or contains
    /// bytes not allowed in a field.
    MalformedHeaderLine(String),
    /// The headers declare a body framing this parser does not decode.
    UnsupportedBodyEncoding(String),
    /// A chunk-size line declares more than the configured maximum.
    ChunkSizeOverflow,
    /// The connection closed before the response was complete.
    UnexpectedEndOfStream,
    /// A chunk-size line is empty or contains a non-hex byte.
    InvalidChunkSize(String),
    /// The `Content-Length` header value is not a valid integer.
    InvalidContentLength(String),
    /// An unexpected byte was encountered where body framing was expected.
    UnexpectedByte {
        /// Human-readable description of what was expected.
        expected: &'static str,
        /// The actual byte value found.
        found: u8,
    },
    /// A header name or value exceeds the configured maximum size.
    HeaderTooLarge,
    /// The number of headers exceeds the configured maximum.
    TooManyHeaders,
    /// The response body exceeds the configured maximum size.
    BodyTooLarge,
    /// The response was requested before parsing finished.
    IncompleteResponse,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedStatusLine(l) => write!(f, "malformed status line: '{l}'"),
            Self::MalformedHeaderLine(l) => write!(f, "malformed header line: {l}"),
            Self::UnsupportedBodyEncoding(e) => write!(f, "unsupported body encoding: {e}"),
            Self::ChunkSizeOverflow => write!(f, "chunk size exceeds maximum allowed size"),
            Self::UnexpectedEndOfStream => write!(f, "connection closed before response finished"),
            Self::InvalidChunkSize(s) => write!(f, "invalid chunk size: '{s}'"),
            Self::InvalidContentLength(v) => write!(f, "invalid Content-Length: '{v}'"),
            Self::UnexpectedByte { expected, found } => {
                write!(f, "unexpected byte 0x{found:02X} (expected {expected})")
            }
            Self::HeaderTooLarge => write!(f, "header exceeds maximum allowed size"),
            Self::TooManyHeaders => write!(f, "number of headers exceeds maximum"),
            Self::BodyTooLarge => write!(f, "body exceeds maximum allowed size"),
            Self::IncompleteResponse => write!(f, "incomplete HTTP response"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors returned by the transport drivers in [`crate::transport`].
#[derive(Debug)]
pub enum FetchError {
    /// Reading from or writing to the connection failed.
    Io(io::Error),
    /// The bytes received did not form a valid response.
    Parse(ParseError),
    /// No data arrived within the read timeout.
    Timeout,
    /// The URL given to [`crate::fetch`] is not a plain `http://` URL.
    InvalidUrl(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Timeout => write!(f, "timed out waiting for response data"),
            Self::InvalidUrl(u) => write!(f, "invalid URL: '{u}'"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Timeout | Self::InvalidUrl(_) => None,
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseError> for FetchError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
