//! # wirefeed
//!
//! An **incremental HTTP/1.1 response parser** implemented as a state
//! machine, usable as a Rust library and as a small fetch CLI.
//!
//! Responses can be fed byte-by-byte or in arbitrarily-sized fragments;
//! no protocol boundary has to line up with a fragment boundary. Bodies
//! framed with **chunked transfer encoding**, `Content-Length`, or the
//! connection close are decoded.
//!
//! ## Quick start: one-shot parsing
//!
//! ```rust
//! use wirefeed::parse_response;
//!
//! let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\ntest\r\n0\r\n\r\n";
//! let response = parse_response(raw).expect("valid response");
//! assert_eq!(response.status_code, 200);
//! assert_eq!(response.body, b"test");
//! ```
//!
//! ## Quick start: incremental parsing
//!
//! ```rust
//! use wirefeed::{ParseStatus, ResponseParser};
//!
//! let mut parser = ResponseParser::new();
//!
//! let status = parser.feed(b"HTTP/1.1 200 OK\r\nContent-Le").unwrap();
//! assert_eq!(status, ParseStatus::Incomplete);
//!
//! let status = parser.feed(b"ngth: 2\r\n\r\nok").unwrap();
//! assert!(matches!(status, ParseStatus::Complete(_)));
//!
//! let response = parser.into_response().unwrap();
//! assert_eq!(response.header_value("content-length"), Some("2"));
//! ```

mod chunked;
mod error;
mod output;
mod parser;
pub mod transport;
mod types;

// Re-export public API.
pub use chunked::{ChunkState, ChunkedBodyDecoder};
pub use error::{FetchError, ParseError};
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{BodyKind, BodyPolicy, ParseState, ParseStatus, ParserConfig, ResponseParser};
pub use transport::{fetch, read_response, read_response_async};
pub use types::{HeaderMap, HttpVersion, Response, StatusLine};

/// Parse a **complete** HTTP response from a byte slice in one call.
///
/// The slice is treated as everything the peer sent before closing the
/// connection, so a close-delimited body ends at the end of `data`. For
/// incremental / streaming use-cases, create a [`ResponseParser`] directly.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or ends before the
/// response is complete.
pub fn parse_response(data: &[u8]) -> Result<Response, ParseError> {
    parse_response_with_config(data, ParserConfig::default())
}

/// Parse a **complete** HTTP response using custom [`ParserConfig`] limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_response_with_config(
    data: &[u8],
    config: ParserConfig,
) -> Result<Response, ParseError> {
    let mut parser = ResponseParser::with_config(config);
    if let ParseStatus::Incomplete = parser.feed(data)? {
        parser.close()?;
    }
    parser.into_response()
}
