use log::{debug, warn};
use serde::Deserialize;

use crate::chunked::ChunkedBodyDecoder;
use crate::error::ParseError;
use crate::types::{HeaderMap, Response, StatusLine, last_coding_is_chunked};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do with a response that declares neither `Transfer-Encoding`
/// nor `Content-Length`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// The body runs until the peer closes the connection (RFC 9112 §6.3).
    #[default]
    ReadUntilClose,
    /// Reject the response with [`ParseError::UnsupportedBodyEncoding`].
    RequireLength,
}

/// Configurable limits for the response parser.
///
/// All sizes are in bytes unless stated otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum length of the status line (default: 8 192).
    pub max_status_line_len: usize,
    /// Maximum length of a single header field name (default: 256).
    pub max_header_name_len: usize,
    /// Maximum length of a single header field value (default: 8 192).
    pub max_header_value_len: usize,
    /// Maximum number of header lines (default: 128).
    pub max_headers_count: usize,
    /// Maximum decoded body size (default: 10 MiB).
    pub max_body_size: usize,
    /// Maximum size a single chunk may declare (default: 16 MiB).
    pub max_chunk_size: usize,
    /// Framing for bodies without a declared length.
    pub body_policy: BodyPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_status_line_len: 8_192,
            max_header_name_len: 256,
            max_header_value_len: 8_192,
            max_headers_count: 128,
            max_body_size: 10 * 1024 * 1024,
            max_chunk_size: 16 * 1024 * 1024,
            body_policy: BodyPolicy::ReadUntilClose,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse status
// ---------------------------------------------------------------------------

/// Outcome of a [`ResponseParser::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The response is finished.
    /// The contained value is the **total** number of bytes consumed so far
    /// (across all `feed` calls). Bytes past this offset were not consumed.
    Complete(usize),
    /// More data (or a close) is required.
    Incomplete,
}

/// Position of a [`ResponseParser`] in the response grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StatusLine,
    StatusLineEnd,
    HeaderName,
    HeaderColonSpace,
    HeaderValue,
    HeaderValueEnd,
    HeadersBlockEnd,
    Body,
}

/// How the body of a response is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// No body (bodiless status code or `Content-Length: 0`).
    None,
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// `Content-Length` bytes.
    Length(usize),
    /// Everything until the peer closes the connection.
    UntilClose,
}

#[derive(Debug)]
enum BodyDecoder {
    Empty,
    Chunked(ChunkedBodyDecoder),
    Length { remaining: usize, buf: Vec<u8> },
    UntilClose { closed: bool, buf: Vec<u8> },
}

impl BodyDecoder {
    fn kind(&self) -> BodyKind {
        match self {
            Self::Empty => BodyKind::None,
            Self::Chunked(_) => BodyKind::Chunked,
            Self::Length { remaining, buf } => BodyKind::Length(remaining + buf.len()),
            Self::UntilClose { .. } => BodyKind::UntilClose,
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Chunked(decoder) => decoder.is_finished(),
            Self::Length { remaining, .. } => *remaining == 0,
            Self::UntilClose { closed, .. } => *closed,
        }
    }

    fn content(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Chunked(decoder) => decoder.content(),
            Self::Length { buf, .. } | Self::UntilClose { buf, .. } => buf,
        }
    }

    fn into_content(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Chunked(decoder) => decoder.into_content(),
            Self::Length { buf, .. } | Self::UntilClose { buf, .. } => buf,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// An incremental, state-machine-based HTTP/1.1 response parser.
///
/// One parser decodes one response. Feed it fragments in arrival order;
/// the result does not depend on where fragment boundaries fall.
///
/// # Usage
///
/// ```rust
/// use wirefeed::{ParseStatus, ResponseParser};
///
/// let mut parser = ResponseParser::new();
///
/// parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n").unwrap();
/// assert!(!parser.is_finished());
///
/// let status = parser.feed(b"2\r\nhi\r\n0\r\n\r\n").unwrap();
/// assert!(matches!(status, ParseStatus::Complete(_)));
///
/// let response = parser.into_response().unwrap();
/// assert_eq!(response.body, b"hi");
/// ```
#[derive(Debug)]
pub struct ResponseParser {
    state: ParseState,
    config: ParserConfig,
    bytes_consumed: usize,

    // Accumulation buffers
    status_line_buf: Vec<u8>,
    header_name_buf: Vec<u8>,
    header_value_buf: Vec<u8>,

    // Parsed components
    status: Option<StatusLine>,
    headers: HeaderMap,
    header_lines: usize,
    body: Option<BodyDecoder>,

    /// First error hit; every later call reports it again.
    error: Option<ParseError>,
}

impl ResponseParser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a new parser with custom limits.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            state: ParseState::StatusLine,
            config,
            bytes_consumed: 0,
            status_line_buf: Vec::with_capacity(32),
            header_name_buf: Vec::with_capacity(32),
            header_value_buf: Vec::with_capacity(128),
            status: None,
            headers: HeaderMap::new(),
            header_lines: 0,
            body: None,
            error: None,
        }
    }

    /// Feed a fragment of the response into the parser.
    ///
    /// Fragments may be of any length, including zero. Once the response is
    /// finished the remaining bytes are not consumed.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on any protocol violation or limit breach.
    /// The parser is unusable afterwards and keeps returning that error.
    pub fn feed(&mut self, data: &[u8]) -> Result<ParseStatus, ParseError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.feed_inner(data).map_err(|e| self.poison(e))
    }

    /// Signal that the peer closed the connection.
    ///
    /// This finishes a body that runs until close.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnexpectedEndOfStream`] if the response was not
    /// finished and its body is not close-delimited.
    pub fn close(&mut self) -> Result<ParseStatus, ParseError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if let Some(BodyDecoder::UntilClose { closed, buf }) = &mut self.body {
            if !*closed {
                debug!("connection closed, close-delimited body is {} bytes", buf.len());
                *closed = true;
            }
        }
        if self.is_finished() {
            Ok(self.status())
        } else {
            Err(self.poison(ParseError::UnexpectedEndOfStream))
        }
    }

    fn poison(&mut self, e: ParseError) -> ParseError {
        warn!("response parse failed in {:?}: {e}", self.state);
        self.error = Some(e.clone());
        e
    }

    fn status(&self) -> ParseStatus {
        if self.is_finished() {
            ParseStatus::Complete(self.bytes_consumed)
        } else {
            ParseStatus::Incomplete
        }
    }

    fn feed_inner(&mut self, data: &[u8]) -> Result<ParseStatus, ParseError> {
        let mut i = 0;

        while i < data.len() && !self.is_finished() {
            // ----- Bulk path for the body -----
            if self.state == ParseState::Body {
                let consumed = self.feed_body(&data[i..])?;
                if consumed == 0 {
                    break;
                }
                self.bytes_consumed += consumed;
                i += consumed;
                continue;
            }

            // ----- Byte-by-byte path -----
            let byte = data[i];
            self.bytes_consumed += 1;
            i += 1;
            self.step(byte)?;
        }

        Ok(self.status())
    }

    /// Advance the head state machine by one byte.
    fn step(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.state {
            // ===================== STATUS LINE =====================
            ParseState::StatusLine => {
                if byte == b'\r' {
                    self.state = ParseState::StatusLineEnd;
                } else if byte == b'\n' {
                    return Err(self.malformed_status_line());
                } else {
                    if self.status_line_buf.len() >= self.config.max_status_line_len {
                        return Err(ParseError::MalformedStatusLine(format!(
                            "status line exceeds {} bytes",
                            self.config.max_status_line_len
                        )));
                    }
                    self.status_line_buf.push(byte);
                }
            }

            ParseState::StatusLineEnd => {
                if byte != b'\n' {
                    return Err(self.malformed_status_line());
                }
                let status = StatusLine::parse(&self.status_line_buf)?;
                debug!("status line: {} {} {}", status.version, status.code, status.reason);
                self.status = Some(status);
                self.state = ParseState::HeaderName;
            }

            // ===================== HEADERS =====================
            ParseState::HeaderName => {
                if byte == b':' {
                    if self.header_name_buf.is_empty() {
                        return Err(ParseError::MalformedHeaderLine("empty header name".into()));
                    }
                    self.state = ParseState::HeaderColonSpace;
                } else if byte == b'\r' {
                    if !self.header_name_buf.is_empty() {
                        return Err(ParseError::MalformedHeaderLine(format!(
                            "header '{}' has no colon",
                            self.header_name()
                        )));
                    }
                    // Empty line: end of header section.
                    self.state = ParseState::HeadersBlockEnd;
                } else if is_tchar(byte) {
                    if self.header_name_buf.is_empty()
                        && self.header_lines >= self.config.max_headers_count
                    {
                        return Err(ParseError::TooManyHeaders);
                    }
                    if self.header_name_buf.len() >= self.config.max_header_name_len {
                        return Err(ParseError::HeaderTooLarge);
                    }
                    self.header_name_buf.push(byte);
                } else {
                    return Err(ParseError::MalformedHeaderLine(format!(
                        "byte 0x{byte:02X} in header name"
                    )));
                }
            }

            ParseState::HeaderColonSpace => {
                if byte != b' ' {
                    return Err(ParseError::MalformedHeaderLine(format!(
                        "expected a space after '{}:', found 0x{byte:02X}",
                        self.header_name()
                    )));
                }
                self.state = ParseState::HeaderValue;
            }

            ParseState::HeaderValue => {
                if byte == b'\r' {
                    self.commit_header();
                    self.state = ParseState::HeaderValueEnd;
                } else if is_field_content_byte(byte) {
                    if self.header_value_buf.len() >= self.config.max_header_value_len {
                        return Err(ParseError::HeaderTooLarge);
                    }
                    self.header_value_buf.push(byte);
                } else {
                    return Err(ParseError::MalformedHeaderLine(format!(
                        "byte 0x{byte:02X} in value of '{}'",
                        self.header_name()
                    )));
                }
            }

            ParseState::HeaderValueEnd => {
                if byte != b'\n' {
                    return Err(ParseError::MalformedHeaderLine(format!(
                        "expected LF after header CR, found 0x{byte:02X}"
                    )));
                }
                self.state = ParseState::HeaderName;
            }

            // ===================== END OF HEADERS =====================
            ParseState::HeadersBlockEnd => {
                if byte != b'\n' {
                    return Err(ParseError::MalformedHeaderLine(format!(
                        "expected LF ending the header block, found 0x{byte:02X}"
                    )));
                }
                self.begin_body()?;
                self.state = ParseState::Body;
            }

            // ===================== BODY =====================
            ParseState::Body => unreachable!("body bytes take the bulk path in feed_inner"),
        }

        Ok(())
    }

    // ----- helpers --------------------------------------------------------

    fn malformed_status_line(&self) -> ParseError {
        ParseError::MalformedStatusLine(String::from_utf8_lossy(&self.status_line_buf).into_owned())
    }

    fn header_name(&self) -> String {
        String::from_utf8_lossy(&self.header_name_buf).into_owned()
    }

    /// Move the accumulated name/value into the header map and clear both
    /// buffers.
    fn commit_header(&mut self) {
        let name = String::from_utf8_lossy(&self.header_name_buf).into_owned();
        let value = String::from_utf8_lossy(&self.header_value_buf)
            .trim_matches([' ', '\t'])
            .to_owned();
        self.headers.insert(name, value);
        self.header_lines += 1;
        self.header_name_buf.clear();
        self.header_value_buf.clear();
    }

    /// Pick the body framing from the committed headers.
    fn begin_body(&mut self) -> Result<(), ParseError> {
        let kind = self.select_body_kind()?;
        debug!(
            "header block complete, {} fields, body framing {kind:?}",
            self.headers.len()
        );

        self.body = Some(match kind {
            BodyKind::None => BodyDecoder::Empty,
            BodyKind::Chunked => BodyDecoder::Chunked(ChunkedBodyDecoder::with_limits(
                self.config.max_chunk_size,
                self.config.max_body_size,
            )),
            BodyKind::Length(length) => BodyDecoder::Length {
                remaining: length,
                // Pre-allocate up to 64 KiB to avoid frequent reallocations.
                buf: Vec::with_capacity(length.min(65_536)),
            },
            BodyKind::UntilClose => BodyDecoder::UntilClose {
                closed: false,
                buf: Vec::new(),
            },
        });
        Ok(())
    }

    fn select_body_kind(&self) -> Result<BodyKind, ParseError> {
        if self.status.as_ref().is_some_and(StatusLine::forbids_body) {
            return Ok(BodyKind::None);
        }

        // Transfer-Encoding takes precedence over Content-Length (RFC 9112 §6.1).
        if let Some(te) = self.headers.get("transfer-encoding") {
            if last_coding_is_chunked(te) {
                return Ok(BodyKind::Chunked);
            }
            return Err(ParseError::UnsupportedBodyEncoding(format!(
                "Transfer-Encoding: {te}"
            )));
        }

        if let Some(cl) = self.headers.get("content-length") {
            // Repeated fields were joined with ", "; they must all agree.
            let mut values = cl.split(',').map(str::trim);
            let first = values.next().unwrap_or_default();
            if values.any(|v| v != first) {
                return Err(ParseError::InvalidContentLength(
                    "multiple differing Content-Length values".into(),
                ));
            }
            if first.is_empty() || !first.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseError::InvalidContentLength(first.to_string()));
            }
            let length: usize = first
                .parse()
                .map_err(|_| ParseError::InvalidContentLength(first.to_string()))?;
            if length > self.config.max_body_size {
                return Err(ParseError::BodyTooLarge);
            }
            return Ok(if length == 0 {
                BodyKind::None
            } else {
                BodyKind::Length(length)
            });
        }

        match self.config.body_policy {
            BodyPolicy::ReadUntilClose => Ok(BodyKind::UntilClose),
            BodyPolicy::RequireLength => Err(ParseError::UnsupportedBodyEncoding(
                "neither Transfer-Encoding nor Content-Length present".into(),
            )),
        }
    }

    /// Forward body bytes to the active decoder, returning how many it took.
    fn feed_body(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let max_body_size = self.config.max_body_size;
        let consumed = match &mut self.body {
            None | Some(BodyDecoder::Empty) => 0,
            Some(BodyDecoder::Chunked(decoder)) => decoder.decode(data)?,
            Some(BodyDecoder::Length { remaining, buf }) => {
                let to_copy = data.len().min(*remaining);
                buf.extend_from_slice(&data[..to_copy]);
                *remaining -= to_copy;
                if *remaining == 0 {
                    debug!("length-delimited body finished, {} bytes", buf.len());
                }
                to_copy
            }
            Some(BodyDecoder::UntilClose { buf, .. }) => {
                if buf
                    .len()
                    .checked_add(data.len())
                    .is_none_or(|total| total > max_body_size)
                {
                    return Err(ParseError::BodyTooLarge);
                }
                buf.extend_from_slice(data);
                data.len()
            }
        };
        Ok(consumed)
    }

    // ----- public query / finalization ------------------------------------

    /// Returns `true` once the response, body included, is complete.
    pub fn is_finished(&self) -> bool {
        self.body.as_ref().is_some_and(BodyDecoder::is_finished)
    }

    /// Current position in the response grammar.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Body framing, known once the header block has ended.
    pub fn body_kind(&self) -> Option<BodyKind> {
        self.body.as_ref().map(BodyDecoder::kind)
    }

    /// Body bytes decoded so far.
    pub fn body(&self) -> &[u8] {
        self.body.as_ref().map_or(&[] as &[u8], BodyDecoder::content)
    }

    /// Header fields committed so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Total number of bytes consumed across all `feed` calls.
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Return a copy of the parsed [`Response`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::IncompleteResponse`] before the parser has
    /// finished.
    pub fn response(&self) -> Result<Response, ParseError> {
        let status = self.finished_status()?.clone();
        Ok(Response {
            version: status.version,
            status_code: status.code,
            reason: status.reason,
            headers: self.headers.clone(),
            body: self.body().to_vec(),
        })
    }

    /// Consume the parser and return the parsed [`Response`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::IncompleteResponse`] before the parser has
    /// finished.
    pub fn into_response(self) -> Result<Response, ParseError> {
        self.finished_status()?;
        let status = self.status.ok_or(ParseError::IncompleteResponse)?;
        Ok(Response {
            version: status.version,
            status_code: status.code,
            reason: status.reason,
            headers: self.headers,
            body: self.body.map(BodyDecoder::into_content).unwrap_or_default(),
        })
    }

    fn finished_status(&self) -> Result<&StatusLine, ParseError> {
        if !self.is_finished() {
            return Err(ParseError::IncompleteResponse);
        }
        self.status.as_ref().ok_or(ParseError::IncompleteResponse)
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110 / RFC 9112)
// ---------------------------------------------------------------------------

/// `tchar` – characters allowed in HTTP tokens (header names).
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Bytes permitted inside a header field value:
/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}
