use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// HttpVersion
// ---------------------------------------------------------------------------

/// HTTP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    Http11,
}

impl HttpVersion {
    /// Parse an HTTP version from a byte slice (e.g. `b"HTTP/1.1"`).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"HTTP/1.0" => Some(Self::Http10),
            b"HTTP/1.1" => Some(Self::Http11),
            _ => None,
        }
    }

    /// Return the version as a static string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "HTTP/1.0",
            Self::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StatusLine
// ---------------------------------------------------------------------------

/// The first line of a response, split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: HttpVersion,
    pub code: u16,
    /// Reason phrase; empty when the server sent none.
    pub reason: String,
}

impl StatusLine {
    /// Split a complete status line (without its CRLF) into version, code
    /// and reason phrase.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedStatusLine`] unless the line reads
    /// `HTTP/1.0` or `HTTP/1.1`, a single space, three digits and then
    /// optionally a space and a reason phrase.
    pub fn parse(line: &[u8]) -> Result<Self, ParseError> {
        let malformed =
            || ParseError::MalformedStatusLine(String::from_utf8_lossy(line).into_owned());

        let mut parts = line.splitn(3, |&b| b == b' ');
        let version = parts
            .next()
            .and_then(HttpVersion::from_bytes)
            .ok_or_else(malformed)?;

        let code = match parts.next() {
            Some(&[h @ b'1'..=b'9', t @ b'0'..=b'9', u @ b'0'..=b'9']) => {
                u16::from(h - b'0') * 100 + u16::from(t - b'0') * 10 + u16::from(u - b'0')
            }
            _ => return Err(malformed()),
        };

        let reason = parts.next().unwrap_or_default();
        if !reason
            .iter()
            .all(|&b| b == b'\t' || b == b' ' || (0x21..=0x7E).contains(&b) || b >= 0x80)
        {
            return Err(malformed());
        }

        Ok(Self {
            version,
            code,
            reason: String::from_utf8_lossy(reason).into_owned(),
        })
    }

    /// Responses with these codes never carry a body (RFC 9112 §6.3).
    pub fn forbids_body(&self) -> bool {
        (100..200).contains(&self.code) || self.code == 204 || self.code == 304
    }
}

// ---------------------------------------------------------------------------
// HeaderMap
// ---------------------------------------------------------------------------

/// Header fields of a response, keyed by name.
///
/// Lookups ignore ASCII case. The spelling under which a name was first
/// received is kept as its key; repeated fields are joined with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap {
    entries: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, combining it with an existing field of the same name.
    pub fn insert(&mut self, name: String, value: String) {
        if let Some(existing) = self.get_mut(&name) {
            existing.push_str(", ");
            existing.push_str(&value);
        } else {
            self.entries.insert(name, value);
        }
    }

    /// Look up a field value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.entries.get(name) {
            return Some(v);
        }
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut String> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Pairs sorted by name, for stable rendering.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        pairs.sort_unstable();
        pairs
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        map
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A fully parsed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    /// The HTTP version from the status line.
    pub version: HttpVersion,
    /// The three-digit status code.
    pub status_code: u16,
    /// The reason phrase (may be empty).
    pub reason: String,
    /// The header fields.
    pub headers: HeaderMap,
    /// The decoded body (chunk framing removed).
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
}

/// Serialize body bytes as a UTF-8 string (lossy) for JSON output.
fn serialize_body<S: Serializer>(body: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(body))
}

impl Response {
    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Return the body as a lossy UTF-8 string (always succeeds).
    pub fn body_as_lossy_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Look up a header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Parse the `Content-Length` header, if present and valid.
    pub fn content_length(&self) -> Option<usize> {
        self.header_value("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Return `true` if the `Transfer-Encoding` header ends in `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.header_value("transfer-encoding")
            .is_some_and(last_coding_is_chunked)
    }

    /// Return `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// `true` when the final transfer coding in a `Transfer-Encoding` value is
/// `chunked`.
pub(crate) fn last_coding_is_chunked(value: &str) -> bool {
    value
        .rsplit(',')
        .next()
        .is_some_and(|c| c.trim().eq_ignore_ascii_case("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_with_reason() {
        let line = StatusLine::parse(b"HTTP/1.1 404 Not Found").unwrap();
        assert_eq!(line.version, HttpVersion::Http11);
        assert_eq!(line.code, 404);
        assert_eq!(line.reason, "Not Found");
    }

    #[test]
    fn status_line_without_reason() {
        assert_eq!(StatusLine::parse(b"HTTP/1.0 200").unwrap().reason, "");
        assert_eq!(StatusLine::parse(b"HTTP/1.1 200 ").unwrap().reason, "");
    }

    #[test]
    fn status_line_rejects_garbage() {
        for line in [
            &b"GARBAGE"[..],
            b"HTTP/2 200 OK",
            b"HTTP/1.1 20 OK",
            b"HTTP/1.1 2000 OK",
            b"HTTP/1.1 099 OK",
            b"HTTP/1.1  200 OK",
            b"HTTP/1.1 200 O\x01K",
            b"",
        ] {
            assert!(
                matches!(StatusLine::parse(line), Err(ParseError::MalformedStatusLine(_))),
                "accepted {:?}",
                String::from_utf8_lossy(line)
            );
        }
    }

    #[test]
    fn bodiless_status_codes() {
        for code in [100, 101, 204, 304] {
            let line = StatusLine { version: HttpVersion::Http11, code, reason: String::new() };
            assert!(line.forbids_body(), "{code}");
        }
        let ok = StatusLine { version: HttpVersion::Http11, code: 200, reason: "OK".into() };
        assert!(!ok.forbids_body());
    }

    #[test]
    fn header_map_lookup_ignores_case() {
        let mut map = HeaderMap::new();
        map.insert("Content-Type".into(), "text/plain".into());
        assert_eq!(map.get("content-type"), Some("text/plain"));
        assert_eq!(map.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(map.get("Content-Length").is_none());
        assert!(map.contains("content-TYPE"));
        assert!(!map.contains("Content-Length"));
    }

    #[test]
    fn header_map_combines_repeated_fields() {
        let mut map = HeaderMap::new();
        map.insert("Vary".into(), "Accept".into());
        map.insert("vary".into(), "Origin".into());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Vary"), Some("Accept, Origin"));
    }

    #[test]
    fn lossy_body_replaces_invalid_utf8() {
        let resp = Response {
            version: HttpVersion::Http11,
            status_code: 200,
            reason: "OK".into(),
            headers: HeaderMap::new(),
            body: b"ok\xFF".to_vec(),
        };
        assert_eq!(resp.body_as_str(), None);
        assert_eq!(resp.body_as_lossy_string(), "ok\u{FFFD}");
    }

    #[test]
    fn header_map_equality_ignores_insertion_order() {
        let a: HeaderMap = [("A", "1"), ("B", "2")].into_iter().collect();
        let b: HeaderMap = [("B", "2"), ("A", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn chunked_must_be_last_coding() {
        assert!(last_coding_is_chunked("chunked"));
        assert!(last_coding_is_chunked("gzip, Chunked"));
        assert!(!last_coding_is_chunked("chunked, gzip"));
        assert!(!last_coding_is_chunked("identity"));
    }
}
