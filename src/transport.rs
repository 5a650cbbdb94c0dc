//! Drivers that move bytes from a connection into a [`ResponseParser`].
//!
//! Each driver feeds fragments in arrival order, stops reading as soon as
//! the parser reports the response finished, and reports a close from the
//! peer through [`ResponseParser::close`].

use std::io::{ErrorKind, Read};
use std::time::Duration;

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::FetchError;
use crate::parser::{ParseStatus, ParserConfig, ResponseParser};
use crate::types::Response;

/// Read buffer size used when the caller does not pick one.
pub const DEFAULT_FRAGMENT_SIZE: usize = 8 * 1024;

/// Read one response from a blocking reader.
///
/// At most `fragment_size` bytes are handed to the parser per read.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if a read fails and [`FetchError::Parse`] if
/// the bytes are not a valid response, including when the reader hits EOF
/// before the response is finished.
pub fn read_response<R: Read>(
    mut reader: R,
    config: ParserConfig,
    fragment_size: usize,
) -> Result<Response, FetchError> {
    let mut parser = ResponseParser::with_config(config);
    let mut buf = vec![0u8; fragment_size.max(1)];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            parser.close()?;
            break;
        }
        if let ParseStatus::Complete(_) = parser.feed(&buf[..n])? {
            break;
        }
    }

    Ok(parser.into_response()?)
}

/// Read one response from an async reader.
///
/// When `read_timeout` is set, every individual read must complete within
/// it.
///
/// # Errors
///
/// As [`read_response`], plus [`FetchError::Timeout`].
pub async fn read_response_async<R: AsyncRead + Unpin>(
    reader: &mut R,
    config: ParserConfig,
    read_timeout: Option<Duration>,
) -> Result<Response, FetchError> {
    let mut parser = ResponseParser::with_config(config);
    let mut buf = vec![0u8; DEFAULT_FRAGMENT_SIZE];

    loop {
        let n = match read_timeout {
            Some(limit) => tokio::time::timeout(limit, reader.read(&mut buf))
                .await
                .map_err(|_| FetchError::Timeout)??,
            None => reader.read(&mut buf).await?,
        };
        if n == 0 {
            parser.close()?;
            break;
        }
        if let ParseStatus::Complete(_) = parser.feed(&buf[..n])? {
            break;
        }
    }

    Ok(parser.into_response()?)
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

/// Where a plain `http://` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    /// Path and query, always starting with `/`.
    pub path: String,
}

impl Target {
    /// Split `http://host[:port][/path]`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] for other schemes, an empty host
    /// or a port that is not a number.
    pub fn parse(url: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::InvalidUrl(url.to_string());

        let rest = url
            .get(..7)
            .filter(|scheme| scheme.eq_ignore_ascii_case("http://"))
            .map(|_| &url[7..])
            .ok_or_else(invalid)?;

        let (authority, path) = match rest.find(['/', '?']) {
            Some(i) if rest.as_bytes()[i] == b'/' => (&rest[..i], rest[i..].to_string()),
            Some(i) => (&rest[..i], format!("/{}", &rest[i..])),
            None => (rest, "/".to_string()),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (authority, 80),
        };
        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path,
        })
    }

    /// The `GET` request sent by [`fetch`].
    pub fn request(&self) -> String {
        let host = if self.port == 80 {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        };
        format!(
            "GET {} HTTP/1.1\r\nHost: {host}\r\nUser-Agent: wirefeed/{}\r\n\
             Accept: */*\r\nConnection: close\r\n\r\n",
            self.path,
            env!("CARGO_PKG_VERSION"),
        )
    }
}

/// `GET` a plain `http://` URL and parse the response.
///
/// The connection is shut down once the response is finished or parsing
/// fails. `read_timeout` bounds the connect and every read.
///
/// # Errors
///
/// See [`FetchError`].
pub async fn fetch(
    url: &str,
    config: ParserConfig,
    read_timeout: Option<Duration>,
) -> Result<Response, FetchError> {
    let target = Target::parse(url)?;
    info!("connecting to {}:{}", target.host, target.port);

    let connect = TcpStream::connect((target.host.as_str(), target.port));
    let mut stream = match read_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| FetchError::Timeout)??,
        None => connect.await?,
    };

    stream.write_all(target.request().as_bytes()).await?;
    debug!("request sent for {}", target.path);

    let result = read_response_async(&mut stream, config, read_timeout).await;

    if let Err(e) = stream.shutdown().await {
        debug!("shutdown after response failed: {e}");
    }
    if let Ok(response) = &result {
        info!(
            "{} {} ({} body bytes)",
            response.status_code,
            response.reason,
            response.body.len()
        );
    }
    result
}
