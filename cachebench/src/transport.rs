//! Minimal synchronous request/response transport to the cache service.
//!
//! One [`TransportStream`] owns one connection and performs one exchange at
//! a time. The benchmarked services close their side once a response has
//! been delivered; that clean stream end is a recognized condition, not a
//! failure: the stream drops the dead connection, discards buffered bytes,
//! and reconnects so the next exchange finds a usable connection. Every
//! other transport failure surfaces as a [`TransportError`].

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use thiserror::Error;

/// Client identifier sent with every request.
const USER_AGENT: &str = concat!("cachebench/", env!("CARGO_PKG_VERSION"));

/// Fixed protocol version used on every request line.
const HTTP_VERSION: &str = "HTTP/1.1";

const READ_CHUNK: usize = 4096;

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Resolution or connection establishment failed.
    #[error("failed to connect to {host}:{port}")]
    Connect {
        /// Host the connection was attempted against.
        host: String,
        /// Port the connection was attempted against.
        port: u16,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },
    /// An exchange was attempted on a stream without an open connection.
    #[error("not connected")]
    NotConnected,
    /// An I/O failure other than a clean stream end.
    #[error("transport i/o failed")]
    Io(#[from] io::Error),
    /// The peer sent bytes that do not form a response head.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        /// What was wrong with the bytes received.
        reason: &'static str,
    },
}

/// Request methods understood by the cache service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read probe for a key.
    Get,
    /// Store a key/value pair.
    Put,
    /// Remove a key.
    Delete,
    /// Metadata probe; responses carry no body.
    Head,
    /// Command without a key, such as a reset.
    Post,
}

impl Method {
    /// The method token as it appears on the request line.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response received from the cache service.
///
/// A `status` of 0 means the peer closed the stream before delivering a
/// response head; the clean-close handling in [`TransportStream::request`]
/// is the only producer of that value.
#[derive(Debug, Default, Clone)]
pub struct Response {
    /// The numeric status code, or 0 if no response head was received.
    pub status: u16,
    /// Header fields in receive order.
    pub headers: Vec<(String, String)>,
    /// The response body; empty for HEAD responses.
    pub body: Vec<u8>,
}

impl Response {
    /// Whether the status signals success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A bidirectional byte stream that can be shut down.
pub trait Connection: Read + Write {
    /// Shuts down both directions of the stream.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Source of fresh connections.
///
/// This is the seam that lets tests script a peer; production code uses
/// [`TcpConnector`].
pub trait Connector {
    /// The connection type handed out by this connector.
    type Conn: Connection;

    /// Resolves `host:port` and opens a connection to it.
    fn connect(&self, host: &str, port: u16) -> Result<Self::Conn, TransportError>;
}

/// Connects over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(&self, host: &str, port: u16) -> Result<TcpStream, TransportError> {
        TcpStream::connect((host, port)).map_err(|source| TransportError::Connect {
            host: host.to_owned(),
            port,
            source,
        })
    }
}

/// One connection to the cache service.
///
/// The stream remembers its host and port so it can transparently
/// re-establish the connection when the peer cleanly closes it. Dropping
/// the stream closes the underlying connection.
pub struct TransportStream<C: Connector = TcpConnector> {
    connector: C,
    host: String,
    port: u16,
    conn: Option<C::Conn>,
    buffer: Vec<u8>,
}

impl<C: Connector> fmt::Debug for TransportStream<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportStream")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl TransportStream<TcpConnector> {
    /// Resolves `host:port` and opens a TCP connection to it.
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        Self::connect_with(TcpConnector, host, port)
    }
}

impl<C: Connector> TransportStream<C> {
    /// Opens a connection through `connector`, keeping `host` and `port`
    /// for later reconnection.
    pub fn connect_with(connector: C, host: &str, port: u16) -> Result<Self, TransportError> {
        let conn = connector.connect(host, port)?;
        Ok(Self {
            connector,
            host: host.to_owned(),
            port,
            conn: Some(conn),
            buffer: Vec::new(),
        })
    }

    /// Whether the stream currently holds an open connection.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Performs a single request/response exchange.
    ///
    /// A clean stream end while reading the response is not an error: the
    /// stream reconnects exactly once and returns whatever response state
    /// this exchange obtained, possibly one with status 0. The failed
    /// exchange is not retried; the reconnect recovers connectivity for
    /// the next call.
    pub fn request(&mut self, method: Method, target: &str) -> Result<Response, TransportError> {
        let conn = self.conn.as_mut().ok_or(TransportError::NotConnected)?;

        let head = format!(
            "{method} {target} {HTTP_VERSION}\r\nHost: {host}\r\nUser-Agent: {USER_AGENT}\r\n\r\n",
            host = self.host,
        );
        conn.write_all(head.as_bytes())?;

        self.buffer.clear();
        let mut chunk = [0u8; READ_CHUNK];
        let mut clean_close = false;

        let head_end = loop {
            if let Some(end) = find_head_end(&self.buffer) {
                break Some(end);
            }
            match conn.read(&mut chunk)? {
                0 => {
                    clean_close = true;
                    break None;
                }
                n => self.buffer.extend_from_slice(&chunk[..n]),
            }
        };

        let mut response = Response::default();
        if let Some(head_end) = head_end {
            let (status, headers) = parse_head(&self.buffer[..head_end])?;
            response.status = status;
            response.headers = headers;

            if method != Method::Head {
                let content_length = content_length(&response)?;
                let mut body = self.buffer[head_end..].to_vec();
                loop {
                    if let Some(length) = content_length
                        && body.len() >= length
                    {
                        body.truncate(length);
                        break;
                    }
                    match conn.read(&mut chunk)? {
                        0 => {
                            clean_close = true;
                            break;
                        }
                        n => body.extend_from_slice(&chunk[..n]),
                    }
                }
                response.body = body;
            }
        }

        if clean_close {
            self.reconnect()?;
        }

        Ok(response)
    }

    /// Shuts the connection down in both directions.
    ///
    /// A connection that is already gone is benign; any other shutdown
    /// error is surfaced.
    pub fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut conn) = self.conn.take() {
            match conn.shutdown() {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotConnected => {}
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.close()?;
        self.buffer.clear();
        self.conn = Some(self.connector.connect(&self.host, self.port)?);
        tracing::debug!(host = %self.host, port = self.port, "peer closed the stream, reconnected");
        Ok(())
    }
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|position| position + 4)
}

fn parse_head(head: &[u8]) -> Result<(u16, Vec<(String, String)>), TransportError> {
    let head = std::str::from_utf8(head).map_err(|_| TransportError::MalformedResponse {
        reason: "response head is not valid utf-8",
    })?;

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TransportError::MalformedResponse {
            reason: "status line lacks a protocol version",
        });
    }
    let status = parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(TransportError::MalformedResponse {
            reason: "status line lacks a status code",
        })?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(TransportError::MalformedResponse {
                reason: "header line lacks a separator",
            });
        };
        headers.push((name.trim().to_owned(), value.trim().to_owned()));
    }

    Ok((status, headers))
}

fn content_length(response: &Response) -> Result<Option<usize>, TransportError> {
    response
        .header("Content-Length")
        .map(|value| {
            value.trim().parse().map_err(|_| TransportError::MalformedResponse {
                reason: "Content-Length is not a decimal integer",
            })
        })
        .transpose()
}
