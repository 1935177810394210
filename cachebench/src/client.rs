//! Semantic cache operations on top of the transport.
//!
//! Every operation opens its own [`TransportStream`], performs exactly one
//! exchange, and closes it again; connections are never shared or reused
//! across calls. Statuses outside the expected set for a verb are handled
//! uniformly: conservatively (miss / not found) for the probing operations
//! `get` and `del`, and as an explicit error for `set`, `space_used`, and
//! `reset`.

use thiserror::Error;

use crate::transport::{Connector, Method, Response, TcpConnector, TransportError, TransportStream};

/// Errors produced by cache client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Any error from the underlying transport.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The service answered with a status outside the expected set.
    #[error("unexpected status {status} for {method} {target}")]
    UnexpectedStatus {
        /// The request method.
        method: Method,
        /// The request target path.
        target: String,
        /// The status the service answered with.
        status: u16,
    },
    /// A HEAD response without the Space-Used field.
    #[error("missing Space-Used field in HEAD response")]
    MissingSpaceUsed,
    /// A Space-Used field that does not hold a decimal integer.
    #[error("malformed Space-Used value {value:?}")]
    MalformedSpaceUsed {
        /// The field value as received.
        value: String,
    },
}

/// A convenience alias that defaults our [`ClientError`] type.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Client for a cache service reachable at `host:port`.
#[derive(Debug, Clone)]
pub struct CacheClient<C: Connector = TcpConnector> {
    connector: C,
    host: String,
    port: u16,
}

impl CacheClient<TcpConnector> {
    /// Creates a client that connects over TCP.
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_connector(TcpConnector, host, port)
    }
}

impl<C: Connector + Clone> CacheClient<C> {
    /// Creates a client over a custom connection source.
    pub fn with_connector(connector: C, host: &str, port: u16) -> Self {
        Self {
            connector,
            host: host.to_owned(),
            port,
        }
    }

    fn exchange(&self, method: Method, target: &str) -> Result<Response> {
        let mut stream = TransportStream::connect_with(self.connector.clone(), &self.host, self.port)?;
        let response = stream.request(method, target)?;
        stream.close()?;
        Ok(response)
    }

    /// Stores `value` under `key` via `PUT /{key}/{value}`.
    ///
    /// `size` is accepted for interface compatibility but is not
    /// transmitted: the wire protocol carries the value inside the request
    /// path and has no length field. Values therefore must not contain the
    /// path separator and are bounded by the longest request line the
    /// service accepts.
    pub fn set(&self, key: &str, value: &str, size: usize) -> Result<()> {
        let _ = size;
        let target = format!("/{key}/{value}");
        let response = self.exchange(Method::Put, &target)?;
        if !response.is_success() {
            return Err(ClientError::UnexpectedStatus {
                method: Method::Put,
                target,
                status: response.status,
            });
        }
        Ok(())
    }

    /// Probes `key` and reports whether the service holds a live entry.
    ///
    /// Only the hit/miss signal is surfaced; the stored value itself is
    /// deliberately not returned. Anything but a success status counts as
    /// a miss.
    pub fn get(&self, key: &str) -> Result<bool> {
        let response = self.exchange(Method::Get, &format!("/{key}"))?;
        match response.status {
            status if (200..300).contains(&status) => Ok(true),
            404 | 0 => Ok(false),
            status => {
                tracing::warn!(status, key, "unexpected status for GET, counting as miss");
                Ok(false)
            }
        }
    }

    /// Removes `key`.
    ///
    /// Returns `false` when the service reports the key as unknown (or
    /// answers outside the expected statuses), `true` on removal.
    pub fn del(&self, key: &str) -> Result<bool> {
        let response = self.exchange(Method::Delete, &format!("/{key}"))?;
        match response.status {
            status if (200..300).contains(&status) => Ok(true),
            404 | 0 => Ok(false),
            status => {
                tracing::warn!(status, key, "unexpected status for DELETE, treating as not found");
                Ok(false)
            }
        }
    }

    /// Reads the service's reported space usage via `HEAD /`.
    ///
    /// A missing or malformed Space-Used field is an error, never a silent
    /// zero.
    pub fn space_used(&self) -> Result<u64> {
        let response = self.exchange(Method::Head, "/")?;
        if !response.is_success() {
            return Err(ClientError::UnexpectedStatus {
                method: Method::Head,
                target: "/".to_owned(),
                status: response.status,
            });
        }
        let value = response.header("Space-Used").ok_or(ClientError::MissingSpaceUsed)?;
        value
            .trim()
            .parse()
            .map_err(|_| ClientError::MalformedSpaceUsed {
                value: value.to_owned(),
            })
    }

    /// Asks the service to drop all entries via `POST /reset`.
    pub fn reset(&self) -> Result<()> {
        let response = self.exchange(Method::Post, "/reset")?;
        if !response.is_success() {
            return Err(ClientError::UnexpectedStatus {
                method: Method::Post,
                target: "/reset".to_owned(),
                status: response.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptConnector;

    fn client(connector: &ScriptConnector) -> CacheClient<ScriptConnector> {
        CacheClient::with_connector(connector.clone(), "cache.test", 8080)
    }

    fn ok_empty() -> &'static str {
        "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"
    }

    #[test]
    fn set_puts_key_and_value_in_the_path() {
        let connector = ScriptConnector::single(ok_empty());
        client(&connector).set("k1", "v1", 2).unwrap();
        assert!(connector.written().starts_with("PUT /k1/v1 HTTP/1.1\r\n"));
    }

    #[test]
    fn set_surfaces_unexpected_status() {
        let connector = ScriptConnector::single("HTTP/1.1 500 Oops\r\nContent-Length: 0\r\n\r\n");
        let err = client(&connector).set("k1", "v1", 2).unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[test]
    fn get_maps_success_to_hit() {
        let connector = ScriptConnector::single(ok_empty());
        assert!(client(&connector).get("k1").unwrap());
    }

    #[test]
    fn get_maps_not_found_to_miss() {
        let connector = ScriptConnector::single("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        assert!(!client(&connector).get("k1").unwrap());
    }

    #[test]
    fn get_counts_unexpected_status_as_miss() {
        let connector = ScriptConnector::single("HTTP/1.1 503 Busy\r\nContent-Length: 0\r\n\r\n");
        assert!(!client(&connector).get("k1").unwrap());
    }

    #[test]
    fn del_distinguishes_removed_from_unknown() {
        let connector = ScriptConnector::new([
            vec![ok_empty()],
            vec!["HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"],
        ]);
        let client = client(&connector);
        assert!(client.del("k1").unwrap());
        assert!(!client.del("k1").unwrap());
    }

    #[test]
    fn space_used_parses_the_header_field() {
        let connector =
            ScriptConnector::single("HTTP/1.1 200 OK\r\nSpace-Used: 12345\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(client(&connector).space_used().unwrap(), 12345);
    }

    #[test]
    fn space_used_missing_field_is_an_error() {
        let connector = ScriptConnector::single(ok_empty());
        let err = client(&connector).space_used().unwrap_err();
        assert!(matches!(err, ClientError::MissingSpaceUsed));
    }

    #[test]
    fn space_used_malformed_field_is_an_error_not_zero() {
        let connector =
            ScriptConnector::single("HTTP/1.1 200 OK\r\nSpace-Used: lots\r\nContent-Length: 0\r\n\r\n");
        let err = client(&connector).space_used().unwrap_err();
        assert!(matches!(err, ClientError::MalformedSpaceUsed { .. }));
    }

    #[test]
    fn reset_posts_the_reset_path() {
        let connector = ScriptConnector::single(ok_empty());
        client(&connector).reset().unwrap();
        assert!(connector.written().starts_with("POST /reset HTTP/1.1\r\n"));
    }

    #[test]
    fn every_call_opens_its_own_connection() {
        let connector = ScriptConnector::new([vec![ok_empty()], vec![ok_empty()]]);
        let client = client(&connector);
        client.get("a").unwrap();
        client.get("b").unwrap();
        assert_eq!(connector.connects(), 2);
    }
}
