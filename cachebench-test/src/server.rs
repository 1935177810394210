//! Exposes an in-process stub cache service for use in integration tests.
//!
//! The stub speaks the harness's wire protocol: PUT `/{key}/{value}`
//! stores, GET `/{key}` probes, DELETE `/{key}` removes, HEAD `/` reports
//! the "Space-Used" field, and POST `/reset` clears all entries. Like the
//! services the harness targets, it serves one request per connection and
//! then closes its side.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// An in-process stub cache service for integration tests.
///
/// The server stores entries in memory, listens on a random available
/// port on localhost, and accounts space as the byte length of all stored
/// keys and values. It shuts down when dropped.
#[derive(Debug)]
pub struct TestServer {
    socket: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Binds a random localhost port and starts serving.
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let socket = listener.local_addr().unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || serve(listener, &flag));

        Self {
            socket,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Host the server listens on.
    pub fn host(&self) -> String {
        self.socket.ip().to_string()
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.socket.port()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Unblock the accept loop so it observes the flag.
        let _ = TcpStream::connect(self.socket);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(listener: TcpListener, shutdown: &AtomicBool) {
    let mut entries: HashMap<String, String> = HashMap::new();

    for stream in listener.incoming() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let Ok(stream) = stream else { continue };
        let _ = handle_request(stream, &mut entries);
    }
}

fn handle_request(stream: TcpStream, entries: &mut HashMap<String, String>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    // Drain headers until the blank line.
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let target = parts.next().unwrap_or_default().to_owned();
    let path = target.strip_prefix('/').unwrap_or(&target);

    let mut stream = reader.into_inner();
    match method.as_str() {
        "PUT" => match path.split_once('/') {
            Some((key, value)) => {
                entries.insert(key.to_owned(), value.to_owned());
                respond(&mut stream, 200, &[], "")
            }
            None => respond(&mut stream, 400, &[], ""),
        },
        "GET" => match entries.get(path) {
            Some(value) => respond(&mut stream, 200, &[], value),
            None => respond(&mut stream, 404, &[], ""),
        },
        "DELETE" => {
            if entries.remove(path).is_some() {
                respond(&mut stream, 200, &[], "")
            } else {
                respond(&mut stream, 404, &[], "")
            }
        }
        "HEAD" => {
            let space: usize = entries.iter().map(|(key, value)| key.len() + value.len()).sum();
            respond(&mut stream, 200, &[("Space-Used", &space.to_string())], "")
        }
        "POST" if path == "reset" => {
            entries.clear();
            respond(&mut stream, 200, &[], "")
        }
        _ => respond(&mut stream, 400, &[], ""),
    }
}

fn respond(
    stream: &mut TcpStream,
    status: u16,
    headers: &[(&str, &str)],
    body: &str,
) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Bad Request",
    };
    let mut response = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
    stream.write_all(response.as_bytes())
    // Dropping the stream closes the connection; one request per connection.
}
