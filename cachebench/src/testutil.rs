//! Scripted in-memory connections for exercising the transport and client
//! without a network peer.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::transport::{Connection, Connector, TransportError};

#[derive(Debug, Default)]
struct ScriptState {
    /// Remaining scripted connections; each one is the sequence of chunks
    /// its reads will yield before reporting end of stream.
    connections: VecDeque<VecDeque<Vec<u8>>>,
    connects: usize,
    written: Vec<u8>,
}

/// Hands out scripted connections in order and records everything written
/// to any of them.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptConnector(Arc<Mutex<ScriptState>>);

impl ScriptConnector {
    pub(crate) fn new<I, S>(connections: I) -> Self
    where
        I: IntoIterator<Item = Vec<S>>,
        S: AsRef<[u8]>,
    {
        let connections = connections
            .into_iter()
            .map(|reads| reads.into_iter().map(|read| read.as_ref().to_vec()).collect())
            .collect();
        Self(Arc::new(Mutex::new(ScriptState {
            connections,
            ..Default::default()
        })))
    }

    /// A single connection whose reads yield `response` in one chunk and
    /// then end of stream.
    pub(crate) fn single(response: &str) -> Self {
        Self::new([vec![response]])
    }

    /// How many connections were handed out so far.
    pub(crate) fn connects(&self) -> usize {
        self.0.lock().unwrap().connects
    }

    /// Everything written across all handed-out connections.
    pub(crate) fn written(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().written.clone()).unwrap()
    }
}

#[derive(Debug)]
pub(crate) struct ScriptConnection {
    reads: VecDeque<Vec<u8>>,
    state: Arc<Mutex<ScriptState>>,
}

impl Read for ScriptConnection {
    // Chunks are assumed to fit the caller's read buffer.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reads.pop_front() {
            None => Ok(0),
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
        }
    }
}

impl Write for ScriptConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.lock().unwrap().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for ScriptConnection {
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connector for ScriptConnector {
    type Conn = ScriptConnection;

    fn connect(&self, _host: &str, _port: u16) -> Result<ScriptConnection, TransportError> {
        let mut state = self.0.lock().unwrap();
        state.connects += 1;
        let reads = state.connections.pop_front().unwrap_or_default();
        Ok(ScriptConnection {
            reads,
            state: Arc::clone(&self.0),
        })
    }
}
