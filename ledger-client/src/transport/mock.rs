//! Mock transport for testing.
//!
//! Queues responses, captures sent frames, and injects connect, send and
//! receive failures. Tracks how many connections are open so tests can
//! check that every call releases its connection.

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock transport for testing.
///
/// Clones share state, so a test can keep a handle while the client owns
/// another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected_address: Option<String>,
    connect_attempts: usize,
    open_connections: usize,
    released: usize,
    sent_messages: Vec<Vec<u8>>,
    receive_queue: VecDeque<Vec<u8>>,
    failing_connects: usize,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
    stall_recv: bool,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame to be returned by the next `recv()` call.
    pub fn queue_response(&self, data: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.receive_queue.push_back(data);
    }

    /// Get all frames that were sent.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Get the last frame that was sent.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.last().cloned()
    }

    /// Get the address that was last connected to.
    pub fn connected_address(&self) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.connected_address.clone()
    }

    /// Number of `connect()` calls, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.inner.lock().unwrap().connect_attempts
    }

    /// Connections handed out and not yet dropped.
    pub fn open_connections(&self) -> usize {
        self.inner.lock().unwrap().open_connections
    }

    /// Connections dropped so far.
    pub fn released(&self) -> usize {
        self.inner.lock().unwrap().released
    }

    /// Cause the next `count` connect() calls to fail.
    pub fn fail_connects(&self, count: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_connects = count;
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Cause the next recv() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_recv = Some(error.to_string());
    }

    /// Make every recv() wait forever, like a service that never answers.
    pub fn stall_recv(&self) {
        self.inner.lock().unwrap().stall_recv = true;
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn connect(&self, address: &str) -> Result<MockConnection, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connect_attempts += 1;

        if inner.failing_connects > 0 {
            inner.failing_connects -= 1;
            return Err(TransportError::ConnectionFailed("connection refused".into()));
        }

        inner.connected_address = Some(address.to_string());
        inner.open_connections += 1;
        Ok(MockConnection {
            inner: Arc::clone(&self.inner),
            closed: false,
        })
    }
}

/// Connection handed out by [`MockTransport`].
#[derive(Debug)]
pub struct MockConnection {
    inner: Arc<Mutex<MockTransportInner>>,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::NotConnected);
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push(data.to_vec());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::NotConnected);
        }

        {
            let mut inner = self.inner.lock().unwrap();
            if let Some(error) = inner.fail_next_recv.take() {
                return Err(TransportError::ReceiveFailed(error));
            }
            if !inner.stall_recv {
                return inner
                    .receive_queue
                    .pop_front()
                    .ok_or(TransportError::ConnectionClosed);
            }
        }

        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.open_connections -= 1;
            inner.released += 1;
        }
    }
}
