//! Transport abstraction for the ledger client.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (TCP, mock for testing).
//!
//! # Design
//!
//! A transport is a dialer. Each `connect()` hands back a fresh
//! [`Connection`] that owns its stream:
//! - `send()` transmits one encoded request
//! - `recv()` receives one encoded response
//! - `close()` shuts the connection down gracefully
//!
//! Dropping a connection releases it, so a caller that is cancelled
//! mid-exchange never leaves a socket behind. Concurrent callers each get
//! their own connection.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! let mut connection = transport.connect("127.0.0.1:50051").await?;
//! connection.send(&request_bytes).await?;
//! let response = connection.recv().await?;
//! connection.close().await?;
//! ```

mod mock;
mod tcp;

pub use mock::{MockConnection, MockTransport};
pub use tcp::{TcpConnection, TcpTransport, TcpTransportConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Connection timeout.
    #[error("connection timeout")]
    Timeout,
}

/// Transport trait for dialing the ledger service.
///
/// Implementations handle the underlying connection mechanism
/// (TCP, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connection produced by a successful dial.
    type Connection: Connection;

    /// Connect to the service at the given address (`ip:port` for TCP).
    async fn connect(&self, address: &str) -> Result<Self::Connection, TransportError>;
}

/// One open connection. Released when dropped.
#[async_trait]
pub trait Connection: Send {
    /// Send one frame over the connection.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one frame from the connection.
    ///
    /// Blocks until data is available or connection closes.
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Shut the connection down. Later sends and receives fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}
