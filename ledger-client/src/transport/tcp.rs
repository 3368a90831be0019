//! TcpTransport - plain TCP with length-prefixed framing.

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use ledger_types::MAX_MESSAGE_SIZE;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Configuration for TcpTransport.
#[derive(Clone, Debug, Default)]
pub struct TcpTransportConfig {
    /// Dial timeout. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

/// TcpTransport dials one TCP stream per connection.
///
/// Frames are a 4-byte big-endian length followed by the payload.
///
/// # Example
///
/// ```ignore
/// let transport = TcpTransport::new();
/// let mut connection = transport.connect("127.0.0.1:50051").await?;
/// connection.send(b"hello").await?;
/// let response = connection.recv().await?;
/// ```
#[derive(Debug, Default)]
pub struct TcpTransport {
    config: TcpTransportConfig,
}

impl TcpTransport {
    /// Create a new TcpTransport with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new TcpTransport with custom configuration.
    pub fn with_config(config: TcpTransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn connect(&self, address: &str) -> Result<TcpConnection, TransportError> {
        let dial = TcpStream::connect(address);
        let stream = match self.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, dial)
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => dial.await,
        }
        .map_err(|e| TransportError::ConnectionFailed(format!("{address}: {e}")))?;

        stream.set_nodelay(true).ok();

        Ok(TcpConnection {
            stream: Some(stream),
        })
    }
}

/// One TCP stream. The socket is closed when the connection is dropped.
#[derive(Debug)]
pub struct TcpConnection {
    stream: Option<TcpStream>,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::SendFailed(format!(
                "Message too large: {} > {}",
                data.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let len = (data.len() as u32).to_be_bytes();
        stream
            .write_all(&len)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to write length: {e}")))?;
        stream
            .write_all(data)
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to write data: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to flush: {e}")))?;

        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::ConnectionClosed
            } else {
                TransportError::ReceiveFailed(format!("Failed to read length: {e}"))
            }
        })?;

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(TransportError::ReceiveFailed(format!(
                "Message too large: {} > {}",
                len, MAX_MESSAGE_SIZE
            )));
        }

        let mut data = vec![0u8; len];
        stream
            .read_exact(&mut data)
            .await
            .map_err(|e| TransportError::ReceiveFailed(format!("Failed to read data: {e}")))?;

        Ok(data)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            // The peer may already be gone.
            stream.shutdown().await.ok();
        }
        Ok(())
    }
}
