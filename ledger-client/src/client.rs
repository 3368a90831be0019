//! LedgerClient - the RPC facade over the ledger service.
//!
//! Every call dials a fresh connection, issues exactly one request, and
//! closes the connection again. There is no pooling: each operation has to
//! rediscover whether the service is up, which is what a crash/restart test
//! wants.
//!
//! ```text
//! WorkloadDriver → LedgerClient → Transport → Network → ledger service
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ledger_client::{LedgerClient, ClientConfig, TcpTransport};
//!
//! let client = LedgerClient::new("127.0.0.1:50051", TcpTransport::new(), ClientConfig::default());
//! client.put(&account, 10_000).await?;
//! let balance = client.get(&account).await?;
//! ```

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

use ledger_types::{AccountId, CodecError, Request, Response};

use crate::policy::ConnectPolicy;
use crate::transport::{Connection, Transport, TransportError};

/// Reasons a single RPC did not produce a result.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request or response was lost on the wire.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The service answered with an explicit error.
    #[error("service unavailable: {reason}")]
    Service {
        /// Reason reported by the service.
        reason: String,
    },

    /// The service answered with the wrong kind of response.
    #[error("unexpected response to {operation}: {kind}")]
    UnexpectedResponse {
        /// Operation that was issued.
        operation: &'static str,
        /// Kind of response that came back.
        kind: &'static str,
    },
}

/// Configuration for LedgerClient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Pause after a failed RPC, so callers that retry do not hot-loop
    /// against a dead service.
    pub failure_delay: Duration,
    /// Wait between failed dials.
    pub connect: ConnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            failure_delay: Duration::from_millis(500),
            connect: ConnectPolicy::default(),
        }
    }
}

/// Connection-per-call client for the ledger service.
pub struct LedgerClient<T: Transport> {
    address: String,
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> LedgerClient<T> {
    /// Create a client for the service at `address`.
    pub fn new(address: impl Into<String>, transport: T, config: ClientConfig) -> Self {
        Self {
            address: address.into(),
            transport,
            config,
        }
    }

    /// Read the balance of `account`.
    pub async fn get(&self, account: &AccountId) -> Result<i32, RpcError> {
        let value = self
            .invoke(
                Request::Get {
                    account: account.clone(),
                },
                |response| match response {
                    Response::Balance { value } => Ok(value),
                    other => Err(other),
                },
            )
            .await?;
        debug!("GET {}: {}", account, value);
        Ok(value)
    }

    /// Set the balance of `account` to `value`.
    pub async fn put(&self, account: &AccountId, value: i32) -> Result<bool, RpcError> {
        let success = self
            .invoke(
                Request::Put {
                    account: account.clone(),
                    value,
                },
                success,
            )
            .await?;
        debug!("PUT {} {}: {}", account, value, success);
        Ok(success)
    }

    /// Add `value` to the balance of `account`.
    pub async fn deposit(&self, account: &AccountId, value: i32) -> Result<bool, RpcError> {
        let success = self
            .invoke(
                Request::Deposit {
                    account: account.clone(),
                    value,
                },
                success,
            )
            .await?;
        debug!("DEPOSIT {} {}: {}", account, value, success);
        Ok(success)
    }

    /// Remove `value` from the balance of `account`.
    pub async fn withdraw(&self, account: &AccountId, value: i32) -> Result<bool, RpcError> {
        let success = self
            .invoke(
                Request::Withdraw {
                    account: account.clone(),
                    value,
                },
                success,
            )
            .await?;
        debug!("WITHDRAW {} {}: {}", account, value, success);
        Ok(success)
    }

    /// Move `value` from `from` to `to`.
    ///
    /// Not idempotent. An `Err` does not tell whether the service applied
    /// the transfer before the response was lost.
    pub async fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        value: i32,
    ) -> Result<bool, RpcError> {
        let success = self
            .invoke(
                Request::Transfer {
                    from: from.clone(),
                    to: to.clone(),
                    value,
                },
                success,
            )
            .await?;
        debug!("TRANSFER {} {} {}: {}", from, to, value, success);
        Ok(success)
    }

    /// Size of the service's operation log.
    pub async fn log_length(&self) -> Result<i32, RpcError> {
        let value = self
            .invoke(Request::LogLength, |response| match response {
                Response::LogLength { value } => Ok(value),
                other => Err(other),
            })
            .await?;
        debug!("LOG_LENGTH: {}", value);
        Ok(value)
    }

    /// Dial, exchange one request, release the connection.
    ///
    /// The connection belongs to this call alone and is released when it
    /// goes out of scope, including when the call is cancelled.
    /// On failure the error is logged and the call sleeps `failure_delay`
    /// before returning it. The RPC itself is never retried here.
    async fn invoke<R>(
        &self,
        request: Request,
        extract: impl FnOnce(Response) -> Result<R, Response>,
    ) -> Result<R, RpcError> {
        let operation = request.operation();

        let mut connection = self.dial().await;
        let exchanged = exchange(&mut connection, &request).await;
        if let Err(e) = connection.close().await {
            trace!("{} close failed: {}", operation, e);
        }
        drop(connection);

        let result = exchanged.and_then(|response| match response {
            Response::Error { reason } => Err(RpcError::Service { reason }),
            other => extract(other).map_err(|unexpected| RpcError::UnexpectedResponse {
                operation,
                kind: unexpected.kind(),
            }),
        });

        if let Err(e) = &result {
            warn!("{} Error: {}", operation, e);
            tokio::time::sleep(self.config.failure_delay).await;
        }
        result
    }

    /// Connect, retrying until the service accepts. Never fails.
    async fn dial(&self) -> T::Connection {
        let mut attempt: u32 = 0;
        loop {
            match self.transport.connect(&self.address).await {
                Ok(connection) => {
                    if attempt > 0 {
                        debug!("connected to {} after {} failed dials", self.address, attempt);
                    }
                    return connection;
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    trace!("dial {} failed (attempt {}): {}", self.address, attempt, e);
                    let delay = self.config.connect.delay_for(attempt);
                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

async fn exchange<C: Connection>(
    connection: &mut C,
    request: &Request,
) -> Result<Response, RpcError> {
    let bytes = request.to_bytes()?;
    connection.send(&bytes).await?;
    let reply = connection.recv().await?;
    Ok(Response::from_bytes(&reply)?)
}

fn success(response: Response) -> Result<bool, Response> {
    match response {
        Response::Success { success } => Ok(success),
        other => Err(other),
    }
}
