//! # ledger-client
//!
//! RPC client facade for the blockdb ledger service.
//!
//! This crate provides:
//! - [`LedgerClient`] - Connection-per-call facade over the six ledger operations
//! - [`Transport`] trait - Pluggable transport layer handing out one
//!   [`Connection`] per call
//! - [`TcpTransport`] - Length-prefixed frames over TCP
//! - [`MockTransport`] - Scriptable transport for tests
//! - [`ConnectPolicy`] - Backoff between failed dials

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod policy;
pub mod transport;

pub use client::{ClientConfig, LedgerClient, RpcError};
pub use policy::ConnectPolicy;
pub use transport::{
    Connection, MockConnection, MockTransport, TcpConnection, TcpTransport, TcpTransportConfig,
    Transport, TransportError,
};

pub use ledger_types::AccountId;
