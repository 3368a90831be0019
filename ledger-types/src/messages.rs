//! Request and response messages for the ledger RPC surface.
//!
//! Each connection carries exactly one [`Request`] followed by one
//! [`Response`], each as a length-prefixed MessagePack frame.

use serde::{Deserialize, Serialize};

use crate::{AccountId, CodecError};

/// Maximum encoded message size (1MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// The six operations exposed by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Read the current balance of an account.
    Get {
        /// Account to read.
        account: AccountId,
    },
    /// Set (or initialize) the balance of an account.
    Put {
        /// Account to write.
        account: AccountId,
        /// New balance.
        value: i32,
    },
    /// Increase the balance of an account.
    Deposit {
        /// Account to credit.
        account: AccountId,
        /// Amount to add.
        value: i32,
    },
    /// Decrease the balance of an account; may be declined on insufficient funds.
    Withdraw {
        /// Account to debit.
        account: AccountId,
        /// Amount to remove.
        value: i32,
    },
    /// Atomically move funds between two accounts.
    Transfer {
        /// Source account.
        from: AccountId,
        /// Destination account.
        to: AccountId,
        /// Amount to move.
        value: i32,
    },
    /// Size of the service's operation log.
    LogLength,
}

impl Request {
    /// Operation name used in log lines.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Get { .. } => "GET",
            Request::Put { .. } => "PUT",
            Request::Deposit { .. } => "DEPOSIT",
            Request::Withdraw { .. } => "WITHDRAW",
            Request::Transfer { .. } => "TRANSFER",
            Request::LogLength => "LOG_LENGTH",
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}

/// Replies sent by the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Reply to `Get`.
    Balance {
        /// Current balance.
        value: i32,
    },
    /// Reply to `Put`, `Deposit`, `Withdraw` and `Transfer`.
    Success {
        /// Whether the service applied the operation.
        success: bool,
    },
    /// Reply to `LogLength`.
    LogLength {
        /// Number of entries in the operation log.
        value: i32,
    },
    /// The service could not serve the request (e.g. still recovering).
    Error {
        /// Human-readable reason.
        reason: String,
    },
}

impl Response {
    /// Short name of the response kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Balance { .. } => "Balance",
            Response::Success { .. } => "Success",
            Response::LogLength { .. } => "LogLength",
            Response::Error { .. } => "Error",
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        encode(self)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let bytes = rmp_serde::to_vec_named(message).map_err(CodecError::Serialization)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::TooLarge {
            size: bytes.len(),
            limit: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}
