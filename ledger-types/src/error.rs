//! Error types for the ledger wire format.

use thiserror::Error;

/// Errors that can occur while encoding or decoding ledger messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Frame exceeds the maximum message size
    #[error("message too large: {size} > {limit}")]
    TooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::TooLarge {
            size: 2048,
            limit: 1024,
        };
        assert_eq!(err.to_string(), "message too large: 2048 > 1024");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecError>();
    }
}
