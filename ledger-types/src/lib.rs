//! # ledger-types
//!
//! Wire format types for the blockdb ledger RPC surface.
//!
//! This crate provides the types shared by the client facade and the chaos
//! harness:
//! - [`AccountId`] - Opaque account identifier, random per test run
//! - [`Request`] / [`Response`] - The six ledger operations and their replies
//! - [`CodecError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;

pub use error::CodecError;
pub use ids::AccountId;
pub use messages::{Request, Response, MAX_MESSAGE_SIZE};
