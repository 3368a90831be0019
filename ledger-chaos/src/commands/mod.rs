//! CLI command implementations.

pub mod op;
pub mod run;
