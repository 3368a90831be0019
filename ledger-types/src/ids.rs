//! Account identity.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a ledger account.
///
/// Opaque to the harness. Generated randomly per run as `user_<n>` where `n`
/// is a non-negative 63-bit integer, so collisions within a run are
/// negligible.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let n: i64 = rng.gen_range(0..i64::MAX);
        Self(format!("user_{n}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
