use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The (h, d) pair cannot be represented: h must be a positive multiple
    /// of both d and 20, with h/20 and d in 1..=15 and the per-layer height
    /// below 32.
    #[error("invalid h or d")]
    InvalidParams,
    /// A serialized public key had the wrong size.
    #[error("invalid bytes length")]
    InvalidLength,
    /// Every one-time leaf has been used; the key must not sign again.
    #[error("one-time leaves exhausted after {0} signatures")]
    LeavesExhausted(u64),
    /// The signature index only moves forward; rewinding it would reuse a
    /// one-time leaf and leak the private key.
    #[error("cannot rewind the signature index to {requested} from {current}")]
    IndexRewind { requested: u64, current: u64 },
}
