//! SHA-256 content digests
//!
//! A [`Digest`] is the fixed-length fingerprint used to decide whether the
//! bytes on disk already match the desired payload. It renders in the
//! canonical format `sha256:<hex>`.

use sha2::digest::Output;
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Prefix for the rendered form of every digest
const PREFIX: &str = "sha256:";

/// SHA-256 digest of a byte payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(Output<Sha256>);

impl Digest {
    /// Compute the digest of `content`. Empty input is valid.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:x}", PREFIX, self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// Compute the SHA-256 digest of a byte payload.
pub fn digest(content: &[u8]) -> Digest {
    Digest::of(content)
}
