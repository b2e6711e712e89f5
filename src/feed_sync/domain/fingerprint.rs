use sha1::{Digest, Sha1};
use std::fmt;

/// Content digest of a decompressed feed, stored as lowercase hex.
///
/// The aggregate feed has no stable content, so it is always stored with
/// the empty fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the SHA-1 fingerprint of the given bytes
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(content);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Wraps a digest previously read back from storage
    pub fn from_stored(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
