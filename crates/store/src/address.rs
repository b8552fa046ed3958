use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Address of an object within a content-addressed store, rendered as
/// `/<kind>/<hex digest>`. The `kind` segment names the store implementation
/// which issued the address, so that addresses from different stores remain
/// distinguishable after they've been copied into component fields.
///
/// Addresses are opaque to everything above the store layer: components carry
/// them around and hand them back, but never inspect the digest.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Compute the address of `data` as issued by a store named `kind`.
    pub fn from_content(kind: &str, data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(format!("/{kind}/{}", hex::encode(digest)))
    }

    /// The store-kind segment, if this address is well formed.
    pub fn kind(&self) -> Option<&str> {
        self.split().map(|(kind, _)| kind)
    }

    /// The digest segment, if this address is well formed.
    pub fn digest(&self) -> Option<&str> {
        self.split().map(|(_, digest)| digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn split(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix('/')?;
        let (kind, digest) = rest.split_once('/')?;
        if kind.is_empty() || digest.is_empty() {
            None
        } else {
            Some((kind, digest))
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
