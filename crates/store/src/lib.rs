//! Content-addressed object storage underpinning dataset snapshots.
//!
//! A snapshot is written as a bundle of component blobs plus one
//! directory-like "node" object whose links name the component addresses.
//! The engine is polymorphic over any [`ObjectStore`]: blobs go in via
//! [`ObjectStore::put`] (or [`ObjectStore::put_stream`] for bodies), come
//! back out via [`ObjectStore::get`], and node objects group links under a
//! single root address. Identical bytes always yield the identical address,
//! so re-writing an unchanged component is a no-op.

mod address;
mod file;
mod memory;

pub use address::Address;
pub use file::FileStore;
pub use memory::MemoryStore;

use bytes::Bytes;
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Errors of the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(Address),

    #[error("malformed address: {0:?}")]
    MalformedAddress(Address),

    #[error("object at {0} is not a node")]
    MalformedNode(Address),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A directory-like grouping of named links to child addresses.
pub type Links = BTreeMap<String, Address>;

/// The capability set the snapshot engine consumes. Implementations must be
/// safe for concurrent use; the engine never mutates a stored object.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short identifier naming the store implementation. It becomes the
    /// leading segment of every address this store issues.
    fn kind(&self) -> &'static str;

    /// Whether addresses are derived from object content. Affects how the
    /// engine records body checksums.
    fn is_content_addressed(&self) -> bool {
        true
    }

    /// Store a blob, returning its address.
    async fn put(&self, data: Bytes) -> Result<Address, StoreError>;

    /// Retrieve a blob by address.
    async fn get(&self, address: &Address) -> Result<Bytes, StoreError>;

    /// Whether a blob exists at `address`.
    async fn has(&self, address: &Address) -> Result<bool, StoreError>;

    /// Store a node object mapping link names to child addresses, returning
    /// the node's own address. Node objects are canonical JSON, so equal
    /// link maps produce equal addresses.
    async fn put_node(&self, links: &Links) -> Result<Address, StoreError> {
        let encoded = serde_json::to_vec(links).expect("links always encode");
        self.put(encoded.into()).await
    }

    /// Retrieve and decode a node object.
    async fn get_node(&self, address: &Address) -> Result<Links, StoreError> {
        let raw = self.get(address).await?;
        serde_json::from_slice(&raw).map_err(|_| StoreError::MalformedNode(address.clone()))
    }

    /// Store the full contents of a reader. The default implementation
    /// buffers; implementations with spill-to-disk paths may override.
    async fn put_stream(
        &self,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Address, StoreError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.put(data.into()).await
    }

    /// Hint that `address` should be retained by the store. No-op by default.
    async fn pin(&self, _address: &Address) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn node_roundtrip_through_memory_store() {
        let store = MemoryStore::default();
        let a = store.put(Bytes::from_static(b"alpha")).await.unwrap();
        let b = store.put(Bytes::from_static(b"beta")).await.unwrap();

        let links: Links = [("a.json".to_string(), a), ("b.json".to_string(), b)]
            .into_iter()
            .collect();
        let root = store.put_node(&links).await.unwrap();

        assert_eq!(store.get_node(&root).await.unwrap(), links);
        // Equal link maps land at the equal address.
        assert_eq!(store.put_node(&links).await.unwrap(), root);
    }

    #[tokio::test]
    async fn get_node_rejects_non_node_objects() {
        let store = MemoryStore::default();
        let blob = store.put(Bytes::from_static(b"not json")).await.unwrap();
        match store.get_node(&blob).await {
            Err(StoreError::MalformedNode(addr)) => assert_eq!(addr, blob),
            other => panic!("expected MalformedNode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn put_stream_matches_put() {
        let store = MemoryStore::default();
        let direct = store.put(Bytes::from_static(b"stream me")).await.unwrap();
        let mut reader: &[u8] = b"stream me";
        let streamed = store.put_stream(&mut reader).await.unwrap();
        assert_eq!(direct, streamed);
    }
}
