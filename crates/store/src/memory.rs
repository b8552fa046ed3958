use super::{Address, ObjectStore, StoreError};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-memory object store. The workhorse of tests, and a reasonable cache
/// layer: objects live in a map keyed by their full address.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<Address, Bytes>>,
    pinned: RwLock<HashSet<Address>>,
}

impl MemoryStore {
    /// Number of distinct objects held.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `address` has been pinned. Tests assert against this.
    pub fn is_pinned(&self, address: &Address) -> bool {
        self.pinned.read().unwrap().contains(address)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "mem"
    }

    async fn put(&self, data: Bytes) -> Result<Address, StoreError> {
        let address = Address::from_content(self.kind(), &data);
        self.objects.write().unwrap().insert(address.clone(), data);
        Ok(address)
    }

    async fn get(&self, address: &Address) -> Result<Bytes, StoreError> {
        self.objects
            .read()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(address.clone()))
    }

    async fn has(&self, address: &Address) -> Result<bool, StoreError> {
        Ok(self.objects.read().unwrap().contains_key(address))
    }

    async fn pin(&self, address: &Address) -> Result<(), StoreError> {
        self.pinned.write().unwrap().insert(address.clone());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn put_get_has() {
        let store = MemoryStore::default();
        let addr = store.put(Bytes::from_static(b"payload")).await.unwrap();

        assert!(store.has(&addr).await.unwrap());
        assert_eq!(store.get(&addr).await.unwrap(), Bytes::from_static(b"payload"));

        let missing = Address::from_content("mem", b"absent");
        assert!(!store.has(&missing).await.unwrap());
        assert!(matches!(
            store.get(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn rewriting_identical_bytes_is_a_noop() {
        let store = MemoryStore::default();
        let first = store.put(Bytes::from_static(b"same")).await.unwrap();
        let second = store.put(Bytes::from_static(b"same")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn pin_records_the_hint() {
        let store = MemoryStore::default();
        let addr = store.put(Bytes::from_static(b"keep")).await.unwrap();
        assert!(!store.is_pinned(&addr));
        store.pin(&addr).await.unwrap();
        assert!(store.is_pinned(&addr));
    }
}
