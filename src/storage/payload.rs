use bytes::Bytes;
use std::collections::HashMap;

use crate::storage::hasher;

/// A stored payload and the number of attachment records pointing at it.
#[derive(Debug)]
struct Payload {
    data: Bytes,
    refs: usize,
}

/// Attachment payload bytes, deduplicated by content.
///
/// Two attachments with identical bytes share one entry. The entry is freed
/// when the last attachment referencing it is released.
#[derive(Debug, Default)]
pub struct PayloadStore {
    blobs: HashMap<String, Payload>,
}

impl PayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` (or finds the identical payload already stored) and
    /// takes a reference to it. Returns the content key.
    pub fn retain_data(&mut self, data: Bytes) -> String {
        let key = hasher::content_key(&data);

        match self.blobs.get_mut(&key) {
            Some(existing) => {
                existing.refs += 1;
                tracing::debug!("Payload dedup hit: {} (refs {})", key, existing.refs);
            }
            None => {
                self.blobs.insert(key.clone(), Payload { data, refs: 1 });
            }
        }

        key
    }

    /// Takes another reference to an already stored payload.
    pub fn retain(&mut self, key: &str) -> bool {
        match self.blobs.get_mut(key) {
            Some(existing) => {
                existing.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference; frees the payload when none remain.
    pub fn release(&mut self, key: &str) {
        let Some(existing) = self.blobs.get_mut(key) else {
            return;
        };

        existing.refs -= 1;

        if existing.refs == 0 {
            self.blobs.remove(key);
            tracing::debug!("Payload {} freed", key);
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.get(key).map(|p| p.data.clone())
    }

    pub fn size_of(&self, key: &str) -> usize {
        self.blobs.get(key).map(|p| p.data.len()).unwrap_or(0)
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.blobs.get(key).map(|p| p.refs).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_data_is_shared() {
        let mut store = PayloadStore::new();
        let a = store.retain_data(Bytes::from_static(b"same"));
        let b = store.retain_data(Bytes::from_static(b"same"));
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.ref_count(&a), 2);
    }

    #[test]
    fn test_last_release_frees() {
        let mut store = PayloadStore::new();
        let key = store.retain_data(Bytes::from_static(b"data"));
        assert!(store.retain(&key));

        store.release(&key);
        assert_eq!(store.get(&key), Some(Bytes::from_static(b"data")));

        store.release(&key);
        assert!(store.get(&key).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_distinct_data_not_shared() {
        let mut store = PayloadStore::new();
        let a = store.retain_data(Bytes::from_static(b"one"));
        let b = store.retain_data(Bytes::from_static(b"two"));
        assert_ne!(a, b);
        assert_eq!(store.size_of(&a), 3);
        store.release(&a);
        assert!(store.get(&b).is_some());
    }
}
