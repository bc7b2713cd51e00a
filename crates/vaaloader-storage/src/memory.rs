//! In-memory storage backend.
//!
//! Keeps one `VaaDocument` per message id in RAM. Used by tests and by
//! `--dry-run`, where lines are decoded and counted but nothing is persisted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use vaaloader_core::error::StorageError;
use vaaloader_core::repository::{VaaDocument, VaaRepository};
use vaaloader_core::vaa::Vaa;

/// In-memory VAA repository.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryRepository {
    documents: Mutex<HashMap<String, VaaDocument>>,
    upserts: AtomicU64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored document by message id.
    pub fn get(&self, id: &str) -> Option<VaaDocument> {
        self.documents().get(id).cloned()
    }

    /// Number of distinct records stored.
    pub fn len(&self) -> usize {
        self.documents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored message ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Each critical section is a single map call, so a poisoned lock still
    /// guards consistent data.
    fn documents(&self) -> MutexGuard<'_, HashMap<String, VaaDocument>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Total upsert calls, including repeats of the same id.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl VaaRepository for InMemoryRepository {
    async fn upsert(&self, vaa: &Vaa, raw: &[u8]) -> Result<(), StorageError> {
        let doc = VaaDocument::from_vaa(vaa, raw);
        self.documents().insert(doc.id.clone(), doc);
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vaa(chain: u16, sequence: u64) -> Vaa {
        Vaa {
            version: 1,
            guardian_set_index: 0,
            signatures: vec![],
            timestamp: 1_700_000_000,
            nonce: 0,
            emitter_chain: chain,
            emitter_address: [0x01; 32],
            sequence,
            consistency_level: 1,
            payload: vec![0xde, 0xad],
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = InMemoryRepository::new();
        let v = vaa(2, 10);
        let raw = v.to_bytes();

        store.upsert(&v, &raw).await.unwrap();
        store.upsert(&v, &raw).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.upsert_count(), 2);
        assert_eq!(store.get(&v.message_id()).unwrap().vaas, raw);
    }

    #[tokio::test]
    async fn distinct_sequences_are_distinct_records() {
        let store = InMemoryRepository::new();
        for seq in 0..5 {
            let v = vaa(1, seq);
            store.upsert(&v, &v.to_bytes()).await.unwrap();
        }
        let other_chain = vaa(4, 0);
        store.upsert(&other_chain, &other_chain.to_bytes()).await.unwrap();

        assert_eq!(store.len(), 6);
        assert!(store.ids().iter().any(|id| id.starts_with("4/")));
    }

    #[tokio::test]
    async fn poisoned_lock_keeps_serving() {
        let store = std::sync::Arc::new(InMemoryRepository::new());
        let v = vaa(3, 1);
        store.upsert(&v, &v.to_bytes()).await.unwrap();

        let holder = store.clone();
        let poisoned = std::thread::spawn(move || {
            let _guard = holder.documents.lock().unwrap();
            panic!("poison the store");
        })
        .join();
        assert!(poisoned.is_err());
        assert!(store.documents.is_poisoned());

        assert_eq!(store.len(), 1);
        assert_eq!(store.ids(), vec![v.message_id()]);
        assert!(store.get(&v.message_id()).is_some());

        let w = vaa(3, 2);
        store.upsert(&w, &w.to_bytes()).await.unwrap();
        assert_eq!(store.len(), 2);
    }
}
