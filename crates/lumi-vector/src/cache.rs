//! In-memory embedding cache keyed by `(embedder_id, content_hash)`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

pub fn hash_content(s: &str) -> String {
    let h = blake3::hash(s.as_bytes());
    h.to_hex().to_string()
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[derive(Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), Vec<f32>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached vectors for the given hashes; misses are simply absent.
    pub fn get_many(&self, embedder_id: &str, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        let entries = self.lock();
        hashes
            .iter()
            .filter_map(|h| entries.get(&(embedder_id.to_string(), h.clone())).map(|v| (h.clone(), v.clone())))
            .collect()
    }

    pub fn put_many(&self, new_entries: Vec<CacheEntry>) {
        if new_entries.is_empty() { return; }
        let mut entries = self.lock();
        for e in new_entries {
            entries.insert((e.embedder_id, e.content_hash), e.vector);
        }
    }

    pub fn len(&self) -> usize { self.lock().len() }

    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    pub fn clear(&self) { self.lock().clear(); }
}
