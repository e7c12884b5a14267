use std::sync::Arc;

use tokio::sync::RwLock;

use lumi_core::error::{Error, Result};
use lumi_core::types::SourceDocument;

use crate::retriever::{HybridRetriever, IngestStats};

/// Shared handle to one collection. Rebuilds hold the write lock,
/// retrievals the read lock.
pub type Collection = Arc<RwLock<HybridRetriever>>;

/// Named collections in insertion order, at most one of them active.
#[derive(Default)]
pub struct CollectionRegistry {
    entries: Vec<(String, Collection)>,
    active: Option<String>,
}

impl CollectionRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn contains(&self, name: &str) -> bool { self.position(name).is_some() }

    fn position(&self, name: &str) -> Option<usize> { self.entries.iter().position(|(n, _)| n == name) }

    /// Register `retriever` under `name`. Becomes active if nothing is.
    pub fn create(&mut self, name: &str, retriever: HybridRetriever) -> Result<Collection> {
        if self.contains(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let collection: Collection = Arc::new(RwLock::new(retriever));
        self.entries.push((name.to_string(), Arc::clone(&collection)));
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        tracing::info!(collection = name, total = self.entries.len(), "collection created");
        Ok(collection)
    }

    /// Ingest `documents` into `retriever` and register it as the active
    /// collection. Nothing is registered when ingestion fails.
    pub async fn create_from_documents(
        &mut self,
        name: &str,
        mut retriever: HybridRetriever,
        documents: &[SourceDocument],
    ) -> Result<(Collection, IngestStats)> {
        if self.contains(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let stats = retriever.ingest(documents).await?;
        let collection = self.create(name, retriever)?;
        self.active = Some(name.to_string());
        Ok((collection, stats))
    }

    pub fn activate(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        self.active = Some(name.to_string());
        tracing::debug!(collection = name, "collection activated");
        Ok(())
    }

    /// Remove `name`. If it was active, the first remaining collection (or none) becomes active.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.entries.remove(idx);
        if self.active.as_deref() == Some(name) {
            self.active = self.entries.first().map(|(n, _)| n.clone());
        }
        tracing::info!(collection = name, active = ?self.active, "collection deleted");
        Ok(())
    }

    pub fn list_all(&self) -> Vec<&str> { self.entries.iter().map(|(n, _)| n.as_str()).collect() }

    pub fn get(&self, name: &str) -> Option<Collection> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| Arc::clone(c))
    }

    pub fn active_name(&self) -> Option<&str> { self.active.as_deref() }

    pub fn active(&self) -> Option<Collection> { self.active.as_deref().and_then(|name| self.get(name)) }

    /// Drop every collection.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.active = None;
    }
}
