//! Hybrid retrieval: dense + sparse candidates, merged, deduplicated and
//! reranked; plus the named collection registry.

pub mod registry;
pub mod rerank;
pub mod retriever;

pub use registry::{Collection, CollectionRegistry};
pub use rerank::Reranker;
pub use retriever::{HybridOptions, HybridRetriever, IngestStats};
