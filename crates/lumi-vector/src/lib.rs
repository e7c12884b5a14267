pub mod cache;
pub mod dense;

pub use cache::EmbeddingCache;
pub use dense::{DenseIndex, DenseOptions};
