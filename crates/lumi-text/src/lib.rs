//! lumi-text
//!
//! Lexical (sparse) index over a corpus, backed by an in-RAM Tantivy index.
//! See `sparse` for the index and `tantivy_utils` for schema and tokenizer.
pub mod sparse;
pub mod tantivy_utils;

pub use sparse::SparseIndex;
