#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod bounded;
pub mod chunker;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result, Stage};
pub use types::{Chunk, ChunkId, Corpus, Metadata, SourceDocument, SourceType};
