//! Source loaders: PDF pages and video transcripts turned into
//! [`SourceDocument`]s ready for chunking.

#[cfg(feature = "pdf")]
mod pdf;
mod transcript;

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;
pub use transcript::{clean_transcript, is_youtube_url, TranscriptLoader};

use lumi_core::error::Error;
use lumi_core::traits::SourceLoader;
use lumi_core::types::SourceDocument;

/// A source that could not be loaded.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: Error,
}

/// Documents from every source that loaded, plus the ones that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<SourceFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool { self.failures.is_empty() }
}

/// Load every source in order. A failing source is recorded and skipped.
pub fn load_all(loaders: &[Box<dyn SourceLoader>]) -> LoadReport {
    let mut report = LoadReport::default();
    for loader in loaders {
        let source = loader.describe();
        match loader.load() {
            Ok(docs) => {
                tracing::info!(%source, documents = docs.len(), "source loaded");
                report.documents.extend(docs);
            }
            Err(error) => {
                tracing::warn!(%source, %error, "source skipped");
                report.failures.push(SourceFailure { source, error });
            }
        }
    }
    report
}
