use std::path::{Path, PathBuf};

use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::SourceLoader;
use lumi_core::types::{Metadata, SourceDocument, SourceType};

/// One document per PDF page.
pub struct PdfLoader {
    path: PathBuf,
}

impl PdfLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn file_name(&self) -> String {
        self.path.file_name().map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().to_string())
    }
}

fn loading(message: impl std::fmt::Display) -> Error { Error::operation(Stage::Loading, message) }

impl SourceLoader for PdfLoader {
    fn describe(&self) -> String { self.path.display().to_string() }

    fn load(&self) -> Result<Vec<SourceDocument>> {
        let meta = std::fs::metadata(&self.path).map_err(|e| loading(format!("File not found: {} ({e})", self.path.display())))?;
        if meta.len() == 0 {
            return Err(loading("PDF is empty (0 bytes)"));
        }
        let path = self.path.clone();
        // pdf-extract panics on some malformed files
        let pages = std::panic::catch_unwind(move || pdf_extract::extract_text_by_pages(&path))
            .map_err(|_| loading("Corrupted or invalid PDF file"))?
            .map_err(|e| loading(format!("PDF processing failed: {e}")))?;
        if pages.iter().all(|p| p.trim().is_empty()) {
            return Err(loading("No readable text in PDF"));
        }

        let source = self.file_name();
        let total = pages.len();
        tracing::debug!(%source, pages = total, "pdf extracted");
        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page, text)| {
                let metadata = Metadata::new(source.clone(), SourceType::Pdf).with("page", page as u64).with("pages", total as u64);
                SourceDocument::new(text, metadata)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_loading_error() {
        let err = PdfLoader::new("/nonexistent/lecture.pdf").load().unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Loading));
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn zero_byte_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.pdf");
        std::fs::write(&file, b"").unwrap();
        let err = PdfLoader::new(&file).load().unwrap_err();
        assert!(err.to_string().contains("0 bytes"));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.pdf");
        std::fs::write(&file, b"this is not a pdf at all").unwrap();
        assert!(PdfLoader::new(&file).load().is_err());
    }

    #[test]
    fn describes_itself_by_path() {
        assert_eq!(PdfLoader::new("docs/week1.pdf").describe(), "docs/week1.pdf");
        assert_eq!(PdfLoader::new("docs/week1.pdf").file_name(), "week1.pdf");
    }
}
