use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use lumi_core::traits::SourceLoader;
use lumi_loaders::{load_all, LoadReport, PdfLoader, TranscriptLoader};

/// A video given on the command line: its URL and a captions file.
#[derive(Debug, Clone)]
pub struct VideoSource {
    pub url: String,
    pub captions: PathBuf,
    pub title: Option<String>,
}

fn is_pdf(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// PDF files named directly or found under the given directories, sorted per directory.
pub fn pdf_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if is_pdf(path) || !path.exists() {
            // missing files are reported by the loader
            files.push(path.clone());
        } else {
            tracing::warn!(path = %path.display(), "skipping unsupported file");
        }
    }
    files
}

pub fn loaders(paths: &[PathBuf], video: Option<&VideoSource>) -> Vec<Box<dyn SourceLoader>> {
    let mut loaders: Vec<Box<dyn SourceLoader>> = pdf_files(paths).into_iter().map(|p| Box::new(PdfLoader::new(p)) as Box<dyn SourceLoader>).collect();
    if let Some(video) = video {
        let mut loader = TranscriptLoader::from_file(video.url.clone(), video.captions.clone());
        if let Some(title) = &video.title {
            loader = loader.title(title.clone());
        }
        loaders.push(Box::new(loader));
    }
    loaders
}

/// Load every source off the async runtime, printing each failure.
pub async fn load_sources(paths: &[PathBuf], video: Option<&VideoSource>) -> anyhow::Result<LoadReport> {
    let loaders = loaders(paths, video);
    if loaders.is_empty() {
        anyhow::bail!("no PDF files or video given");
    }
    let pb = crate::progress::spinner(format!("Loading {} source(s)...", loaders.len()));
    let report = tokio::task::spawn_blocking(move || load_all(&loaders)).await?;
    pb.finish_and_clear();
    for failure in &report.failures {
        eprintln!("⚠️  {}: {}", failure.source, failure.error);
    }
    Ok(report)
}
