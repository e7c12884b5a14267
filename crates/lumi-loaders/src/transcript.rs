use std::path::PathBuf;

use regex::Regex;

use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::SourceLoader;
use lumi_core::types::{Metadata, SourceDocument, SourceType};

const YOUTUBE_URL: &str = r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+";
const DEFAULT_TITLE: &str = "Untitled Video";

enum Captions {
    File(PathBuf),
    Inline(String),
}

/// A video transcript from WebVTT captions, cleaned into one document.
pub struct TranscriptLoader {
    url: String,
    captions: Captions,
    title: Option<String>,
    duration: u64,
    views: u64,
}

impl TranscriptLoader {
    pub fn from_file(url: impl Into<String>, captions: impl Into<PathBuf>) -> Self {
        Self::with_captions(url.into(), Captions::File(captions.into()))
    }

    pub fn from_text(url: impl Into<String>, captions: impl Into<String>) -> Self {
        Self::with_captions(url.into(), Captions::Inline(captions.into()))
    }

    fn with_captions(url: String, captions: Captions) -> Self {
        Self { url, captions, title: None, duration: 0, views: 0 }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Length in seconds.
    #[must_use]
    pub fn duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    #[must_use]
    pub fn views(mut self, views: u64) -> Self {
        self.views = views;
        self
    }

    fn raw_captions(&self) -> Result<String> {
        match &self.captions {
            Captions::Inline(text) => Ok(text.clone()),
            Captions::File(path) => std::fs::read_to_string(path)
                .map_err(|e| Error::operation(Stage::Loading, format!("Failed to read captions {}: {e}", path.display()))),
        }
    }
}

impl SourceLoader for TranscriptLoader {
    fn describe(&self) -> String { self.url.clone() }

    fn load(&self) -> Result<Vec<SourceDocument>> {
        if !is_youtube_url(&self.url) {
            return Err(Error::operation(Stage::Loading, format!("Invalid YouTube URL: {}", self.url)));
        }
        let content = clean_transcript(&self.raw_captions()?)?;
        if content.is_empty() {
            return Err(Error::operation(Stage::Loading, "Transcript is empty"));
        }
        let title = self.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let metadata = Metadata::new(self.url.clone(), SourceType::Youtube)
            .with("title", title)
            .with("duration", self.duration)
            .with("views", self.views);
        tracing::debug!(url = %self.url, chars = content.len(), "transcript loaded");
        Ok(vec![SourceDocument::new(content, metadata)])
    }
}

pub fn is_youtube_url(url: &str) -> bool {
    Regex::new(YOUTUBE_URL).map(|re| re.is_match(url.trim())).unwrap_or(false)
}

fn loading_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::operation(Stage::Loading, e))
}

/// Plain text from WebVTT captions.
///
/// Drops markup tags, bracketed cues like `[Music]`, the `WEBVTT` and
/// `Kind:` headers, timestamp lines and repeated consecutive lines, then
/// collapses whitespace.
pub fn clean_transcript(raw: &str) -> Result<String> {
    let tags = loading_regex(r"<[^>]+>")?;
    let cues = loading_regex(r"\[[^\]\n]*\]")?;
    let kind = loading_regex(r"(?m)^Kind:.*\n")?;
    let header = loading_regex(r"(?m)^WEBVTT.*\n")?;
    let timestamps = loading_regex(r"\d{2}:\d{2}:\d{2}\.\d{3} --> \d{2}:\d{2}:\d{2}\.\d{3}.*\n")?;

    let text = raw.replace("\r\n", "\n");
    let text = tags.replace_all(&text, "");
    let text = cues.replace_all(&text, "");
    let text = kind.replace_all(&text, "");
    let text = header.replace_all(&text, "");
    let text = timestamps.replace_all(&text, "");

    let mut lines: Vec<&str> = Vec::new();
    for line in text.trim().split('\n') {
        let line = line.trim().trim_start_matches(['>', ' ']).trim();
        if !line.is_empty() && lines.last() != Some(&line) {
            lines.push(line);
        }
    }
    Ok(lines.join(" ").split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:02.500 align:start position:0%\nwelcome <c>to</c> the lecture\n\n00:00:02.500 --> 00:00:04.000\nwelcome to the lecture\n[Music]\n\n00:00:04.000 --> 00:00:07.000\n>> today we   cover\nenzymes\n";

    #[test]
    fn cleans_webvtt_captions() {
        let text = clean_transcript(VTT).unwrap();
        assert_eq!(text, "Language: en welcome to the lecture today we cover enzymes");
    }

    #[test]
    fn url_validation() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_youtube_url("youtu.be/abc"));
        assert!(!is_youtube_url("https://vimeo.com/123"));
        assert!(!is_youtube_url("https://youtube.com/"));
    }

    #[test]
    fn metadata_defaults() {
        let docs = TranscriptLoader::from_text("https://youtu.be/xyz", VTT).load().unwrap();
        assert_eq!(docs.len(), 1);
        let meta = &docs[0].metadata;
        assert_eq!(meta.kind, SourceType::Youtube);
        assert_eq!(meta.source, "https://youtu.be/xyz");
        assert_eq!(meta.title(), DEFAULT_TITLE);
        assert_eq!(meta.get("views").and_then(|v| v.as_u64()), Some(0));
    }

    #[test]
    fn empty_transcript_is_an_error() {
        let err = TranscriptLoader::from_text("https://youtu.be/xyz", "WEBVTT\n\n[Music]\n").load().unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
