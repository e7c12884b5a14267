use lumi_core::chunker::{Chunker, ChunkingConfig};
use lumi_core::{Error, Metadata, SourceDocument, SourceType};

fn page(index: u64, words: usize) -> SourceDocument {
    let text = (0..words).map(|i| format!("p{index}w{i:05}")).collect::<Vec<_>>().join(" ");
    let meta = Metadata::new("biology.pdf", SourceType::Pdf).with("page", index).with("pages", 3);
    SourceDocument::new(text, meta)
}

#[test]
fn three_page_document_splits_into_five_chunks() {
    // 150 words ~ 1349 chars -> 2 chunks, 50 words ~ 449 chars -> 1 chunk
    let pages = vec![page(0, 150), page(1, 150), page(2, 50)];
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    let chunks = chunker.split_documents(&pages).expect("split");

    assert_eq!(chunks.len(), 5);
    let per_page: Vec<u64> = chunks.iter().map(|c| c.metadata.page().unwrap()).collect();
    assert_eq!(per_page, vec![0, 0, 1, 1, 2]);
    for c in &chunks {
        assert!(c.content.chars().count() <= 1000);
        assert_eq!(c.metadata.kind, SourceType::Pdf);
        assert_eq!(c.metadata.get("pages").and_then(|v| v.as_u64()), Some(3));
    }
    // the short page is kept verbatim
    assert_eq!(chunks[4].content, pages[2].content);
}

#[test]
fn consecutive_chunks_of_a_page_overlap() {
    let chunker = Chunker::default();
    let chunks = chunker.split_documents(&[page(0, 150)]).expect("split");
    assert_eq!(chunks.len(), 2);
    let tail: Vec<&str> = chunks[0].content.split_whitespace().rev().take(5).collect();
    for word in tail {
        assert!(chunks[1].content.contains(word), "{word} should be repeated in the next chunk");
    }
}

#[test]
fn no_documents_is_empty_input() {
    let err = Chunker::default().split_documents(&[]).unwrap_err();
    assert!(matches!(err, Error::EmptyInput));
}
