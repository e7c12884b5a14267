use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::tokenizer::Token;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::Retriever;
use lumi_core::types::{Chunk, ChunkId, Corpus, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, SparseFields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// BM25 index over one corpus snapshot.
///
/// Chunk ids are corpus positions. Rebuilding means building a new index.
pub struct SparseIndex {
	corpus: Arc<Corpus>,
	index: Index,
	reader: IndexReader,
	fields: SparseFields,
}

impl SparseIndex {
	pub fn build(corpus: Arc<Corpus>) -> Result<Self> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);
		let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(|e| Error::operation(Stage::Indexing, e))?;
		for (id, chunk) in corpus.iter() {
			writer
				.add_document(doc!(fields.position => id as u64, fields.content => chunk.content.clone()))
				.map_err(|e| Error::operation(Stage::Indexing, e))?;
		}
		writer.commit().map_err(|e| Error::operation(Stage::Indexing, e))?;
		let reader: IndexReader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(|e: tantivy::TantivyError| Error::operation(Stage::Indexing, e))?;
		tracing::debug!(chunks = corpus.len(), "sparse index built");
		Ok(Self { corpus, index, reader, fields })
	}

	pub fn corpus(&self) -> &Arc<Corpus> { &self.corpus }

	pub fn len(&self) -> usize { self.corpus.len() }

	pub fn is_empty(&self) -> bool { self.corpus.is_empty() }

	/// Ids of the `n` best chunks, best first, ties by lowest id.
	pub fn query_ids(&self, text: &str, n: usize) -> Result<Vec<ChunkId>> {
		Ok(self.query_scored(text, n)?.into_iter().map(|hit| hit.id).collect())
	}

	/// Every chunk is scored; chunks sharing no term with the query score 0.
	pub fn query_scored(&self, text: &str, n: usize) -> Result<Vec<SearchHit>> {
		if n == 0 || self.corpus.is_empty() {
			return Ok(Vec::new());
		}
		let terms = self.tokenize(text)?;
		let mut scored: Vec<(ChunkId, f32)> = Vec::with_capacity(self.corpus.len());
		if !terms.is_empty() {
			let clauses: Vec<(Occur, Box<dyn Query>)> = terms
				.into_iter()
				.map(|term| (Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>))
				.collect();
			let query = BooleanQuery::new(clauses);
			let searcher = self.reader.searcher();
			let top_docs = searcher
				.search(&query, &TopDocs::with_limit(self.corpus.len()))
				.map_err(|e| Error::operation(Stage::Indexing, e))?;
			for (score, address) in top_docs {
				let doc: TantivyDocument = searcher.doc(address).map_err(|e| Error::operation(Stage::Indexing, e))?;
				let id = doc
					.get_first(self.fields.position)
					.and_then(|v| v.as_u64())
					.ok_or_else(|| Error::operation(Stage::Indexing, "indexed chunk without position"))?;
				scored.push((id as ChunkId, score));
			}
		}
		scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
		let matched: HashSet<ChunkId> = scored.iter().map(|(id, _)| *id).collect();
		scored.extend((0..self.corpus.len()).filter(|id| !matched.contains(id)).map(|id| (id, 0.0)));
		scored.truncate(n);
		Ok(scored.into_iter().map(|(id, score)| SearchHit { id, score, source: SourceKind::Text }).collect())
	}

	fn tokenize(&self, text: &str) -> Result<Vec<Term>> {
		let mut analyzer = self.index.tokenizer_for_field(self.fields.content).map_err(|e| Error::operation(Stage::Indexing, e))?;
		let mut terms = Vec::new();
		let field = self.fields.content;
		let mut stream = analyzer.token_stream(text);
		stream.process(&mut |token: &Token| terms.push(Term::from_field_text(field, &token.text)));
		Ok(terms)
	}
}

impl Retriever for SparseIndex {
	async fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>> {
		let ids = self.query_ids(text, k)?;
		Ok(ids.into_iter().filter_map(|id| self.corpus.get(id).cloned()).collect())
	}
}
