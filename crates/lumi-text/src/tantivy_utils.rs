use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED};
use tantivy::tokenizer::{LowerCaser, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "lumi_whitespace";

pub struct SparseFields {
	pub position: Field,
	pub content: Field,
}

pub fn build_schema() -> (Schema, SparseFields) {
	let mut schema_builder = Schema::builder();
	let position = schema_builder.add_u64_field("position", STORED);
	let indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
	let content = schema_builder.add_text_field("content", TextOptions::default().set_indexing_options(indexing));
	(schema_builder.build(), SparseFields { position, content })
}

/// Whitespace split then lowercase, used for chunks and queries alike.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default()).filter(LowerCaser).build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}
