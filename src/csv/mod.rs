//! Resumable CSV reading: a line source that tracks byte offsets and a
//! tokenizer that turns those lines into rows.

mod line_source;
mod tokenizer;

pub use line_source::LineSource;
pub use tokenizer::CsvTokenizer;
